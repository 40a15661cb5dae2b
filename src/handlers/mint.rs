//! Mint and invest run endpoints
//!
//! POST /api/mint and POST /api/invest drive the orchestration state
//! machine to completion and report the outcome. Orchestration errors are
//! mapped onto the user-facing taxonomy; nothing propagates uncaught.

use alloy::primitives::Address;
use axum::{extract::State, http::StatusCode, Json};
use std::str::FromStr;
use tracing::{info, warn};

use crate::models::mint::{InvestRequest, MintRequest, MintRunResponse};
use crate::models::ticket::ErrorResponse;
use crate::services::mint_orchestrator::{MintAction, MintError, MintOutcome};
use crate::services::units;
use crate::AppState;

/// Ticket description used when the caller does not supply one
const DEFAULT_INVEST_INFO: &str = "Investment pool deposit";

pub async fn mint_tokens(
    State(state): State<AppState>,
    Json(payload): Json<MintRequest>,
) -> Result<Json<MintRunResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(quantity = payload.quantity, "Mint request received");

    let receiver = match &payload.receiver {
        Some(raw) => Some(Address::from_str(raw).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid receiver address: {}", e),
                    code: Some("INVALID_RECEIVER".to_string()),
                }),
            )
        })?),
        None => None,
    };

    let action = MintAction::Claim {
        quantity: payload.quantity,
        receiver,
    };

    let outcome = state
        .mint
        .run(action, &payload.verification_token)
        .await
        .map_err(mint_error_response)?;

    Ok(Json(run_response(outcome)))
}

pub async fn invest_pool(
    State(state): State<AppState>,
    Json(payload): Json<InvestRequest>,
) -> Result<Json<MintRunResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(fiat_amount = %payload.fiat_amount, "Invest request received");

    let crypto_amount = state
        .price_feed
        .fiat_to_crypto(payload.fiat_amount)
        .await
        .map_err(|e| {
            warn!(error = %e, "Price feed unavailable");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: "Price feed unavailable, please try again".to_string(),
                    code: Some("PRICE_FEED_UNAVAILABLE".to_string()),
                }),
            )
        })?;

    let amount = units::to_base_units(crypto_amount, state.policy.payment_decimals).ok_or_else(
        || {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Investment amount out of range".to_string(),
                    code: Some("INVALID_AMOUNT".to_string()),
                }),
            )
        },
    )?;

    let action = MintAction::Deposit {
        amount,
        fiat_amount: payload.fiat_amount,
        info: payload
            .info
            .unwrap_or_else(|| DEFAULT_INVEST_INFO.to_string()),
    };

    let outcome = state
        .invest
        .run(action, &payload.verification_token)
        .await
        .map_err(mint_error_response)?;

    Ok(Json(run_response(outcome)))
}

fn run_response(outcome: MintOutcome) -> MintRunResponse {
    MintRunResponse {
        status: "finalized".to_string(),
        tx_hash: outcome.tx_hash,
        approval_tx_hash: outcome.approval_tx_hash,
        required_amount: outcome.required_amount.to_string(),
        crypto_amount: outcome.crypto_amount,
        ticket: outcome.ticket,
    }
}

/// Map an orchestration error onto an HTTP status and user-facing message
fn mint_error_response(e: MintError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &e {
        MintError::RunInProgress => (StatusCode::CONFLICT, "RUN_IN_PROGRESS"),
        MintError::HumanVerificationFailed => (StatusCode::BAD_REQUEST, "VERIFICATION_FAILED"),
        MintError::QuantityOutOfBounds { .. } => (StatusCode::BAD_REQUEST, "QUANTITY_OUT_OF_BOUNDS"),
        MintError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
        MintError::WrongNetwork { .. } => (StatusCode::BAD_REQUEST, "WRONG_NETWORK"),
        MintError::InsufficientBalance { .. } => (StatusCode::BAD_REQUEST, "INSUFFICIENT_BALANCE"),
        MintError::UserRejected(_) => (StatusCode::BAD_REQUEST, "USER_REJECTED"),
        MintError::InsufficientGas(_) => (StatusCode::BAD_REQUEST, "INSUFFICIENT_GAS"),
        MintError::AllowanceExceeded(_) => (StatusCode::BAD_REQUEST, "ALLOWANCE_EXCEEDED"),
        MintError::ApprovalNotConfirmed | MintError::ActionNotConfirmed => {
            (StatusCode::GATEWAY_TIMEOUT, "NOT_CONFIRMED")
        }
        MintError::Chain(_) => (StatusCode::BAD_GATEWAY, "CHAIN_ERROR"),
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            code: Some(code.to_string()),
        }),
    )
}
