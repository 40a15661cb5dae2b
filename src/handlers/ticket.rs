//! Investment-ticket persistence endpoint
//!
//! POST /api/investment-ticket records a receipt for a confirmed on-chain
//! deposit; the transaction hash is unique, so re-posting the same hash is
//! answered with a conflict instead of a second row. GET returns a recorded
//! ticket for display/QR.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use tracing::{error, info};

use crate::entities::{investment_tickets, prelude::*};
use crate::models::ticket::{CreateTicketRequest, ErrorResponse, TicketResponse};

pub async fn create_ticket(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketResponse>), (StatusCode, Json<ErrorResponse>)> {
    let missing = || {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Missing required fields".to_string(),
                code: Some("MISSING_FIELDS".to_string()),
            }),
        )
    };

    let fiat = payload.investment_amount_fiat.ok_or_else(missing)?;
    let crypto = payload.investment_amount_crypto.ok_or_else(missing)?;
    let info = payload.investment_info.ok_or_else(missing)?;
    let transaction_hash = payload.transaction_hash.ok_or_else(missing)?;
    let wallet_address = payload.wallet_address.ok_or_else(missing)?;

    if fiat <= Decimal::ZERO
        || crypto <= Decimal::ZERO
        || info.is_empty()
        || transaction_hash.is_empty()
        || wallet_address.is_empty()
    {
        return Err(missing());
    }

    let transaction_id = uuid::Uuid::new_v4().to_string();

    let ticket = investment_tickets::ActiveModel {
        transaction_id: Set(transaction_id),
        investment_amount_fiat: Set(fiat),
        investment_amount_crypto: Set(crypto),
        investment_info: Set(Some(info)),
        transaction_hash: Set(transaction_hash),
        wallet_address: Set(wallet_address),
        ..Default::default()
    };

    let created = ticket.insert(&db).await.map_err(|e| {
        if let Some(SqlErr::UniqueConstraintViolation(_)) = e.sql_err() {
            (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: "Ticket already recorded for this transaction hash".to_string(),
                    code: Some("ALREADY_RECORDED".to_string()),
                }),
            )
        } else {
            error!(error = %e, "Failed to insert investment ticket");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Internal Server Error".to_string(),
                    code: None,
                }),
            )
        }
    })?;

    info!(
        transaction_id = %created.transaction_id,
        transaction_hash = %created.transaction_hash,
        "Investment ticket created"
    );

    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn get_ticket(
    State(db): State<DatabaseConnection>,
    Path(tx_hash): Path<String>,
) -> Result<Json<TicketResponse>, (StatusCode, Json<ErrorResponse>)> {
    let ticket = InvestmentTickets::find()
        .filter(investment_tickets::Column::TransactionHash.eq(&tx_hash))
        .one(&db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to query investment ticket");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Database error: {}", e),
                    code: None,
                }),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("No ticket recorded for {}", tx_hash),
                    code: None,
                }),
            )
        })?;

    Ok(Json(ticket.into()))
}
