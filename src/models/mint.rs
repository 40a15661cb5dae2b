//! Mint/invest run request/response models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::services::ticket_recorder::RecordedTicket;

/// Request to claim tokens from the drop contract
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    /// Whole tokens to claim
    pub quantity: u64,
    /// Mint to a custom address instead of the service signer
    #[serde(default)]
    pub receiver: Option<String>,
    /// Human-verification token from the client
    pub verification_token: String,
}

/// Request to deposit into the investment pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestRequest {
    /// Fiat amount to invest, converted through the price feed
    pub fiat_amount: Decimal,
    /// Free-text ticket description
    #[serde(default)]
    pub info: Option<String>,
    /// Human-verification token from the client
    pub verification_token: String,
}

/// Outcome of a finalized run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRunResponse {
    /// Always "finalized"; failures use the error response instead
    pub status: String,
    /// Hash of the claim/deposit transaction
    pub tx_hash: String,
    /// Hash of the approval transaction, when one was needed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_tx_hash: Option<String>,
    /// Payment charged, in base units
    pub required_amount: String,
    /// Amount claimed/deposited, in whole units
    pub crypto_amount: Decimal,
    /// Recorded ticket, invest flow only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<RecordedTicket>,
}
