//! Investment-ticket request/response models
//!
//! Models for the POST/GET /api/investment-ticket endpoints.

use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};

/// Request to record an investment ticket.
///
/// Every field is required; options only exist so a missing field maps to a
/// 400 rather than a deserialization error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    /// Fiat amount, 2 fractional digits
    #[serde(default)]
    pub investment_amount_fiat: Option<Decimal>,
    /// Crypto amount, up to 18 fractional digits
    #[serde(default)]
    pub investment_amount_crypto: Option<Decimal>,
    /// Free-text description of the investment
    #[serde(default)]
    pub investment_info: Option<String>,
    /// On-chain transaction hash (0x format), unique per ticket
    #[serde(default)]
    pub transaction_hash: Option<String>,
    /// Wallet address the transaction was made from
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// Recorded ticket, including the server-generated identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub transaction_id: String,
    pub investment_amount_fiat: Decimal,
    pub investment_amount_crypto: Decimal,
    pub investment_info: Option<String>,
    pub transaction_hash: String,
    pub wallet_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTimeWithTimeZone>,
}

impl From<crate::entities::investment_tickets::Model> for TicketResponse {
    fn from(model: crate::entities::investment_tickets::Model) -> Self {
        Self {
            transaction_id: model.transaction_id,
            investment_amount_fiat: model.investment_amount_fiat,
            investment_amount_crypto: model.investment_amount_crypto,
            investment_info: model.investment_info,
            transaction_hash: model.transaction_hash,
            wallet_address: model.wallet_address,
            created_at: model.created_at,
        }
    }
}

/// Error response for ticket endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code for programmatic handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
