//! Investment-ticket recording boundary
//!
//! On a finalized deposit the orchestrator hands the receipt record to a
//! [`TicketSink`]. The production sink posts it to the persistence endpoint;
//! a duplicate transaction hash comes back as a structured "already
//! recorded" outcome rather than a generic failure.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Ticket data for a confirmed on-chain transaction
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    /// Fiat amount, 2 fractional digits
    pub investment_amount_fiat: Decimal,
    /// Crypto amount, up to 18 fractional digits
    pub investment_amount_crypto: Decimal,
    /// Free-text description of the investment
    pub investment_info: String,
    /// On-chain transaction hash (0x format)
    pub transaction_hash: String,
    /// Wallet address the transaction was made from
    pub wallet_address: String,
}

/// Ticket as persisted, including the server-generated identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedTicket {
    pub transaction_id: String,
    pub investment_amount_fiat: Decimal,
    pub investment_amount_crypto: Decimal,
    pub investment_info: Option<String>,
    pub transaction_hash: String,
    pub wallet_address: String,
}

/// Error types for ticket recording
#[derive(Debug)]
pub enum TicketRecorderError {
    /// A field was missing or rejected by the endpoint
    InvalidTicket(String),
    /// The transaction hash has already been recorded
    AlreadyRecorded(String),
    RequestError(String),
    PersistenceError(String),
}

impl std::fmt::Display for TicketRecorderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketRecorderError::InvalidTicket(msg) => write!(f, "Invalid ticket: {}", msg),
            TicketRecorderError::AlreadyRecorded(hash) => {
                write!(f, "Ticket already recorded for {}", hash)
            }
            TicketRecorderError::RequestError(msg) => write!(f, "Request error: {}", msg),
            TicketRecorderError::PersistenceError(msg) => {
                write!(f, "Persistence error: {}", msg)
            }
        }
    }
}

impl std::error::Error for TicketRecorderError {}

#[async_trait]
pub trait TicketSink: Send + Sync {
    async fn record_ticket(&self, ticket: &NewTicket)
        -> Result<RecordedTicket, TicketRecorderError>;
}

/// Production sink posting tickets to the persistence endpoint
#[derive(Clone)]
pub struct HttpTicketRecorder {
    client: Client,
    endpoint: String,
}

impl HttpTicketRecorder {
    /// `endpoint` is the full URL of the investment-ticket route
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl TicketSink for HttpTicketRecorder {
    async fn record_ticket(
        &self,
        ticket: &NewTicket,
    ) -> Result<RecordedTicket, TicketRecorderError> {
        if ticket.transaction_hash.is_empty() || ticket.wallet_address.is_empty() {
            return Err(TicketRecorderError::InvalidTicket(
                "transaction hash and wallet address are required".to_string(),
            ));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(ticket)
            .send()
            .await
            .map_err(|e| TicketRecorderError::RequestError(format!("POST failed: {}", e)))?;

        match response.status() {
            StatusCode::CREATED => {
                let recorded: RecordedTicket = response.json().await.map_err(|e| {
                    TicketRecorderError::PersistenceError(format!("bad body: {}", e))
                })?;
                info!(
                    transaction_id = %recorded.transaction_id,
                    transaction_hash = %recorded.transaction_hash,
                    "Investment ticket recorded"
                );
                Ok(recorded)
            }
            StatusCode::CONFLICT => Err(TicketRecorderError::AlreadyRecorded(
                ticket.transaction_hash.clone(),
            )),
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                Err(TicketRecorderError::InvalidTicket(body))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(TicketRecorderError::PersistenceError(format!(
                    "endpoint returned {}: {}",
                    status, body
                )))
            }
        }
    }
}
