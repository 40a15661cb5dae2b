//! SeaORM Entity for investment tickets
//!
//! One row per successfully confirmed on-chain deposit. Rows are written
//! once and never updated or deleted by the application.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "investment_tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Server-generated UUID, shown to the user for display/QR
    pub transaction_id: String,
    /// Fiat amount, 2 fractional digits
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub investment_amount_fiat: Decimal,
    /// Crypto amount, 18 fractional digits
    #[sea_orm(column_type = "Decimal(Some((25, 18)))")]
    pub investment_amount_crypto: Decimal,
    /// Free-text description of the investment
    #[sea_orm(column_type = "Text", nullable)]
    pub investment_info: Option<String>,
    /// On-chain transaction hash (0x format), unique to prevent duplicate
    /// recording of the same on-chain event
    pub transaction_hash: String,
    /// Wallet address the deposit was made from
    pub wallet_address: String,
    /// Timestamp when the ticket was recorded
    pub created_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
