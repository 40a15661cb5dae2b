// src/lib.rs

use axum::extract::FromRef;
use sea_orm::DatabaseConnection;
use services::mint_orchestrator::{MintOrchestrator, MintPolicy};
use services::price_feed::PriceFeedService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    /// Claim-flow orchestrator (no ticket recorder wired)
    pub mint: Arc<MintOrchestrator>,
    /// Deposit-flow orchestrator, records tickets on success
    pub invest: Arc<MintOrchestrator>,
    pub price_feed: PriceFeedService,
    pub policy: MintPolicy,
}

impl FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

pub mod entities {
    pub mod prelude;
    pub mod investment_tickets;
}

pub mod services {
    pub mod approval;
    pub mod chain_client;
    pub mod human_verification;
    pub mod mint_orchestrator;
    pub mod price_feed;
    pub mod receipt_watcher;
    pub mod ticket_recorder;
    pub mod units;
}

pub mod models;
pub mod handlers;
