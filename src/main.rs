use alloy::primitives::Address;
use axum::{
    routing::{get, post},
    Router,
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agod_minter_backend::handlers;
use agod_minter_backend::services::chain_client::{AlloyChainClient, ChainContracts};
use agod_minter_backend::services::human_verification::{
    AllowAllGate, HumanVerification, SiteVerifyGate,
};
use agod_minter_backend::services::mint_orchestrator::{MintOrchestrator, MintPolicy};
use agod_minter_backend::services::price_feed::PriceFeedService;
use agod_minter_backend::services::ticket_recorder::HttpTicketRecorder;
use agod_minter_backend::AppState;

/// Payment token on Base mainnet (USDC)
const DEFAULT_PAYMENT_TOKEN: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

/// AGOD token drop contract on Base mainnet
const DEFAULT_TOKEN_DROP: &str = "0xFC5fc05E5146f258A29654c03d351d4a61a856DC";

/// Base mainnet chain id
const DEFAULT_CHAIN_ID: u64 = 8453;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,agod_minter_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Connect to database
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    // Chain client
    let rpc_url = env::var("RPC_URL").expect("RPC_URL must be set");
    let private_key = env::var("MINTER_PRIVATE_KEY").expect("MINTER_PRIVATE_KEY must be set");
    let contracts = ChainContracts {
        payment_token: parse_address_env("PAYMENT_TOKEN_ADDRESS", DEFAULT_PAYMENT_TOKEN),
        token_drop: parse_address_env("TOKEN_DROP_ADDRESS", DEFAULT_TOKEN_DROP),
        pool_vault: Address::from_str(
            &env::var("POOL_VAULT_ADDRESS").expect("POOL_VAULT_ADDRESS must be set"),
        )
        .expect("POOL_VAULT_ADDRESS must be a valid address"),
    };
    let chain = Arc::new(
        AlloyChainClient::new(&rpc_url, &private_key, contracts)
            .await
            .expect("Failed to initialize chain client"),
    );

    let policy = MintPolicy {
        required_chain_id: env_u64("CHAIN_ID", DEFAULT_CHAIN_ID),
        min_quantity: env_u64("MIN_QUANTITY", 1),
        max_quantity: env_u64("MAX_QUANTITY", 10_000),
        payment_decimals: env_u64("PAYMENT_DECIMALS", 6) as u32,
    };

    // Human-verification gate
    let verifier: Arc<dyn HumanVerification> = match env::var("VERIFY_SECRET") {
        Ok(secret) => Arc::new(SiteVerifyGate::new(
            env::var("VERIFY_ENDPOINT").unwrap_or_else(|_| {
                "https://www.google.com/recaptcha/api/siteverify".to_string()
            }),
            secret,
        )),
        Err(_) => {
            tracing::warn!("VERIFY_SECRET not set, human verification is permissive");
            Arc::new(AllowAllGate)
        }
    };

    // Price feed for the invest flow
    let price_feed = PriceFeedService::new(
        env::var("PRICE_API_URL")
            .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string()),
        env::var("PRICE_ASSET_ID").unwrap_or_else(|_| "usd-coin".to_string()),
        env::var("FIAT_CURRENCY").unwrap_or_else(|_| "mxn".to_string()),
    );

    // Ticket recorder posts back to this service's own persistence endpoint
    let port = env_u64("PORT", 3000);
    let ticket_endpoint = env::var("TICKET_ENDPOINT")
        .unwrap_or_else(|_| format!("http://localhost:{}/api/investment-ticket", port));
    let recorder = Arc::new(HttpTicketRecorder::new(ticket_endpoint));

    let mint = Arc::new(MintOrchestrator::new(
        chain.clone(),
        verifier.clone(),
        policy.clone(),
    ));
    let invest = Arc::new(
        MintOrchestrator::new(chain, verifier, policy.clone()).with_recorder(recorder),
    );

    let state = AppState {
        db,
        mint,
        invest,
        price_feed,
        policy,
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/api/investment-ticket", post(handlers::ticket::create_ticket))
        .route("/api/investment-ticket/{tx_hash}", get(handlers::ticket::get_ticket))
        .route("/api/mint", post(handlers::mint::mint_tokens))
        .route("/api/invest", post(handlers::mint::invest_pool))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .unwrap();

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}

async fn health() -> &'static str {
    "ok"
}

fn parse_address_env(var: &str, default: &str) -> Address {
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    Address::from_str(&raw).unwrap_or_else(|e| panic!("{} must be a valid address: {}", var, e))
}

fn env_u64(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
