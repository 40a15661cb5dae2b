//! Crypto/fiat price feed for the invest flow
//!
//! Fetches the payment asset's fiat rate from CoinGecko's simple-price API
//! and caches it briefly, matching the refresh cadence the UI uses. The
//! invest endpoint converts the user's fiat amount into crypto through this
//! rate before starting the orchestration.

use moka::future::Cache;
use reqwest::Client;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cache TTL, matching the UI's once-a-minute refresh
const PRICE_TTL: Duration = Duration::from_secs(60);

/// Error types for price lookups
#[derive(Debug)]
pub enum PriceFeedError {
    RequestError(String),
    InvalidResponse(String),
    /// The fetched rate was zero or negative
    UnusableRate(String),
}

impl std::fmt::Display for PriceFeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceFeedError::RequestError(msg) => write!(f, "Request error: {}", msg),
            PriceFeedError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            PriceFeedError::UnusableRate(msg) => write!(f, "Unusable rate: {}", msg),
        }
    }
}

impl std::error::Error for PriceFeedError {}

#[derive(Clone)]
pub struct PriceFeedService {
    client: Client,
    base_url: String,
    /// CoinGecko asset id of the payment asset (e.g. "ethereum")
    asset_id: String,
    /// Fiat currency code (e.g. "mxn")
    fiat_currency: String,
    cache: Arc<Cache<String, Decimal>>,
}

impl PriceFeedService {
    pub fn new(base_url: String, asset_id: String, fiat_currency: String) -> Self {
        let cache = Cache::builder()
            .max_capacity(8)
            .time_to_live(PRICE_TTL)
            .build();

        Self {
            client: Client::new(),
            base_url,
            asset_id,
            fiat_currency,
            cache: Arc::new(cache),
        }
    }

    /// Fiat price of one whole unit of the payment asset
    pub async fn fiat_per_crypto(&self) -> Result<Decimal, PriceFeedError> {
        let cache_key = format!("{}_{}", self.asset_id, self.fiat_currency);

        if let Some(cached) = self.cache.get(&cache_key).await {
            debug!(rate = %cached, "Price cache hit");
            return Ok(cached);
        }

        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(&[
                ("ids", self.asset_id.as_str()),
                ("vs_currencies", self.fiat_currency.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PriceFeedError::RequestError(format!("price fetch failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PriceFeedError::InvalidResponse(format!(
                "price API error {}: {}",
                status, error_text
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PriceFeedError::InvalidResponse(format!("bad body: {}", e)))?;

        let rate = body[self.asset_id.as_str()][self.fiat_currency.as_str()]
            .as_f64()
            .and_then(|v| Decimal::try_from(v).ok())
            .ok_or_else(|| {
                PriceFeedError::InvalidResponse(format!(
                    "no {}/{} rate in response",
                    self.asset_id, self.fiat_currency
                ))
            })?;

        if rate <= Decimal::ZERO {
            return Err(PriceFeedError::UnusableRate(rate.to_string()));
        }

        self.cache.insert(cache_key, rate).await;
        debug!(rate = %rate, "Fetched fiat rate");
        Ok(rate)
    }

    /// Convert a fiat amount into the payment asset
    pub async fn fiat_to_crypto(&self, fiat_amount: Decimal) -> Result<Decimal, PriceFeedError> {
        let rate = self.fiat_per_crypto().await?;
        fiat_amount
            .checked_div(rate)
            .ok_or_else(|| PriceFeedError::UnusableRate(rate.to_string()))
    }

    /// Convert a payment-asset amount into fiat
    pub async fn crypto_to_fiat(&self, crypto_amount: Decimal) -> Result<Decimal, PriceFeedError> {
        let rate = self.fiat_per_crypto().await?;
        crypto_amount
            .checked_mul(rate)
            .ok_or_else(|| PriceFeedError::UnusableRate(rate.to_string()))
    }
}
