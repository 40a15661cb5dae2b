//! Human-verification gate for orchestration starts
//!
//! The mint/invest endpoints require a verification token from the caller;
//! the orchestrator refuses to start a run without a passing verification.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

/// Minimum score accepted from the verification service
const MIN_SCORE: f64 = 0.5;

/// Error types for the verification service
#[derive(Debug)]
pub enum VerificationError {
    RequestError(String),
    InvalidResponse(String),
}

impl std::fmt::Display for VerificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationError::RequestError(msg) => write!(f, "Request error: {}", msg),
            VerificationError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for VerificationError {}

#[async_trait]
pub trait HumanVerification: Send + Sync {
    /// Verify a caller-supplied token; `Ok(true)` admits the run.
    async fn verify(&self, token: &str) -> Result<bool, VerificationError>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default)]
    score: Option<f64>,
}

/// Production gate backed by a siteverify-style endpoint
#[derive(Clone)]
pub struct SiteVerifyGate {
    client: Client,
    endpoint: String,
    secret: String,
}

impl SiteVerifyGate {
    pub fn new(endpoint: String, secret: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            secret,
        }
    }
}

#[async_trait]
impl HumanVerification for SiteVerifyGate {
    async fn verify(&self, token: &str) -> Result<bool, VerificationError> {
        if token.is_empty() {
            return Ok(false);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await
            .map_err(|e| VerificationError::RequestError(format!("siteverify failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(VerificationError::InvalidResponse(format!(
                "siteverify returned {}",
                status
            )));
        }

        let body: SiteVerifyResponse = response
            .json()
            .await
            .map_err(|e| VerificationError::InvalidResponse(format!("bad body: {}", e)))?;

        let passed = body.success && body.score.unwrap_or(1.0) >= MIN_SCORE;
        if !passed {
            warn!(success = body.success, score = ?body.score, "Verification token rejected");
        }
        Ok(passed)
    }
}

/// Pass-through gate for deployments without a configured secret
#[derive(Clone)]
pub struct AllowAllGate;

#[async_trait]
impl HumanVerification for AllowAllGate {
    async fn verify(&self, token: &str) -> Result<bool, VerificationError> {
        info!("Human verification not configured, admitting request");
        // An empty token still signals a client that never ran the check
        Ok(!token.is_empty())
    }
}
