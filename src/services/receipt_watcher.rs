//! Transaction receipt polling with bounded attempts
//!
//! Polls the chain for a transaction receipt with a fixed delay between
//! attempts. Resolves `true` only when a receipt with an explicit success
//! status is observed; anything else (reverted, never mined within the
//! attempt limit) resolves `false`. A missing or malformed hash is an
//! unrecoverable precondition failure and resolves `false` without
//! touching the chain, leaving the decision to the caller.

use alloy::primitives::TxHash;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::services::chain_client::{ChainClient, ReceiptStatus};

/// Default number of receipt polls before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default delay between receipt polls
pub const DEFAULT_POLL_DELAY: Duration = Duration::from_secs(3);

pub struct TransactionReceiptWatcher {
    chain: Arc<dyn ChainClient>,
}

impl TransactionReceiptWatcher {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    /// Wait for the receipt of `hash` with the default attempt limit.
    pub async fn wait_for_receipt(&self, hash: &str) -> bool {
        self.wait_for_receipt_with(hash, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_DELAY)
            .await
    }

    /// Wait for the receipt of `hash`, polling up to `max_attempts` times
    /// with `delay` between attempts.
    pub async fn wait_for_receipt_with(
        &self,
        hash: &str,
        max_attempts: u32,
        delay: Duration,
    ) -> bool {
        let tx_hash = match TxHash::from_str(hash) {
            Ok(h) => h,
            Err(e) => {
                error!(hash = %hash, error = %e, "Cannot wait for receipt of malformed hash");
                return false;
            }
        };

        for attempt in 1..=max_attempts {
            match self.chain.transaction_receipt(tx_hash).await {
                Ok(Some(ReceiptStatus::Success)) => {
                    debug!(tx_hash = %tx_hash, attempt = attempt, "Receipt confirmed");
                    return true;
                }
                Ok(Some(ReceiptStatus::Reverted)) => {
                    warn!(tx_hash = %tx_hash, attempt = attempt, "Transaction reverted");
                    return false;
                }
                Ok(None) => {
                    debug!(
                        tx_hash = %tx_hash,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        "No receipt yet"
                    );
                }
                // Transient query errors consume the attempt, final attempt decides
                Err(e) => {
                    warn!(
                        tx_hash = %tx_hash,
                        attempt = attempt,
                        error = %e,
                        "Receipt query failed, will retry"
                    );
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
            }
        }

        warn!(
            tx_hash = %tx_hash,
            attempts = max_attempts,
            "Gave up waiting for receipt"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::chain_client::testing::{MockChainClient, CLAIM_HASH};
    use std::sync::atomic::Ordering;

    fn hash_str() -> String {
        CLAIM_HASH.to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn success_status_resolves_true() {
        let chain = Arc::new(
            MockChainClient::new().script_receipts(vec![None, None, Some(ReceiptStatus::Success)]),
        );
        let watcher = TransactionReceiptWatcher::new(chain.clone());

        assert!(watcher.wait_for_receipt(&hash_str()).await);
        assert_eq!(chain.receipt_queries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_status_resolves_false_immediately() {
        let chain = Arc::new(
            MockChainClient::new().script_receipts(vec![Some(ReceiptStatus::Reverted)]),
        );
        let watcher = TransactionReceiptWatcher::new(chain.clone());

        assert!(!watcher.wait_for_receipt(&hash_str()).await);
        assert_eq!(chain.receipt_queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_polls_exactly_max_attempts() {
        // Always-empty receipt source: never a receipt, deterministic count
        let chain = Arc::new(MockChainClient::new().script_receipts(vec![None]));
        let watcher = TransactionReceiptWatcher::new(chain.clone());

        assert!(!watcher.wait_for_receipt(&hash_str()).await);
        assert_eq!(
            chain.receipt_queries.load(Ordering::SeqCst),
            DEFAULT_MAX_ATTEMPTS
        );
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_hash_fails_without_querying() {
        let chain = Arc::new(MockChainClient::new());
        let watcher = TransactionReceiptWatcher::new(chain.clone());

        assert!(!watcher.wait_for_receipt("").await);
        assert!(!watcher.wait_for_receipt("0x1234").await);
        assert!(!watcher.wait_for_receipt("not-a-hash").await);
        assert_eq!(chain.receipt_queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_query_errors_consume_attempts_without_failing() {
        use crate::services::chain_client::ChainClientError;

        let chain = Arc::new(MockChainClient::new().script_receipt_results(vec![
            Err(ChainClientError::ProviderError("connection reset".to_string())),
            Ok(None),
            Ok(Some(ReceiptStatus::Success)),
        ]));
        let watcher = TransactionReceiptWatcher::new(chain.clone());

        assert!(watcher.wait_for_receipt(&hash_str()).await);
        assert_eq!(chain.receipt_queries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn query_error_on_final_attempt_resolves_false() {
        use crate::services::chain_client::ChainClientError;

        let chain = Arc::new(MockChainClient::new().script_receipt_results(vec![Err(
            ChainClientError::ProviderError("connection reset".to_string()),
        )]));
        let watcher = TransactionReceiptWatcher::new(chain.clone());

        assert!(
            !watcher
                .wait_for_receipt_with(&hash_str(), 3, Duration::from_secs(1))
                .await
        );
        assert_eq!(chain.receipt_queries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_attempt_limit_is_respected() {
        let chain = Arc::new(MockChainClient::new().script_receipts(vec![None]));
        let watcher = TransactionReceiptWatcher::new(chain.clone());

        assert!(
            !watcher
                .wait_for_receipt_with(&hash_str(), 4, Duration::from_millis(100))
                .await
        );
        assert_eq!(chain.receipt_queries.load(Ordering::SeqCst), 4);
    }
}
