//! Approval confirmation: receipt wait plus allowance polling
//!
//! After an ERC-20 approve is submitted, the approval counts as confirmed
//! only once its receipt lands successfully AND a subsequent allowance read
//! meets the required amount. The whole procedure races a hard timeout;
//! when the timeout wins, in-flight polling is abandoned (the underlying
//! queries cannot be aborted mid-flight).

use alloy::primitives::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::services::chain_client::ChainClient;
use crate::services::receipt_watcher::TransactionReceiptWatcher;

/// Hard ceiling on the whole confirmation procedure
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Allowance polls after the receipt lands
const ALLOWANCE_MAX_ATTEMPTS: u32 = 5;

/// Delay between allowance polls
const ALLOWANCE_POLL_DELAY: Duration = Duration::from_secs(5);

pub struct ApprovalConfirmer {
    chain: Arc<dyn ChainClient>,
    watcher: TransactionReceiptWatcher,
}

impl ApprovalConfirmer {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        let watcher = TransactionReceiptWatcher::new(chain.clone());
        Self { chain, watcher }
    }

    /// Confirm that the approval in `approval_tx_hash` landed and that the
    /// allowance `owner` granted `spender` covers `required_amount`, within
    /// the default timeout.
    pub async fn confirm_approval(
        &self,
        owner: Address,
        spender: Address,
        required_amount: U256,
        approval_tx_hash: &str,
    ) -> bool {
        self.confirm_approval_with(
            owner,
            spender,
            required_amount,
            approval_tx_hash,
            DEFAULT_CONFIRMATION_TIMEOUT,
        )
        .await
    }

    pub async fn confirm_approval_with(
        &self,
        owner: Address,
        spender: Address,
        required_amount: U256,
        approval_tx_hash: &str,
        timeout: Duration,
    ) -> bool {
        tokio::select! {
            confirmed = self.wait_and_poll(owner, spender, required_amount, approval_tx_hash) => confirmed,
            _ = tokio::time::sleep(timeout) => {
                warn!(
                    approval_tx_hash = %approval_tx_hash,
                    timeout_secs = timeout.as_secs(),
                    "Approval confirmation timed out"
                );
                false
            }
        }
    }

    async fn wait_and_poll(
        &self,
        owner: Address,
        spender: Address,
        required_amount: U256,
        approval_tx_hash: &str,
    ) -> bool {
        if !self.watcher.wait_for_receipt(approval_tx_hash).await {
            warn!(approval_tx_hash = %approval_tx_hash, "Approval receipt never confirmed");
            return false;
        }

        for attempt in 1..=ALLOWANCE_MAX_ATTEMPTS {
            match self.chain.allowance(owner, spender).await {
                Ok(observed) if observed >= required_amount => {
                    info!(
                        owner = %owner,
                        spender = %spender,
                        observed = %observed,
                        required = %required_amount,
                        "Allowance confirmed"
                    );
                    return true;
                }
                Ok(observed) => {
                    debug!(
                        attempt = attempt,
                        observed = %observed,
                        required = %required_amount,
                        "Allowance not yet sufficient"
                    );
                }
                Err(e) => {
                    warn!(attempt = attempt, error = %e, "Allowance query failed, will retry");
                }
            }

            if attempt < ALLOWANCE_MAX_ATTEMPTS {
                tokio::time::sleep(ALLOWANCE_POLL_DELAY).await;
            }
        }

        warn!(
            owner = %owner,
            spender = %spender,
            required = %required_amount,
            attempts = ALLOWANCE_MAX_ATTEMPTS,
            "Allowance never reached the required amount"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::chain_client::testing::{
        MockChainClient, APPROVE_HASH, SIGNER, SPENDER,
    };
    use crate::services::chain_client::ReceiptStatus;

    fn hash_str() -> String {
        APPROVE_HASH.to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn receipt_then_sufficient_allowance_confirms() {
        let chain = Arc::new(
            MockChainClient::new()
                .script_receipts(vec![None, Some(ReceiptStatus::Success)])
                .script_allowances(vec![U256::ZERO, U256::from(50_000u64)]),
        );
        let confirmer = ApprovalConfirmer::new(chain);

        let ok = confirmer
            .confirm_approval(SIGNER, SPENDER, U256::from(35_000u64), &hash_str())
            .await;
        assert!(ok);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_receipt_fails_without_polling_allowance() {
        let chain = Arc::new(
            MockChainClient::new()
                .script_receipts(vec![Some(ReceiptStatus::Reverted)])
                .script_allowances(vec![U256::from(1_000_000u64)]),
        );
        let confirmer = ApprovalConfirmer::new(chain);

        let ok = confirmer
            .confirm_approval(SIGNER, SPENDER, U256::from(1u64), &hash_str())
            .await;
        assert!(!ok);
    }

    #[tokio::test(start_paused = true)]
    async fn allowance_exhaustion_fails() {
        // Receipt lands but the allowance never reaches the requirement
        let chain = Arc::new(
            MockChainClient::new()
                .script_receipts(vec![Some(ReceiptStatus::Success)])
                .script_allowances(vec![U256::from(10u64)]),
        );
        let confirmer = ApprovalConfirmer::new(chain);

        let ok = confirmer
            .confirm_approval(SIGNER, SPENDER, U256::from(35_000u64), &hash_str())
            .await;
        assert!(!ok);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_requirement_is_trivially_satisfied() {
        let chain = Arc::new(
            MockChainClient::new()
                .script_receipts(vec![Some(ReceiptStatus::Success)])
                .script_allowances(vec![U256::ZERO]),
        );
        let confirmer = ApprovalConfirmer::new(chain);

        let ok = confirmer
            .confirm_approval(SIGNER, SPENDER, U256::ZERO, &hash_str())
            .await;
        assert!(ok);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_wins_over_slow_confirmation() {
        // Each receipt query stalls for a minute; ten attempts plus delays
        // overshoot the timeout, so the race resolves false
        let mut mock = MockChainClient::new().script_receipts(vec![None]);
        mock.receipt_delay = Some(Duration::from_secs(60));
        let confirmer = ApprovalConfirmer::new(Arc::new(mock));

        let ok = confirmer
            .confirm_approval_with(
                SIGNER,
                SPENDER,
                U256::from(35_000u64),
                &hash_str(),
                Duration::from_secs(180),
            )
            .await;
        assert!(!ok);
    }
}
