//! Mint/invest orchestration state machine
//!
//! Drives the approve → act → confirm sequence for both the token claim
//! and the pool deposit flows, which share the same shape and differ only
//! in the protected action. Step transitions are published on a watch
//! channel for UI consumption; any failure resets the machine to Idle.
//!
//! One run at a time: a start request while a run is active is refused.
//! Nothing here prevents two independent processes from racing submissions
//! against the same wallet.

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::services::approval::ApprovalConfirmer;
use crate::services::chain_client::{ChainClient, ChainClientError};
use crate::services::human_verification::HumanVerification;
use crate::services::receipt_watcher::TransactionReceiptWatcher;
use crate::services::ticket_recorder::{NewTicket, RecordedTicket, TicketSink};
use crate::services::units;

/// How long a finished run stays on Finalized before the machine clears
const COOLDOWN: Duration = Duration::from_secs(3);

/// Discrete steps shown to the user during a run.
///
/// Monotonically non-decreasing within a run; the only backward move is
/// the terminal reset to Idle after a failure or the post-run cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i8)]
pub enum MintStep {
    Idle = -1,
    Initiating = 0,
    Submitted = 1,
    Confirmed = 2,
    Finalized = 3,
}

impl MintStep {
    pub fn as_i8(self) -> i8 {
        self as i8
    }
}

/// The action the orchestration protects
#[derive(Debug, Clone)]
pub enum MintAction {
    /// Claim `quantity` whole tokens from the drop contract
    Claim {
        quantity: u64,
        /// Mint to a custom address instead of the signer
        receiver: Option<Address>,
    },
    /// Deposit `amount` payment-token base units into the pool
    Deposit {
        amount: U256,
        /// Fiat amount the deposit was quoted at, for the ticket
        fiat_amount: Decimal,
        /// Free-text ticket description
        info: String,
    },
}

/// Policy bounds for a run
#[derive(Debug, Clone)]
pub struct MintPolicy {
    /// Chain the contracts live on
    pub required_chain_id: u64,
    /// Smallest accepted claim quantity
    pub min_quantity: u64,
    /// Largest accepted claim quantity
    pub max_quantity: u64,
    /// Payment token decimals
    pub payment_decimals: u32,
}

/// Error types for an orchestration run
#[derive(Debug)]
pub enum MintError {
    /// A run is already active; the start request was a no-op
    RunInProgress,
    /// The caller's verification token did not pass the gate
    HumanVerificationFailed,
    QuantityOutOfBounds { quantity: u64, min: u64, max: u64 },
    InvalidAmount(String),
    WrongNetwork { expected: u64, actual: u64 },
    InsufficientBalance { required: U256, available: U256 },
    /// Signature/submission declined by the wallet
    UserRejected(String),
    /// Not enough native currency to cover gas
    InsufficientGas(String),
    /// The action reverted against the granted allowance
    AllowanceExceeded(String),
    /// Approval receipt or allowance never confirmed in time
    ApprovalNotConfirmed,
    /// The claim/deposit transaction never confirmed
    ActionNotConfirmed,
    Chain(ChainClientError),
}

impl std::fmt::Display for MintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MintError::RunInProgress => write!(f, "A transaction is already in progress"),
            MintError::HumanVerificationFailed => write!(f, "Security verification failed"),
            MintError::QuantityOutOfBounds { quantity, min, max } => {
                write!(f, "Quantity {} outside allowed range [{}, {}]", quantity, min, max)
            }
            MintError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            MintError::WrongNetwork { expected, actual } => {
                write!(f, "Wrong network: expected chain {}, connected to {}", expected, actual)
            }
            MintError::InsufficientBalance { required, available } => {
                let shortfall = required.saturating_sub(*available);
                write!(
                    f,
                    "Insufficient balance: need {} base units, have {}, short by {}",
                    required, available, shortfall
                )
            }
            MintError::UserRejected(_) => write!(f, "Transaction rejected by the signer"),
            MintError::InsufficientGas(_) => write!(f, "Insufficient balance for gas"),
            MintError::AllowanceExceeded(_) => {
                write!(f, "Transfer amount exceeds the granted allowance")
            }
            MintError::ApprovalNotConfirmed => {
                write!(f, "Approval was not confirmed in time, please try again")
            }
            MintError::ActionNotConfirmed => {
                write!(f, "Transaction was not confirmed in time, please try again")
            }
            MintError::Chain(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MintError {}

/// Result of a finalized run
#[derive(Debug, Clone)]
pub struct MintOutcome {
    /// Hash of the claim/deposit transaction
    pub tx_hash: String,
    /// Hash of the approval transaction, when one was needed
    pub approval_tx_hash: Option<String>,
    /// Payment charged, in base units
    pub required_amount: U256,
    /// Amount the user received/deposited, in whole units
    pub crypto_amount: Decimal,
    /// Recorded ticket, when a recorder is wired and the call succeeded
    pub ticket: Option<RecordedTicket>,
}

pub struct MintOrchestrator {
    chain: Arc<dyn ChainClient>,
    verifier: Arc<dyn HumanVerification>,
    recorder: Option<Arc<dyn TicketSink>>,
    policy: MintPolicy,
    step_tx: watch::Sender<MintStep>,
    in_flight: AtomicBool,
}

impl MintOrchestrator {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        verifier: Arc<dyn HumanVerification>,
        policy: MintPolicy,
    ) -> Self {
        let (step_tx, _) = watch::channel(MintStep::Idle);
        Self {
            chain,
            verifier,
            recorder: None,
            policy,
            step_tx,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Record a ticket on every finalized run
    pub fn with_recorder(mut self, recorder: Arc<dyn TicketSink>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Subscribe to step transitions
    pub fn steps(&self) -> watch::Receiver<MintStep> {
        self.step_tx.subscribe()
    }

    pub fn current_step(&self) -> MintStep {
        *self.step_tx.borrow()
    }

    fn set_step(&self, step: MintStep) {
        debug!(step = step.as_i8(), "Step transition");
        self.step_tx.send_replace(step);
    }

    /// Run the full orchestration for `action`.
    ///
    /// Errors reset the machine to Idle; success holds Finalized for a
    /// short display cooldown before clearing.
    pub async fn run(&self, action: MintAction, human_token: &str) -> Result<MintOutcome, MintError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("Run already active, ignoring start request");
            return Err(MintError::RunInProgress);
        }

        let result = self.execute(action, human_token).await;

        match &result {
            Ok(outcome) => {
                info!(
                    tx_hash = %outcome.tx_hash,
                    crypto_amount = %outcome.crypto_amount,
                    "Run finalized"
                );
                tokio::time::sleep(COOLDOWN).await;
            }
            Err(e) => {
                error!(error = %e, "Run failed");
            }
        }

        self.set_step(MintStep::Idle);
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn execute(
        &self,
        action: MintAction,
        human_token: &str,
    ) -> Result<MintOutcome, MintError> {
        let owner = self.chain.signer_address();

        // Start guard: nothing is submitted past a failed verification
        let verified = self
            .verifier
            .verify(human_token)
            .await
            .unwrap_or(false);
        if !verified {
            return Err(MintError::HumanVerificationFailed);
        }

        if let MintAction::Claim { quantity, .. } = &action {
            if *quantity < self.policy.min_quantity || *quantity > self.policy.max_quantity {
                return Err(MintError::QuantityOutOfBounds {
                    quantity: *quantity,
                    min: self.policy.min_quantity,
                    max: self.policy.max_quantity,
                });
            }
        }

        // Network guard
        self.chain
            .ensure_chain(self.policy.required_chain_id)
            .await
            .map_err(|e| match e {
                ChainClientError::ChainMismatch { expected, actual } => {
                    MintError::WrongNetwork { expected, actual }
                }
                other => MintError::Chain(other),
            })?;

        self.set_step(MintStep::Initiating);

        // Resolve what the action costs and which contract pulls the payment
        let (required_amount, spender, crypto_amount) = match &action {
            MintAction::Claim { quantity, .. } => {
                let condition = self
                    .chain
                    .active_claim_condition()
                    .await
                    .map_err(MintError::Chain)?;
                if U256::from(*quantity) > condition.quantity_limit_per_wallet {
                    return Err(MintError::QuantityOutOfBounds {
                        quantity: *quantity,
                        min: self.policy.min_quantity,
                        max: condition.quantity_limit_per_wallet.try_into().unwrap_or(u64::MAX),
                    });
                }
                let required = condition
                    .price_per_token
                    .checked_mul(U256::from(*quantity))
                    .ok_or_else(|| {
                        MintError::InvalidAmount("price times quantity overflows".to_string())
                    })?;
                (required, self.chain.token_drop_address(), Decimal::from(*quantity))
            }
            MintAction::Deposit { amount, .. } => {
                if amount.is_zero() {
                    return Err(MintError::InvalidAmount(
                        "deposit amount must be positive".to_string(),
                    ));
                }
                let crypto = units::from_base_units(*amount, self.policy.payment_decimals)
                    .ok_or_else(|| {
                        MintError::InvalidAmount("deposit amount out of range".to_string())
                    })?;
                (*amount, self.chain.pool_vault_address(), crypto)
            }
        };

        // Funding guard: no submission with an underfunded balance
        let balance = self
            .chain
            .payment_token_balance(owner)
            .await
            .map_err(MintError::Chain)?;
        if balance < required_amount {
            return Err(MintError::InsufficientBalance {
                required: required_amount,
                available: balance,
            });
        }

        let allowance = self
            .chain
            .allowance(owner, spender)
            .await
            .map_err(MintError::Chain)?;

        // Approval branch: approve exactly the required amount, then wait
        // for the allowance to actually reflect it
        let mut approval_tx_hash = None;
        if allowance < required_amount {
            info!(
                allowance = %allowance,
                required = %required_amount,
                spender = %spender,
                "Allowance insufficient, submitting approval"
            );

            let hash = self
                .chain
                .submit_approve(spender, required_amount)
                .await
                .map_err(classify_submission_error)?;
            self.set_step(MintStep::Submitted);

            let hash_str = hash.to_string();
            let confirmer = ApprovalConfirmer::new(self.chain.clone());
            if !confirmer
                .confirm_approval(owner, spender, required_amount, &hash_str)
                .await
            {
                return Err(MintError::ApprovalNotConfirmed);
            }
            approval_tx_hash = Some(hash_str);
        }

        // Protected action
        let action_hash = match &action {
            MintAction::Claim { quantity, receiver } => self
                .chain
                .submit_claim(receiver.unwrap_or(owner), U256::from(*quantity))
                .await,
            MintAction::Deposit { amount, .. } => {
                self.chain.submit_deposit(owner, *amount).await
            }
        }
        .map_err(classify_submission_error)?;
        self.set_step(MintStep::Confirmed);

        // Finalization always polls the receipt; a blind settle delay
        // cannot detect a reverted transaction
        let watcher = TransactionReceiptWatcher::new(self.chain.clone());
        let action_hash_str = action_hash.to_string();
        if !watcher.wait_for_receipt(&action_hash_str).await {
            return Err(MintError::ActionNotConfirmed);
        }

        // Refresh the displayed balance; a read failure here does not undo
        // the confirmed transaction
        match self.chain.payment_token_balance(owner).await {
            Ok(refreshed) => debug!(balance = %refreshed, "Balance refreshed"),
            Err(e) => warn!(error = %e, "Balance refresh failed after confirmation"),
        }

        self.set_step(MintStep::Finalized);

        let ticket = match &self.recorder {
            Some(recorder) => {
                let (fiat_amount, info) = match &action {
                    MintAction::Claim { .. } => (
                        units::from_base_units(required_amount, self.policy.payment_decimals)
                            .unwrap_or(Decimal::ZERO),
                        "AGOD token claim".to_string(),
                    ),
                    MintAction::Deposit { fiat_amount, info, .. } => {
                        (*fiat_amount, info.clone())
                    }
                };
                let new_ticket = NewTicket {
                    investment_amount_fiat: fiat_amount,
                    investment_amount_crypto: crypto_amount,
                    investment_info: info,
                    transaction_hash: action_hash_str.clone(),
                    wallet_address: owner.to_string(),
                };
                // On-chain truth is authoritative; a failed receipt record
                // is logged, not rolled back
                match recorder.record_ticket(&new_ticket).await {
                    Ok(t) => Some(t),
                    Err(e) => {
                        error!(
                            error = %e,
                            tx_hash = %action_hash_str,
                            "Ticket recording failed after confirmed transaction"
                        );
                        None
                    }
                }
            }
            None => None,
        };

        Ok(MintOutcome {
            tx_hash: action_hash_str,
            approval_tx_hash,
            required_amount,
            crypto_amount,
            ticket,
        })
    }
}

/// Map a submission error into the user-facing taxonomy
fn classify_submission_error(e: ChainClientError) -> MintError {
    match e {
        ChainClientError::UserRejected(m) => MintError::UserRejected(m),
        ChainClientError::InsufficientFunds(m) => MintError::InsufficientGas(m),
        ChainClientError::ContractCallError(m)
            if m.to_lowercase().contains("exceeds allowance") =>
        {
            MintError::AllowanceExceeded(m)
        }
        other => MintError::Chain(other),
    }
}
