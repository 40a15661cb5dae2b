//! Chain client boundary for the mint/invest flows
//!
//! Everything the orchestration core needs from the chain goes through the
//! [`ChainClient`] trait: payment-token reads, claim conditions, transaction
//! submission and receipt queries. The production implementation talks to an
//! EVM RPC endpoint via alloy with a service-owned signer; tests substitute
//! a scripted mock.

use alloy::{
    network::EthereumWallet,
    primitives::{Address, TxHash, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    signers::local::PrivateKeySigner,
    sol,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

// ERC-20 surface consumed by the flows: balance, allowance, approve
sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

// Token drop contract: claim plus the active claim condition
sol! {
    #[sol(rpc)]
    interface ITokenDrop {
        function claim(address receiver, uint256 quantity) external;
        function getActiveClaimCondition() external view returns (uint256 pricePerToken, address currency, uint256 quantityLimitPerWallet);
    }
}

// Investment pool vault: stablecoin deposits on behalf of a beneficiary
sol! {
    #[sol(rpc)]
    interface IInvestmentVault {
        function deposit(address beneficiary, uint256 amount) external;
    }
}

/// Outcome recorded in a transaction receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Active claim condition on the drop contract
#[derive(Debug, Clone)]
pub struct ClaimCondition {
    /// Price per whole token, in payment-token base units
    pub price_per_token: U256,
    /// Payment currency the drop charges in
    pub currency: Address,
    /// Per-wallet claim ceiling, in whole tokens
    pub quantity_limit_per_wallet: U256,
}

/// Error types for chain client operations
#[derive(Debug, Clone)]
pub enum ChainClientError {
    ProviderError(String),
    ContractCallError(String),
    /// Signature/submission declined by the wallet
    UserRejected(String),
    /// Not enough native currency to cover gas
    InsufficientFunds(String),
    InvalidAddress(String),
    InvalidConfig(String),
    ChainMismatch { expected: u64, actual: u64 },
}

impl std::fmt::Display for ChainClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainClientError::ProviderError(msg) => write!(f, "Provider error: {}", msg),
            ChainClientError::ContractCallError(msg) => write!(f, "Contract call error: {}", msg),
            ChainClientError::UserRejected(msg) => write!(f, "Rejected by signer: {}", msg),
            ChainClientError::InsufficientFunds(msg) => {
                write!(f, "Insufficient funds for gas: {}", msg)
            }
            ChainClientError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            ChainClientError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            ChainClientError::ChainMismatch { expected, actual } => {
                write!(f, "Chain mismatch: expected {}, connected to {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for ChainClientError {}

/// Classify a raw submission error by its message, mirroring the wallet
/// error strings surfaced by RPC nodes and wallet providers.
fn classify_submit_error(context: &str, msg: String) -> ChainClientError {
    let lower = msg.to_lowercase();
    if lower.contains("user rejected") || lower.contains("user denied") {
        ChainClientError::UserRejected(msg)
    } else if lower.contains("insufficient funds") {
        ChainClientError::InsufficientFunds(msg)
    } else {
        ChainClientError::ContractCallError(format!("{}: {}", context, msg))
    }
}

/// Chain surface consumed by the orchestration core.
///
/// Injected at construction, never reached through ambient globals, so the
/// core can be exercised against a fake in tests.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address the service signs and claims with
    fn signer_address(&self) -> Address;

    /// Token drop contract address (the claim flow's spender)
    fn token_drop_address(&self) -> Address;

    /// Investment pool vault address (the deposit flow's spender)
    fn pool_vault_address(&self) -> Address;

    /// Chain id of the connected endpoint
    async fn chain_id(&self) -> Result<u64, ChainClientError>;

    /// Verify the connection is on `expected`, requesting a switch where the
    /// transport supports one. An HTTP provider pins its chain, so a
    /// mismatch surfaces as [`ChainClientError::ChainMismatch`].
    async fn ensure_chain(&self, expected: u64) -> Result<(), ChainClientError>;

    /// Payment-token balance of `owner`, in base units
    async fn payment_token_balance(&self, owner: Address) -> Result<U256, ChainClientError>;

    /// Payment-token allowance granted by `owner` to `spender`, in base units
    async fn allowance(&self, owner: Address, spender: Address)
        -> Result<U256, ChainClientError>;

    /// Active claim condition on the drop contract
    async fn active_claim_condition(&self) -> Result<ClaimCondition, ChainClientError>;

    /// Submit an ERC-20 approve for `spender`/`amount`, returning the
    /// transaction hash once the submission is accepted
    async fn submit_approve(
        &self,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, ChainClientError>;

    /// Submit a claim of `quantity` whole tokens to `receiver`
    async fn submit_claim(
        &self,
        receiver: Address,
        quantity: U256,
    ) -> Result<TxHash, ChainClientError>;

    /// Submit a pool deposit of `amount` payment-token base units for
    /// `beneficiary`
    async fn submit_deposit(
        &self,
        beneficiary: Address,
        amount: U256,
    ) -> Result<TxHash, ChainClientError>;

    /// Receipt status for `hash`, or None while the transaction is pending
    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<ReceiptStatus>, ChainClientError>;
}

/// Contract addresses the production client operates against
#[derive(Debug, Clone)]
pub struct ChainContracts {
    /// Payment token (stablecoin) the drop charges in
    pub payment_token: Address,
    /// Token drop contract (claim target)
    pub token_drop: Address,
    /// Investment pool vault contract (deposit target)
    pub pool_vault: Address,
}

/// Production chain client backed by alloy
pub struct AlloyChainClient {
    provider: RootProvider<Http<Client>>,
    wallet: EthereumWallet,
    rpc_url: String,
    contracts: ChainContracts,
}

impl AlloyChainClient {
    /// Connect to `rpc_url` with the given signing key.
    ///
    /// # Errors
    ///
    /// Returns error if the key, URL or addresses are invalid, or the
    /// endpoint is unreachable.
    pub async fn new(
        rpc_url: &str,
        private_key: &str,
        contracts: ChainContracts,
    ) -> Result<Self, ChainClientError> {
        info!(rpc_url = %rpc_url, "Initializing AlloyChainClient");

        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| ChainClientError::InvalidConfig(format!("Invalid private key: {}", e)))?;

        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| ChainClientError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?,
        );

        // Verify connection
        let chain_id = provider.get_chain_id().await.map_err(|e| {
            error!(error = %e, "Failed to connect to RPC");
            ChainClientError::ProviderError(format!("Connection failed: {}", e))
        })?;

        info!(
            chain_id = chain_id,
            payment_token = %contracts.payment_token,
            token_drop = %contracts.token_drop,
            pool_vault = %contracts.pool_vault,
            "AlloyChainClient initialized successfully"
        );

        Ok(Self {
            provider,
            wallet,
            rpc_url: rpc_url.to_string(),
            contracts,
        })
    }

    /// Build a wallet-filled provider for submissions
    fn signing_provider(&self) -> Result<impl Provider<Http<Client>>, ChainClientError> {
        Ok(ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(self.wallet.clone())
            .on_http(self.rpc_url.parse().map_err(|e| {
                ChainClientError::InvalidConfig(format!("Invalid RPC URL: {}", e))
            })?))
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    fn signer_address(&self) -> Address {
        self.wallet.default_signer().address()
    }

    fn token_drop_address(&self) -> Address {
        self.contracts.token_drop
    }

    fn pool_vault_address(&self) -> Address {
        self.contracts.pool_vault
    }

    async fn chain_id(&self) -> Result<u64, ChainClientError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ChainClientError::ProviderError(format!("Chain id query failed: {}", e)))
    }

    async fn ensure_chain(&self, expected: u64) -> Result<(), ChainClientError> {
        let actual = self.chain_id().await?;
        if actual != expected {
            warn!(
                expected = expected,
                actual = actual,
                "Connected endpoint is on the wrong chain"
            );
            return Err(ChainClientError::ChainMismatch { expected, actual });
        }
        Ok(())
    }

    async fn payment_token_balance(&self, owner: Address) -> Result<U256, ChainClientError> {
        let token = IERC20::new(self.contracts.payment_token, &self.provider);
        let result = token.balanceOf(owner).call().await.map_err(|e| {
            ChainClientError::ContractCallError(format!("balanceOf failed: {}", e))
        })?;
        Ok(result._0)
    }

    async fn allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainClientError> {
        let token = IERC20::new(self.contracts.payment_token, &self.provider);
        let result = token.allowance(owner, spender).call().await.map_err(|e| {
            ChainClientError::ContractCallError(format!("allowance failed: {}", e))
        })?;
        Ok(result._0)
    }

    async fn active_claim_condition(&self) -> Result<ClaimCondition, ChainClientError> {
        let drop = ITokenDrop::new(self.contracts.token_drop, &self.provider);
        let result = drop.getActiveClaimCondition().call().await.map_err(|e| {
            ChainClientError::ContractCallError(format!("getActiveClaimCondition failed: {}", e))
        })?;
        Ok(ClaimCondition {
            price_per_token: result.pricePerToken,
            currency: result.currency,
            quantity_limit_per_wallet: result.quantityLimitPerWallet,
        })
    }

    async fn submit_approve(
        &self,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, ChainClientError> {
        debug!(spender = %spender, amount = %amount, "Submitting approve");

        let provider = self.signing_provider()?;
        let token = IERC20::new(self.contracts.payment_token, &provider);

        let pending = token.approve(spender, amount).send().await.map_err(|e| {
            error!(error = %e, "Failed to send approve transaction");
            classify_submit_error("approve", e.to_string())
        })?;

        let tx_hash = *pending.tx_hash();
        info!(tx_hash = %tx_hash, "Approve transaction sent");
        Ok(tx_hash)
    }

    async fn submit_claim(
        &self,
        receiver: Address,
        quantity: U256,
    ) -> Result<TxHash, ChainClientError> {
        debug!(receiver = %receiver, quantity = %quantity, "Submitting claim");

        let provider = self.signing_provider()?;
        let drop = ITokenDrop::new(self.contracts.token_drop, &provider);

        let pending = drop.claim(receiver, quantity).send().await.map_err(|e| {
            error!(error = %e, "Failed to send claim transaction");
            classify_submit_error("claim", e.to_string())
        })?;

        let tx_hash = *pending.tx_hash();
        info!(tx_hash = %tx_hash, "Claim transaction sent");
        Ok(tx_hash)
    }

    async fn submit_deposit(
        &self,
        beneficiary: Address,
        amount: U256,
    ) -> Result<TxHash, ChainClientError> {
        debug!(beneficiary = %beneficiary, amount = %amount, "Submitting deposit");

        let provider = self.signing_provider()?;
        let vault = IInvestmentVault::new(self.contracts.pool_vault, &provider);

        let pending = vault.deposit(beneficiary, amount).send().await.map_err(|e| {
            error!(error = %e, "Failed to send deposit transaction");
            classify_submit_error("deposit", e.to_string())
        })?;

        let tx_hash = *pending.tx_hash();
        info!(tx_hash = %tx_hash, "Deposit transaction sent");
        Ok(tx_hash)
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<ReceiptStatus>, ChainClientError> {
        let receipt = self.provider.get_transaction_receipt(hash).await.map_err(|e| {
            ChainClientError::ProviderError(format!("Receipt query failed: {}", e))
        })?;

        Ok(receipt.map(|r| {
            if r.status() {
                ReceiptStatus::Success
            } else {
                ReceiptStatus::Reverted
            }
        }))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted chain client for exercising the orchestration core.

    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    pub const SIGNER: Address = Address::new([0x11; 20]);
    pub const SPENDER: Address = Address::new([0x22; 20]);
    pub const POOL: Address = Address::new([0x33; 20]);
    pub const PAYMENT_TOKEN: Address = Address::new([0x44; 20]);
    pub const APPROVE_HASH: TxHash = TxHash::new([0xaa; 32]);
    pub const CLAIM_HASH: TxHash = TxHash::new([0xbb; 32]);
    pub const DEPOSIT_HASH: TxHash = TxHash::new([0xcc; 32]);

    /// One receipt query outcome: a status, nothing yet, or a query error
    pub type ReceiptSample = Result<Option<ReceiptStatus>, ChainClientError>;

    /// Scripted fake: receipt samples and allowance samples are consumed in
    /// order, with the last one repeating once the script runs dry.
    pub struct MockChainClient {
        pub chain_id: u64,
        pub balance: Mutex<U256>,
        pub claim_condition: Mutex<ClaimCondition>,
        /// One entry per receipt query; `Ok(None)` means "no receipt yet"
        pub receipt_script: Mutex<VecDeque<ReceiptSample>>,
        /// One entry per allowance query
        pub allowance_script: Mutex<VecDeque<U256>>,
        /// When set, a successful approve appends the approved amount to the
        /// allowance script (the approval "landing" on chain)
        pub approve_updates_allowance: bool,
        /// Artificial latency per receipt query, for timeout races
        pub receipt_delay: Option<Duration>,
        /// Error to fail the next submission with
        pub submit_failure: Mutex<Option<ChainClientError>>,
        pub receipt_queries: AtomicU32,
        pub approve_count: AtomicU32,
        pub claim_count: AtomicU32,
        pub deposit_count: AtomicU32,
    }

    impl MockChainClient {
        pub fn new() -> Self {
            Self {
                chain_id: 8453,
                balance: Mutex::new(U256::from(1_000_000_000u64)),
                claim_condition: Mutex::new(ClaimCondition {
                    price_per_token: U256::from(7_000u64),
                    currency: PAYMENT_TOKEN,
                    quantity_limit_per_wallet: U256::from(10_000u64),
                }),
                receipt_script: Mutex::new(VecDeque::new()),
                allowance_script: Mutex::new(VecDeque::new()),
                approve_updates_allowance: true,
                receipt_delay: None,
                submit_failure: Mutex::new(None),
                receipt_queries: AtomicU32::new(0),
                approve_count: AtomicU32::new(0),
                claim_count: AtomicU32::new(0),
                deposit_count: AtomicU32::new(0),
            }
        }

        pub fn script_receipts(self, samples: Vec<Option<ReceiptStatus>>) -> Self {
            *self.receipt_script.lock() = samples.into_iter().map(Ok).collect();
            self
        }

        pub fn script_receipt_results(self, samples: Vec<ReceiptSample>) -> Self {
            *self.receipt_script.lock() = samples.into();
            self
        }

        pub fn script_allowances(self, samples: Vec<U256>) -> Self {
            *self.allowance_script.lock() = samples.into();
            self
        }

        fn next_scripted<T: Clone>(queue: &Mutex<VecDeque<T>>, fallback: T) -> T {
            let mut q = queue.lock();
            if q.len() > 1 {
                q.pop_front().unwrap()
            } else {
                q.front().cloned().unwrap_or(fallback)
            }
        }

        fn take_submit_failure(&self) -> Option<ChainClientError> {
            self.submit_failure.lock().take()
        }
    }

    #[async_trait]
    impl ChainClient for MockChainClient {
        fn signer_address(&self) -> Address {
            SIGNER
        }

        fn token_drop_address(&self) -> Address {
            SPENDER
        }

        fn pool_vault_address(&self) -> Address {
            POOL
        }

        async fn chain_id(&self) -> Result<u64, ChainClientError> {
            Ok(self.chain_id)
        }

        async fn ensure_chain(&self, expected: u64) -> Result<(), ChainClientError> {
            if self.chain_id != expected {
                return Err(ChainClientError::ChainMismatch {
                    expected,
                    actual: self.chain_id,
                });
            }
            Ok(())
        }

        async fn payment_token_balance(&self, _owner: Address) -> Result<U256, ChainClientError> {
            Ok(*self.balance.lock())
        }

        async fn allowance(
            &self,
            _owner: Address,
            _spender: Address,
        ) -> Result<U256, ChainClientError> {
            Ok(Self::next_scripted(&self.allowance_script, U256::ZERO))
        }

        async fn active_claim_condition(&self) -> Result<ClaimCondition, ChainClientError> {
            Ok(self.claim_condition.lock().clone())
        }

        async fn submit_approve(
            &self,
            _spender: Address,
            amount: U256,
        ) -> Result<TxHash, ChainClientError> {
            if let Some(err) = self.take_submit_failure() {
                return Err(err);
            }
            self.approve_count.fetch_add(1, Ordering::SeqCst);
            if self.approve_updates_allowance {
                self.allowance_script.lock().push_back(amount);
            }
            Ok(APPROVE_HASH)
        }

        async fn submit_claim(
            &self,
            _receiver: Address,
            _quantity: U256,
        ) -> Result<TxHash, ChainClientError> {
            if let Some(err) = self.take_submit_failure() {
                return Err(err);
            }
            self.claim_count.fetch_add(1, Ordering::SeqCst);
            Ok(CLAIM_HASH)
        }

        async fn submit_deposit(
            &self,
            _beneficiary: Address,
            _amount: U256,
        ) -> Result<TxHash, ChainClientError> {
            if let Some(err) = self.take_submit_failure() {
                return Err(err);
            }
            self.deposit_count.fetch_add(1, Ordering::SeqCst);
            Ok(DEPOSIT_HASH)
        }

        async fn transaction_receipt(
            &self,
            _hash: TxHash,
        ) -> Result<Option<ReceiptStatus>, ChainClientError> {
            self.receipt_queries.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.receipt_delay {
                tokio::time::sleep(delay).await;
            }
            Self::next_scripted(&self.receipt_script, Ok(None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_user_rejection() {
        let err = classify_submit_error("approve", "user rejected the request".to_string());
        assert!(matches!(err, ChainClientError::UserRejected(_)));
    }

    #[test]
    fn classify_insufficient_funds() {
        let err = classify_submit_error(
            "claim",
            "insufficient funds for gas * price + value".to_string(),
        );
        assert!(matches!(err, ChainClientError::InsufficientFunds(_)));
    }

    #[test]
    fn classify_generic_keeps_context() {
        let err = classify_submit_error("deposit", "nonce too low".to_string());
        match err {
            ChainClientError::ContractCallError(msg) => {
                assert!(msg.contains("deposit"));
                assert!(msg.contains("nonce too low"));
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn error_display() {
        let err = ChainClientError::ChainMismatch { expected: 8453, actual: 1 };
        assert!(err.to_string().contains("8453"));
    }
}
