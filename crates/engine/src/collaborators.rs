//! Interfaces to the systems the engine drives but does not own

use async_trait::async_trait;
use czrpay_types::{BlockHeight, MatchId, MatchRecord, PendingAction, TxHash};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet unavailable: {0}")]
    Unavailable(String),

    #[error("unknown address: {0}")]
    UnknownAddress(String),

    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed unavailable: {0}")]
    Unavailable(String),

    #[error("malformed feed record: {0}")]
    Malformed(String),
}

/// An address held by the local wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAddress {
    pub address: String,
    pub label: String,
    /// Balance of the chain's native asset, informational
    pub secondary_balance: u128,
}

/// Kind of transaction the wallet is asked to broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    SettlementPayment,
}

/// Parameters of a settlement payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentParams {
    pub order_match_id: MatchId,
    pub source: String,
    pub destination: String,
    pub asset: String,
    pub amount_raw: u64,
}

/// Address book, balances, chain height and transaction broadcast
#[async_trait]
pub trait Wallet: Send + Sync {
    async fn list_addresses(&self) -> Result<Vec<WalletAddress>, WalletError>;

    /// Raw balance of `asset` at `address`. `cached` allows a stale answer.
    async fn balance(&self, address: &str, asset: &str, cached: bool)
        -> Result<u128, WalletError>;

    /// Sign and broadcast a payment from `address`
    async fn broadcast_payment(
        &self,
        address: &str,
        kind: PaymentKind,
        params: &PaymentParams,
    ) -> Result<TxHash, WalletError>;

    async fn current_height(&self) -> Result<BlockHeight, WalletError>;

    /// Told after each queue change whether any obligations are pending
    async fn flag_pending_obligations(&self, _pending: bool) {}
}

/// Source of order matches involving the wallet's addresses
#[async_trait]
pub trait MatchFeed: Send + Sync {
    async fn pending_matches(&self, addresses: &[String]) -> Result<Vec<MatchRecord>, FeedError>;
}

/// Source of broadcasts the wallet has sent but the chain has not yet included
#[async_trait]
pub trait PendingActionFeed: Send + Sync {
    async fn pending_actions(&self) -> Result<Vec<PendingAction>, FeedError>;
}

/// Out-of-band messages for the wallet owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// A payment was broadcast
    Settled {
        match_id: MatchId,
        tx_hash: TxHash,
        payee: String,
        amount: Decimal,
        automatic: bool,
    },
    /// The payer address cannot cover the payment
    SettlementRequired {
        match_id: MatchId,
        payer: String,
        needed: u128,
        available: u128,
    },
    /// Automatic payment is off; the owner must confirm
    ConfirmationRequested {
        match_id: MatchId,
        payer: String,
        payee: String,
        amount: Decimal,
        blocks_until_expiry: i64,
    },
    /// The wallet failed to broadcast; the obligation awaits a manual retry
    BroadcastFailed { match_id: MatchId, reason: String },
}

impl Notice {
    pub fn match_id(&self) -> &MatchId {
        match self {
            Notice::Settled { match_id, .. }
            | Notice::SettlementRequired { match_id, .. }
            | Notice::ConfirmationRequested { match_id, .. }
            | Notice::BroadcastFailed { match_id, .. } => match_id,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: Notice);
}

/// Notifier that writes notices to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notice: Notice) {
        match notice {
            Notice::Settled {
                match_id,
                tx_hash,
                payee,
                amount,
                automatic,
            } => info!(
                match_id = %match_id,
                tx_hash = %tx_hash,
                payee = %payee,
                amount = %amount,
                automatic,
                "Settlement payment sent"
            ),
            Notice::SettlementRequired {
                match_id,
                payer,
                needed,
                available,
            } => warn!(
                match_id = %match_id,
                payer = %payer,
                needed,
                available,
                "Settlement required but balance is too low"
            ),
            Notice::ConfirmationRequested {
                match_id,
                payer,
                payee,
                amount,
                blocks_until_expiry,
            } => info!(
                match_id = %match_id,
                payer = %payer,
                payee = %payee,
                amount = %amount,
                blocks_until_expiry,
                "Settlement awaiting confirmation"
            ),
            Notice::BroadcastFailed { match_id, reason } => warn!(
                match_id = %match_id,
                reason = %reason,
                "Settlement broadcast failed, retry from the waiting queue"
            ),
        }
    }
}
