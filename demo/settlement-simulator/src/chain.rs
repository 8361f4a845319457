//! Simulated chain, wallet and match feed
//!
//! Everything lives in memory. The chain advances one block per call to
//! [`SimulatedChain::advance`]; settlement payments sit in the pending
//! action list for one block and then confirm.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use czrpay_engine::{
    FeedError, MatchFeed, PaymentKind, PaymentParams, PendingActionFeed, Wallet, WalletAddress,
    WalletError,
};
use czrpay_types::{
    BlockHeight, MatchId, MatchRecord, MatchStatus, PendingAction, TxHash, LEG_HASH_LEN,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::RwLock;
use tracing::{debug, info};

const COUNTERPARTY: &str = "1SimCounterparty";
const OTHER_ASSETS: [&str; 3] = ["XCP", "PEPECASH", "RAREPEPE"];

/// Simulator knobs
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub start_height: BlockHeight,
    pub settlement_asset: String,
    /// Probability that a broadcast is rejected
    pub failure_rate: f64,
    /// Broadcast latency range in milliseconds
    pub latency_range: (u64, u64),
    /// Raw units credited to every local address at start
    pub starting_balance: u128,
    pub seed: u64,
}

struct ChainState {
    height: BlockHeight,
    balances: HashMap<String, u128>,
    matches: Vec<MatchRecord>,
    /// In-flight payments with the height they were broadcast at
    in_flight: Vec<(PendingAction, BlockHeight)>,
}

pub struct SimulatedChain {
    settings: ChainSettings,
    addresses: Vec<WalletAddress>,
    state: RwLock<ChainState>,
    rng: Mutex<StdRng>,
}

impl SimulatedChain {
    pub fn new(settings: ChainSettings, addresses: Vec<String>) -> Self {
        let balances = addresses
            .iter()
            .map(|a| (a.clone(), settings.starting_balance))
            .collect();
        let addresses = addresses
            .into_iter()
            .enumerate()
            .map(|(i, address)| WalletAddress {
                address,
                label: format!("Address #{}", i + 1),
                secondary_balance: 0,
            })
            .collect();

        Self {
            rng: Mutex::new(StdRng::seed_from_u64(settings.seed)),
            state: RwLock::new(ChainState {
                height: settings.start_height,
                balances,
                matches: Vec::new(),
                in_flight: Vec::new(),
            }),
            addresses,
            settings,
        }
    }

    pub async fn height(&self) -> BlockHeight {
        self.state.read().await.height
    }

    fn random_hash(&self) -> String {
        let mut rng = self.rng.lock().expect("rng lock poisoned");
        (0..LEG_HASH_LEN / 32)
            .map(|_| format!("{:032x}", rng.gen::<u128>()))
            .collect()
    }

    /// Mine one block. Returns the match ids whose settlement payments
    /// confirmed in it.
    pub async fn advance(&self) -> Vec<MatchId> {
        let mut state = self.state.write().await;
        state.height += 1;
        let height = state.height;

        let (confirmed, still_pending): (Vec<_>, Vec<_>) = state
            .in_flight
            .drain(..)
            .partition(|(_, sent_at)| *sent_at < height);
        state.in_flight = still_pending;

        let ids: Vec<MatchId> = confirmed
            .into_iter()
            .filter_map(|(action, _)| action.match_id)
            .collect();
        for record in state.matches.iter_mut() {
            if ids.contains(&record.match_id()) {
                record.status = MatchStatus::Completed;
            }
        }
        // Matches nobody settled in time
        for record in state.matches.iter_mut() {
            if record.status == MatchStatus::Pending && record.match_expire_index < height {
                record.status = MatchStatus::Expired;
            }
        }

        debug!(height, confirmed = ids.len(), "Block mined");
        ids
    }

    /// Create a new pending match at the current height. Our leg gives the
    /// settlement asset unless `counterparty_owes` is set.
    pub async fn spawn_match(&self, counterparty_owes: bool) -> MatchRecord {
        let ours = self.addresses[0].address.clone();
        let (quantity, other_quantity, other_asset, lifetime) = {
            let mut rng = self.rng.lock().expect("rng lock poisoned");
            (
                rng.gen_range(1_000_000..200_000_000u64),
                rng.gen_range(1..500u64),
                OTHER_ASSETS[rng.gen_range(0..OTHER_ASSETS.len())],
                rng.gen_range(15..40u64),
            )
        };
        let (tx0_hash, tx1_hash) = (self.random_hash(), self.random_hash());

        let mut state = self.state.write().await;
        let height = state.height;
        // The second leg always gives the settlement asset
        let (tx0_address, tx1_address) = if counterparty_owes {
            (ours, COUNTERPARTY.to_string())
        } else {
            (COUNTERPARTY.to_string(), ours)
        };

        let record = MatchRecord {
            tx0_address,
            tx1_address,
            tx0_hash,
            tx1_hash,
            tx0_index: height * 10,
            tx1_index: height * 10 + 1,
            tx0_block_index: height.saturating_sub(2),
            tx1_block_index: height,
            forward_asset: other_asset.to_string(),
            backward_asset: self.settings.settlement_asset.clone(),
            forward_asset_divisible: false,
            backward_asset_divisible: true,
            forward_quantity: other_quantity,
            backward_quantity: quantity,
            match_expire_index: height + lifetime,
            status: MatchStatus::Pending,
        };
        state.matches.push(record.clone());
        record
    }

    /// Credit raw units to `address`
    pub async fn fund(&self, address: &str, amount: u128) {
        let mut state = self.state.write().await;
        let balance = state.balances.entry(address.to_string()).or_insert(0);
        *balance = balance.saturating_add(amount);
        info!(address, amount, balance = *balance, "Address funded");
    }

    async fn simulate_latency(&self) {
        let delay = {
            let mut rng = self.rng.lock().expect("rng lock poisoned");
            rng.gen_range(self.settings.latency_range.0..=self.settings.latency_range.1)
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

#[async_trait]
impl Wallet for SimulatedChain {
    async fn list_addresses(&self) -> Result<Vec<WalletAddress>, WalletError> {
        Ok(self.addresses.clone())
    }

    async fn balance(&self, address: &str, asset: &str, _cached: bool) -> Result<u128, WalletError> {
        if asset != self.settings.settlement_asset {
            return Ok(0);
        }
        self.state
            .read()
            .await
            .balances
            .get(address)
            .copied()
            .ok_or_else(|| WalletError::UnknownAddress(address.to_string()))
    }

    async fn broadcast_payment(
        &self,
        address: &str,
        kind: PaymentKind,
        params: &PaymentParams,
    ) -> Result<TxHash, WalletError> {
        self.simulate_latency().await;

        let rejected = {
            let mut rng = self.rng.lock().expect("rng lock poisoned");
            rng.gen_bool(self.settings.failure_rate.clamp(0.0, 1.0))
        };
        if rejected {
            return Err(WalletError::BroadcastRejected(
                "simulated mempool rejection".to_string(),
            ));
        }
        let tx_hash = self.random_hash();

        let mut state = self.state.write().await;
        let height = state.height;
        let balance = state
            .balances
            .get_mut(address)
            .ok_or_else(|| WalletError::UnknownAddress(address.to_string()))?;
        *balance = balance
            .checked_sub(params.amount_raw as u128)
            .ok_or_else(|| WalletError::BroadcastRejected("insufficient funds".to_string()))?;

        debug!(?kind, match_id = %params.order_match_id, tx_hash = %tx_hash, "Payment accepted");
        state.in_flight.push((
            PendingAction {
                tx_hash: Some(tx_hash.clone()),
                ..PendingAction::settlement(params.order_match_id.clone())
            },
            height,
        ));
        Ok(tx_hash)
    }

    async fn current_height(&self) -> Result<BlockHeight, WalletError> {
        Ok(self.height().await)
    }
}

#[async_trait]
impl MatchFeed for SimulatedChain {
    async fn pending_matches(&self, addresses: &[String]) -> Result<Vec<MatchRecord>, FeedError> {
        Ok(self
            .state
            .read()
            .await
            .matches
            .iter()
            .filter(|r| r.is_pending())
            .filter(|r| addresses.contains(&r.tx0_address) || addresses.contains(&r.tx1_address))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PendingActionFeed for SimulatedChain {
    async fn pending_actions(&self) -> Result<Vec<PendingAction>, FeedError> {
        Ok(self
            .state
            .read()
            .await
            .in_flight
            .iter()
            .map(|(action, _)| action.clone())
            .collect())
    }
}
