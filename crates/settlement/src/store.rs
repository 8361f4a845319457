use async_trait::async_trait;
use czrpay_types::{BlockHeight, MatchId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════
// CORE TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// Lifecycle state of a settlement obligation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementState {
    /// Derived from the match feed, not yet queued
    Detected,
    Upcoming,
    /// Confirmation wait elapsed; transient
    Active,
    Waiting,
    AutoSettling,
    AwaitingManualConfirm,
    Broadcasting,
    /// Payment broadcast accepted; terminal
    Committed,
    /// Broadcast failed after commit; returned to Waiting for retry
    BroadcastFailed,
    /// Removed after the feed reported the settlement on chain
    Confirmed,
}

impl SettlementState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementState::Detected => "Detected",
            SettlementState::Upcoming => "Upcoming",
            SettlementState::Active => "Active",
            SettlementState::Waiting => "Waiting",
            SettlementState::AutoSettling => "AutoSettling",
            SettlementState::AwaitingManualConfirm => "AwaitingManualConfirm",
            SettlementState::Broadcasting => "Broadcasting",
            SettlementState::Committed => "Committed",
            SettlementState::BroadcastFailed => "BroadcastFailed",
            SettlementState::Confirmed => "Confirmed",
        }
    }
}

impl fmt::Display for SettlementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SettlementState {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Detected" => Ok(SettlementState::Detected),
            "Upcoming" => Ok(SettlementState::Upcoming),
            "Active" => Ok(SettlementState::Active),
            "Waiting" => Ok(SettlementState::Waiting),
            "AutoSettling" => Ok(SettlementState::AutoSettling),
            "AwaitingManualConfirm" => Ok(SettlementState::AwaitingManualConfirm),
            "Broadcasting" => Ok(SettlementState::Broadcasting),
            "Committed" => Ok(SettlementState::Committed),
            "BroadcastFailed" => Ok(SettlementState::BroadcastFailed),
            "Confirmed" => Ok(SettlementState::Confirmed),
            _ => Err(StoreError::SerializationError(format!(
                "Unknown settlement state: {}",
                s
            ))),
        }
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateTransition {
    pub match_id: MatchId,
    pub from: SettlementState,
    pub to: SettlementState,
    /// Chain height when the transition happened
    pub height: BlockHeight,
    /// Unix seconds
    pub timestamp: u64,
    pub details: Option<String>,
    pub tx_hash: Option<String>,
}

impl StateTransition {
    pub fn new(
        match_id: MatchId,
        from: SettlementState,
        to: SettlementState,
        height: BlockHeight,
    ) -> Self {
        Self {
            match_id,
            from,
            to,
            height,
            timestamp: chrono::Utc::now().timestamp() as u64,
            details: None,
            tx_hash: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_tx_hash(mut self, tx_hash: impl Into<String>) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self
    }
}

/// Persisted ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitRecord {
    pub match_id: MatchId,
    pub height: BlockHeight,
    pub committed_at: u64,
}

// ═══════════════════════════════════════════════════════════════════════════
// ERROR TYPES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),
}

// ═══════════════════════════════════════════════════════════════════════════
// STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════

/// Settlement storage trait - can be implemented for different backends
#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Persist a ledger commit. Recording the same id twice is a no-op.
    async fn record_commit(&self, match_id: &MatchId, height: BlockHeight)
        -> Result<(), StoreError>;

    /// All persisted commits, oldest first
    async fn list_commits(&self) -> Result<Vec<CommitRecord>, StoreError>;

    /// Journal a state transition
    async fn record_transition(&self, transition: StateTransition) -> Result<(), StoreError>;

    /// Transition history for one obligation, in recording order
    async fn history(&self, match_id: &MatchId) -> Result<Vec<StateTransition>, StoreError>;
}

// ═══════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE (for testing)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct InMemoryStore {
    commits: Arc<RwLock<Vec<CommitRecord>>>,
    transitions: Arc<RwLock<HashMap<MatchId, Vec<StateTransition>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted commits (for testing)
    pub fn commit_count(&self) -> usize {
        self.commits.read().unwrap().len()
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        self.commits.write().unwrap().clear();
        self.transitions.write().unwrap().clear();
    }
}

#[async_trait]
impl SettlementStore for InMemoryStore {
    async fn record_commit(
        &self,
        match_id: &MatchId,
        height: BlockHeight,
    ) -> Result<(), StoreError> {
        let mut commits = self.commits.write().unwrap();
        if commits.iter().any(|c| &c.match_id == match_id) {
            return Ok(());
        }
        commits.push(CommitRecord {
            match_id: match_id.clone(),
            height,
            committed_at: chrono::Utc::now().timestamp() as u64,
        });
        Ok(())
    }

    async fn list_commits(&self) -> Result<Vec<CommitRecord>, StoreError> {
        Ok(self.commits.read().unwrap().clone())
    }

    async fn record_transition(&self, transition: StateTransition) -> Result<(), StoreError> {
        self.transitions
            .write()
            .unwrap()
            .entry(transition.match_id.clone())
            .or_default()
            .push(transition);
        Ok(())
    }

    async fn history(&self, match_id: &MatchId) -> Result<Vec<StateTransition>, StoreError> {
        Ok(self
            .transitions
            .read()
            .unwrap()
            .get(match_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════
