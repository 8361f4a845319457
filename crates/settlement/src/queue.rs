use chrono::{DateTime, Utc};
use czrpay_types::{BlockHeight, MatchId, SettlementObligation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SettlementError;
use crate::window::{EligibilityWindow, UrgencyBand};

/// Which of the two pending collections a queue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueKind {
    /// Matched but still inside the confirmation wait
    Upcoming,
    /// Eligible, awaiting funds, confirmation or a retry
    Waiting,
}

impl QueueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueKind::Upcoming => "upcoming",
            QueueKind::Waiting => "waiting",
        }
    }

    /// Sort key for an entry of this queue. Upcoming orders by blocks until
    /// active, Waiting by blocks until expiry.
    pub fn metric(
        &self,
        window: &EligibilityWindow,
        obligation: &SettlementObligation,
        height: BlockHeight,
    ) -> i64 {
        match self {
            QueueKind::Upcoming => window.blocks_until_active(obligation, height) as i64,
            QueueKind::Waiting => window.blocks_until_expiry(obligation, height),
        }
    }
}

/// A queued obligation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub obligation: SettlementObligation,
    pub added_at: DateTime<Utc>,
    /// Last display refresh
    pub refreshed_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(obligation: SettlementObligation, now: DateTime<Utc>) -> Self {
        Self {
            obligation,
            added_at: now,
            refreshed_at: now,
        }
    }

    pub fn match_id(&self) -> &MatchId {
        &self.obligation.match_id
    }
}

/// Display view of a queue entry at a given height
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub match_id: MatchId,
    pub payer_address: String,
    pub payee_address: String,
    pub amount: Decimal,
    pub other_asset: String,
    pub other_amount: Decimal,
    /// The queue's ordering metric
    pub metric: i64,
    pub blocks_until_active: u64,
    pub blocks_until_expiry: i64,
    pub urgency: UrgencyBand,
    /// Approximate seconds until the entry next changes state: activation
    /// for upcoming entries, expiry for waiting ones
    pub eta_seconds: i64,
    pub added_at: DateTime<Utc>,
    pub refreshed_at: DateTime<Utc>,
}

/// Ordered collection of pending obligations, unique by match id
#[derive(Debug, Clone)]
pub struct SettlementQueue {
    kind: QueueKind,
    entries: Vec<QueueEntry>,
}

impl SettlementQueue {
    pub fn new(kind: QueueKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn contains(&self, match_id: &MatchId) -> bool {
        self.entries.iter().any(|e| e.match_id() == match_id)
    }

    /// Find an entry by full match id or either leg hash
    pub fn get(&self, key: &str) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.match_id().matches(key))
    }

    /// Insert at the front and re-sort, so the newest entry leads among
    /// equal metrics. A second entry for the same match id is rejected.
    pub fn add(
        &mut self,
        obligation: SettlementObligation,
        window: &EligibilityWindow,
        height: BlockHeight,
        now: DateTime<Utc>,
    ) -> Result<(), SettlementError> {
        if self.contains(&obligation.match_id) {
            warn!(
                queue = self.kind.as_str(),
                match_id = %obligation.match_id,
                "Obligation already queued, ignoring"
            );
            return Err(SettlementError::DuplicateObligation(obligation.match_id));
        }

        debug!(
            queue = self.kind.as_str(),
            match_id = %obligation.match_id,
            height,
            "Queued obligation"
        );
        self.entries.insert(0, QueueEntry::new(obligation, now));
        self.reorder(window, height);
        Ok(())
    }

    /// Remove the entry matching the full id or either leg hash
    pub fn remove_by_id(&mut self, key: &str) -> Option<QueueEntry> {
        let index = self.entries.iter().position(|e| e.match_id().matches(key))?;
        Some(self.entries.remove(index))
    }

    /// Stable ascending sort by the queue's metric
    pub fn reorder(&mut self, window: &EligibilityWindow, height: BlockHeight) {
        let kind = self.kind;
        self.entries
            .sort_by_key(|e| kind.metric(window, &e.obligation, height));
    }

    /// Refresh display timestamps; returns the number of entries touched
    pub fn tick(&mut self, now: DateTime<Utc>) -> usize {
        for entry in &mut self.entries {
            entry.refreshed_at = now;
        }
        self.entries.len()
    }

    /// Ids of entries whose confirmation wait has elapsed
    pub fn due(&self, window: &EligibilityWindow, height: BlockHeight) -> Vec<MatchId> {
        self.entries
            .iter()
            .filter(|e| window.blocks_until_active(&e.obligation, height) == 0)
            .map(|e| e.match_id().clone())
            .collect()
    }

    /// Remove and return every entry whose confirmation wait has elapsed,
    /// in queue order
    pub fn take_due(
        &mut self,
        window: &EligibilityWindow,
        height: BlockHeight,
    ) -> Vec<SettlementObligation> {
        let (due, rest): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|e| window.blocks_until_active(&e.obligation, height) == 0);
        self.entries = rest;
        due.into_iter().map(|e| e.obligation).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn snapshot(
        &self,
        window: &EligibilityWindow,
        height: BlockHeight,
    ) -> Vec<EntryView> {
        self.entries
            .iter()
            .map(|entry| {
                let o = &entry.obligation;
                let eta_seconds = match self.kind {
                    QueueKind::Upcoming => window.seconds_until_active(o, height) as i64,
                    QueueKind::Waiting => window.seconds_until_expiry(o, height),
                };
                EntryView {
                    match_id: o.match_id.clone(),
                    payer_address: o.payer_address.clone(),
                    payee_address: o.payee_address.clone(),
                    amount: o.amount,
                    other_asset: o.other_asset.clone(),
                    other_amount: o.other_amount,
                    metric: self.kind.metric(window, o, height),
                    blocks_until_active: window.blocks_until_active(o, height),
                    blocks_until_expiry: window.blocks_until_expiry(o, height),
                    urgency: window.urgency(o, height),
                    eta_seconds,
                    added_at: entry.added_at,
                    refreshed_at: entry.refreshed_at,
                }
            })
            .collect()
    }
}
