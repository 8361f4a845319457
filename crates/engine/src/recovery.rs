use czrpay_settlement::{QueueKind, SettlementError, SettlementState, StateTransition};
use czrpay_types::{MatchId, PendingAction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::SettlementEngine;

/// Per-bucket counts from a restore
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    /// Commits reloaded into the ledger from the store
    pub ledger_size: usize,
    /// Records returned by the match feed
    pub matches_seen: usize,
    /// Records whose status is no longer pending
    pub not_pending: usize,
    /// Matches where the counterparty is the one who owes
    pub counterparty_owes: usize,
    /// Obligations with a settlement broadcast already awaiting inclusion
    pub in_flight: usize,
    /// Committed obligations whose last broadcast failed
    pub retry_eligible: usize,
    /// Committed obligations already paid, waiting for the feed to confirm
    pub settled: usize,
    /// Committed obligations with no journaled broadcast outcome; queued in
    /// Waiting but not payable
    pub unresolved: usize,
    /// Records repeated by the feed
    pub duplicates: usize,
    pub upcoming: usize,
    pub waiting: usize,
}

fn in_flight(actions: &[PendingAction], match_id: &MatchId) -> bool {
    actions.iter().any(|a| a.is_settlement_for(match_id))
}

/// Last broadcast result journaled for a committed obligation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BroadcastOutcome {
    Succeeded,
    Failed,
    Unknown,
}

impl SettlementEngine {
    /// Rebuild the ledger and both queues after a restart.
    ///
    /// Committed obligations that the wallet no longer has in flight are
    /// resolved from the journal. A failed last broadcast goes to Waiting and
    /// may be paid once more on request. A successful one is not requeued.
    /// Without a journaled outcome the obligation is queued in Waiting but
    /// stays locked by the ledger.
    pub async fn restore(&self) -> Result<RestoreReport, SettlementError> {
        self.upcoming.lock().await.clear();
        self.waiting.lock().await.clear();
        self.retry_eligible
            .lock()
            .expect("retry set lock poisoned")
            .clear();

        let commits = self.store.list_commits().await?;
        self.ledger
            .replace_all(commits.into_iter().map(|c| c.match_id));

        let addresses = self.wallet_addresses().await?;
        let (records, actions, height) = futures::try_join!(
            async {
                self.collaborators
                    .match_feed
                    .pending_matches(&addresses)
                    .await
                    .map_err(|e| SettlementError::Feed(e.to_string()))
            },
            async {
                self.collaborators
                    .pending_actions
                    .pending_actions()
                    .await
                    .map_err(|e| SettlementError::Feed(e.to_string()))
            },
            self.current_height(),
        )?;

        let mut report = RestoreReport {
            ledger_size: self.ledger.len(),
            matches_seen: records.len(),
            ..Default::default()
        };

        for record in &records {
            if !record.is_pending() {
                report.not_pending += 1;
                continue;
            }
            let Some(obligation) = self.factory.derive(record, &addresses) else {
                report.counterparty_owes += 1;
                continue;
            };
            self.record_derived();
            let match_id = obligation.match_id.clone();

            if in_flight(&actions, &match_id) {
                debug!(match_id = %match_id, "Settlement already in flight, not requeued");
                report.in_flight += 1;
                continue;
            }

            let committed = self.ledger.is_committed(&match_id);
            let outcome = if committed {
                self.last_broadcast_outcome(&match_id).await?
            } else {
                BroadcastOutcome::Unknown
            };
            if outcome == BroadcastOutcome::Succeeded {
                debug!(match_id = %match_id, "Settlement already broadcast, not requeued");
                report.settled += 1;
                continue;
            }

            let kind = if committed
                || self.options.window.blocks_until_active(&obligation, height) == 0
            {
                QueueKind::Waiting
            } else {
                QueueKind::Upcoming
            };

            if !self.enqueue(kind, obligation, height).await {
                report.duplicates += 1;
                continue;
            }

            let to = match kind {
                QueueKind::Upcoming => SettlementState::Upcoming,
                QueueKind::Waiting => SettlementState::Waiting,
            };
            let mut transition =
                StateTransition::new(match_id.clone(), SettlementState::Detected, to, height)
                    .with_details("restored");
            match (committed, outcome) {
                (false, _) => {}
                (true, BroadcastOutcome::Failed) => {
                    debug!(match_id = %match_id, "Last broadcast failed, retry allowed");
                    self.mark_retry_eligible(&match_id);
                    report.retry_eligible += 1;
                    transition = transition.with_details("restored, retry eligible");
                }
                (true, _) => {
                    warn!(match_id = %match_id, "Committed with no recorded broadcast outcome");
                    report.unresolved += 1;
                    transition = transition.with_details("restored, broadcast outcome unknown");
                }
            }
            self.journal(transition).await;
        }

        {
            let window = self.options.window;
            let mut upcoming = self.upcoming.lock().await;
            upcoming.reorder(&window, height);
            report.upcoming = upcoming.len();
        }
        {
            let window = self.options.window;
            let mut waiting = self.waiting.lock().await;
            waiting.reorder(&window, height);
            report.waiting = waiting.len();
        }
        self.refresh_pending().await;

        info!(
            height,
            ledger = report.ledger_size,
            upcoming = report.upcoming,
            waiting = report.waiting,
            in_flight = report.in_flight,
            retry_eligible = report.retry_eligible,
            settled = report.settled,
            unresolved = report.unresolved,
            "Settlement queues restored"
        );
        Ok(report)
    }

    async fn last_broadcast_outcome(
        &self,
        match_id: &MatchId,
    ) -> Result<BroadcastOutcome, SettlementError> {
        let history = self.store.history(match_id).await?;
        Ok(history
            .iter()
            .rev()
            .find_map(|t| match t.to {
                SettlementState::Committed => Some(BroadcastOutcome::Succeeded),
                SettlementState::BroadcastFailed => Some(BroadcastOutcome::Failed),
                _ => None,
            })
            .unwrap_or(BroadcastOutcome::Unknown))
    }
}
