use chrono::{DateTime, Utc};
use czrpay_config::SettlementConfig;
use czrpay_metrics::{MetricsCollector, SettlementSpan};
use czrpay_settlement::{
    CommitLedger, EligibilityWindow, EntryView, ObligationFactory, QueueKind, SettlementError,
    SettlementQueue, SettlementState, SettlementStore, StateTransition,
};
use czrpay_types::{BlockHeight, MatchId, MatchRecord, SettlementObligation, TxHash};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn, Instrument};

use crate::collaborators::{
    MatchFeed, Notice, Notifier, PaymentKind, PaymentParams, PendingActionFeed, Wallet,
};

/// Process-wide settlement parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub settlement_asset: String,
    pub window: EligibilityWindow,
    /// Subunits kept back on top of the owed amount
    pub minimum_reserve: u64,
    /// Initial auto-settle preference
    pub auto_settle: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&SettlementConfig::default())
    }
}

impl EngineOptions {
    pub fn from_config(config: &SettlementConfig) -> Self {
        Self {
            settlement_asset: config.settlement_asset.clone(),
            window: EligibilityWindow {
                wait_blocks: config.wait_blocks,
                expire_margin_blocks: config.expire_margin_blocks,
                manual_min_age_blocks: config.manual_min_age_blocks,
                approx_seconds_per_block: config.approx_seconds_per_block,
            },
            minimum_reserve: config.minimum_reserve,
            auto_settle: config.auto_settle,
        }
    }
}

/// External systems the engine talks to
#[derive(Clone)]
pub struct Collaborators {
    pub wallet: Arc<dyn Wallet>,
    pub match_feed: Arc<dyn MatchFeed>,
    pub pending_actions: Arc<dyn PendingActionFeed>,
    pub notifier: Arc<dyn Notifier>,
}

/// Result of a settlement attempt that was not refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessOutcome {
    /// Payment broadcast; the obligation is discharged
    Settled { tx_hash: TxHash },
    /// Auto-settle is off; queued in Waiting for the owner
    AwaitingConfirmation,
    /// Queued in Waiting until the payer address is funded
    AwaitingFunds { needed: u128, available: u128 },
    /// Broadcast failed after commit; queued in Waiting for a manual retry
    BroadcastFailed { reason: String },
}

/// Summary of one periodic tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub height: BlockHeight,
    /// Upcoming entries whose wait elapsed this tick
    pub promoted: usize,
    pub outcomes: Vec<(MatchId, ProcessOutcome)>,
    /// Promoted entries refused by `process` and dropped
    pub refused: usize,
    pub upcoming: usize,
    pub waiting: usize,
}

/// The settlement lifecycle state machine.
///
/// Owns the commit ledger and both queues. Shared across tasks as
/// `Arc<SettlementEngine>`; queue locks are never held across a collaborator
/// call, and Upcoming is always locked before Waiting.
pub struct SettlementEngine {
    pub(crate) options: EngineOptions,
    auto_settle: AtomicBool,
    pub(crate) factory: ObligationFactory,
    pub(crate) ledger: CommitLedger,
    pub(crate) upcoming: Mutex<SettlementQueue>,
    pub(crate) waiting: Mutex<SettlementQueue>,
    /// Committed ids whose broadcast failed and may be paid again once
    pub(crate) retry_eligible: StdMutex<HashSet<MatchId>>,
    pub(crate) collaborators: Collaborators,
    pub(crate) store: Arc<dyn SettlementStore>,
    pub(crate) metrics: Option<Arc<MetricsCollector>>,
}

impl SettlementEngine {
    pub fn new(
        options: EngineOptions,
        collaborators: Collaborators,
        store: Arc<dyn SettlementStore>,
    ) -> Self {
        Self {
            auto_settle: AtomicBool::new(options.auto_settle),
            factory: ObligationFactory::new(options.settlement_asset.clone()),
            ledger: CommitLedger::new(),
            upcoming: Mutex::new(SettlementQueue::new(QueueKind::Upcoming)),
            waiting: Mutex::new(SettlementQueue::new(QueueKind::Waiting)),
            retry_eligible: StdMutex::new(HashSet::new()),
            options,
            collaborators,
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn window(&self) -> &EligibilityWindow {
        &self.options.window
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SETTINGS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn auto_settle(&self) -> bool {
        self.auto_settle.load(Ordering::SeqCst)
    }

    pub fn set_auto_settle(&self, enabled: bool) {
        let previous = self.auto_settle.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!(auto_settle = enabled, "Auto-settle preference changed");
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LEDGER
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn is_committed(&self, match_id: &MatchId) -> bool {
        self.ledger.is_committed(match_id)
    }

    pub fn is_retry_eligible(&self, match_id: &MatchId) -> bool {
        self.retry_eligible
            .lock()
            .expect("retry set lock poisoned")
            .contains(match_id)
    }

    pub(crate) fn mark_retry_eligible(&self, match_id: &MatchId) {
        self.retry_eligible
            .lock()
            .expect("retry set lock poisoned")
            .insert(match_id.clone());
    }

    /// Claim the single retry for `match_id`; false if none is available
    fn take_retry(&self, match_id: &MatchId) -> bool {
        self.retry_eligible
            .lock()
            .expect("retry set lock poisoned")
            .remove(match_id)
    }

    /// Clear both queues, the ledger and the retry set
    pub async fn reset(&self) {
        self.upcoming.lock().await.clear();
        self.waiting.lock().await.clear();
        self.ledger.reset();
        self.retry_eligible
            .lock()
            .expect("retry set lock poisoned")
            .clear();
        self.refresh_pending().await;
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUEUES
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) async fn current_height(&self) -> Result<BlockHeight, SettlementError> {
        self.collaborators
            .wallet
            .current_height()
            .await
            .map_err(|e| SettlementError::Wallet(e.to_string()))
    }

    /// Insert into a queue. Returns false for a duplicate, which is logged
    /// by the queue and otherwise ignored.
    pub(crate) async fn enqueue(
        &self,
        kind: QueueKind,
        obligation: SettlementObligation,
        height: BlockHeight,
    ) -> bool {
        let queue = match kind {
            QueueKind::Upcoming => &self.upcoming,
            QueueKind::Waiting => &self.waiting,
        };
        let result = queue
            .lock()
            .await
            .add(obligation, &self.options.window, height, Utc::now());
        result.is_ok()
    }

    /// Put the obligation in Waiting unless it is already there
    async fn ensure_waiting(&self, obligation: &SettlementObligation, height: BlockHeight) {
        let mut waiting = self.waiting.lock().await;
        if !waiting.contains(&obligation.match_id) {
            // Cannot be a duplicate; checked under the same lock
            let _ = waiting.add(obligation.clone(), &self.options.window, height, Utc::now());
        }
    }

    async fn add_to(
        &self,
        kind: QueueKind,
        obligation: SettlementObligation,
    ) -> Result<bool, SettlementError> {
        let height = self.current_height().await?;
        let match_id = obligation.match_id.clone();
        let added = self.enqueue(kind, obligation, height).await;
        if added {
            let to = match kind {
                QueueKind::Upcoming => SettlementState::Upcoming,
                QueueKind::Waiting => SettlementState::Waiting,
            };
            self.journal(StateTransition::new(match_id, SettlementState::Detected, to, height))
                .await;
            self.refresh_pending().await;
        }
        Ok(added)
    }

    /// Queue an obligation that is still inside its confirmation wait.
    /// Returns false if it was already queued there.
    pub async fn add_upcoming(&self, obligation: SettlementObligation) -> Result<bool, SettlementError> {
        self.add_to(QueueKind::Upcoming, obligation).await
    }

    /// Queue an obligation awaiting payment. Returns false if it was already
    /// queued there.
    pub async fn add_waiting(&self, obligation: SettlementObligation) -> Result<bool, SettlementError> {
        self.add_to(QueueKind::Waiting, obligation).await
    }

    /// Remove the obligation matching a full match id or either leg hash from
    /// whichever queue holds it
    pub async fn remove_by_id(&self, key: &str) -> Option<SettlementObligation> {
        let removed = {
            let from_upcoming = self.upcoming.lock().await.remove_by_id(key);
            match from_upcoming {
                Some(entry) => Some(entry),
                None => self.waiting.lock().await.remove_by_id(key),
            }
        };

        let obligation = removed.map(|entry| entry.obligation)?;
        self.retry_eligible
            .lock()
            .expect("retry set lock poisoned")
            .remove(&obligation.match_id);
        self.refresh_pending().await;
        Some(obligation)
    }

    /// The feed saw the settlement on chain; drop the obligation
    pub async fn settlement_confirmed(&self, key: &str) -> Option<SettlementObligation> {
        let obligation = self.remove_by_id(key).await?;
        info!(match_id = %obligation.match_id, "Settlement confirmed on chain");

        match self.current_height().await {
            Ok(height) => {
                self.journal(StateTransition::new(
                    obligation.match_id.clone(),
                    SettlementState::Waiting,
                    SettlementState::Confirmed,
                    height,
                ))
                .await
            }
            Err(e) => warn!(
                match_id = %obligation.match_id,
                error = %e,
                "Chain height unavailable, confirmation not journaled"
            ),
        }
        Some(obligation)
    }

    pub async fn total_pending_count(&self) -> usize {
        let upcoming = self.upcoming.lock().await.len();
        let waiting = self.waiting.lock().await.len();
        upcoming + waiting
    }

    pub async fn upcoming_snapshot(&self) -> Result<Vec<EntryView>, SettlementError> {
        let height = self.current_height().await?;
        Ok(self.upcoming.lock().await.snapshot(&self.options.window, height))
    }

    pub async fn waiting_snapshot(&self) -> Result<Vec<EntryView>, SettlementError> {
        let height = self.current_height().await?;
        Ok(self.waiting.lock().await.snapshot(&self.options.window, height))
    }

    /// Export queue sizes and tell the wallet whether anything is pending
    pub(crate) async fn refresh_pending(&self) {
        let upcoming = self.upcoming.lock().await.len();
        let waiting = self.waiting.lock().await.len();

        if let Some(metrics) = &self.metrics {
            metrics.set_pending(QueueKind::Upcoming.as_str(), upcoming);
            metrics.set_pending(QueueKind::Waiting.as_str(), waiting);
        }
        self.collaborators
            .wallet
            .flag_pending_obligations(upcoming + waiting > 0)
            .await;
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FEED
    // ═══════════════════════════════════════════════════════════════════════════

    /// Take a live match record from the feed. Returns the queue the derived
    /// obligation was placed in, or `None` if nothing was queued.
    pub async fn ingest_match(
        &self,
        record: &MatchRecord,
    ) -> Result<Option<QueueKind>, SettlementError> {
        if !record.is_pending() {
            debug!(match_id = %record.match_id(), status = ?record.status, "Ignoring non-pending match");
            return Ok(None);
        }

        let addresses = self.wallet_addresses().await?;
        let Some(obligation) = self.factory.derive(record, &addresses) else {
            return Ok(None);
        };
        self.record_derived();

        if self.ledger.is_committed(&obligation.match_id) {
            debug!(match_id = %obligation.match_id, "Ignoring match already committed");
            return Ok(None);
        }

        let height = self.current_height().await?;
        let kind = if self.options.window.blocks_until_active(&obligation, height) > 0 {
            QueueKind::Upcoming
        } else {
            QueueKind::Waiting
        };

        info!(
            match_id = %obligation.match_id,
            queue = kind.as_str(),
            amount = %obligation.amount,
            payee = %obligation.payee_address,
            "New settlement obligation"
        );

        if self.add_to(kind, obligation).await? {
            Ok(Some(kind))
        } else {
            Ok(None)
        }
    }

    pub(crate) async fn wallet_addresses(&self) -> Result<Vec<String>, SettlementError> {
        Ok(self
            .collaborators
            .wallet
            .list_addresses()
            .await
            .map_err(|e| SettlementError::Wallet(e.to_string()))?
            .into_iter()
            .map(|a| a.address)
            .collect())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TICK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Refresh both queues and promote every Upcoming entry whose wait has
    /// elapsed into `process`
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, SettlementError> {
        let height = self.current_height().await?;
        let window = self.options.window;

        let due = {
            let mut upcoming = self.upcoming.lock().await;
            upcoming.tick(now);
            let due = upcoming.take_due(&window, height);
            upcoming.reorder(&window, height);
            due
        };
        {
            let mut waiting = self.waiting.lock().await;
            waiting.tick(now);
            waiting.reorder(&window, height);
        }

        let mut report = TickReport {
            height,
            promoted: due.len(),
            ..Default::default()
        };

        for obligation in due {
            let match_id = obligation.match_id.clone();
            info!(match_id = %match_id, height, "Obligation active");
            self.journal(StateTransition::new(
                match_id.clone(),
                SettlementState::Upcoming,
                SettlementState::Active,
                height,
            ))
            .await;

            match self.process_at(obligation.clone(), height).await {
                Ok(outcome) => report.outcomes.push((match_id, outcome)),
                Err(e @ SettlementError::AlreadyCommitted(_)) => {
                    debug!(match_id = %match_id, error = %e, "Promoted obligation dropped");
                    report.refused += 1;
                }
                Err(e @ SettlementError::ExpiredObligation { .. }) => {
                    // Still pending on chain; visible in Waiting but never paid
                    debug!(match_id = %match_id, error = %e, "Promoted obligation inside expiry margin");
                    if self.enqueue(QueueKind::Waiting, obligation, height).await {
                        self.journal(
                            StateTransition::new(
                                match_id.clone(),
                                SettlementState::Active,
                                SettlementState::Waiting,
                                height,
                            )
                            .with_details("inside expiry margin"),
                        )
                        .await;
                    }
                    report.refused += 1;
                }
                Err(e) => {
                    // Collaborator failure; keep the obligation for a later attempt
                    warn!(match_id = %match_id, error = %e, "Processing failed, moving to waiting");
                    self.enqueue(QueueKind::Waiting, obligation, height).await;
                    report.refused += 1;
                }
            }
        }

        report.upcoming = self.upcoming.lock().await.len();
        report.waiting = self.waiting.lock().await.len();
        self.refresh_pending().await;

        debug!(
            height,
            promoted = report.promoted,
            upcoming = report.upcoming,
            waiting = report.waiting,
            "Settlement tick"
        );
        Ok(report)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PROCESS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Decide what happens to an active obligation: pay now, or queue it in
    /// Waiting for funds or confirmation
    pub async fn process(
        &self,
        obligation: SettlementObligation,
    ) -> Result<ProcessOutcome, SettlementError> {
        let height = self.current_height().await?;
        let outcome = self.process_at(obligation, height).await;
        self.refresh_pending().await;
        outcome
    }

    pub(crate) async fn process_at(
        &self,
        obligation: SettlementObligation,
        height: BlockHeight,
    ) -> Result<ProcessOutcome, SettlementError> {
        let match_id = obligation.match_id.clone();

        if self.ledger.is_committed(&match_id) {
            return Err(self.refuse(SettlementError::AlreadyCommitted(match_id)));
        }
        self.check_expiry(&obligation, height)?;

        if !self.auto_settle() {
            let blocks_until_expiry = self.options.window.blocks_until_expiry(&obligation, height);
            if !self.enqueue(QueueKind::Waiting, obligation.clone(), height).await {
                return Ok(ProcessOutcome::AwaitingConfirmation);
            }
            self.journal(StateTransition::new(
                match_id.clone(),
                SettlementState::Active,
                SettlementState::AwaitingManualConfirm,
                height,
            ))
            .await;
            self.collaborators
                .notifier
                .notify(Notice::ConfirmationRequested {
                    match_id,
                    payer: obligation.payer_address,
                    payee: obligation.payee_address,
                    amount: obligation.amount,
                    blocks_until_expiry,
                })
                .await;
            return Ok(ProcessOutcome::AwaitingConfirmation);
        }

        self.journal(StateTransition::new(
            match_id.clone(),
            SettlementState::Active,
            SettlementState::AutoSettling,
            height,
        ))
        .await;

        let needed = obligation.required_balance(self.options.minimum_reserve) as u128;
        let available = self.payer_balance(&obligation).await?;
        if available < needed {
            info!(
                match_id = %match_id,
                payer = %obligation.payer_address,
                needed,
                available,
                "Insufficient balance for automatic settlement"
            );
            self.enqueue(QueueKind::Waiting, obligation.clone(), height).await;
            self.journal(
                StateTransition::new(
                    match_id.clone(),
                    SettlementState::AutoSettling,
                    SettlementState::Waiting,
                    height,
                )
                .with_details("insufficient balance"),
            )
            .await;
            self.collaborators
                .notifier
                .notify(Notice::SettlementRequired {
                    match_id,
                    payer: obligation.payer_address,
                    needed,
                    available,
                })
                .await;
            return Ok(ProcessOutcome::AwaitingFunds { needed, available });
        }

        self.commit_and_broadcast(&obligation, height, SettlementState::AutoSettling, false)
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MANUAL SETTLEMENT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Pay an obligation from the Waiting queue on the owner's request.
    ///
    /// A committed obligation may only be paid again after a failed
    /// broadcast, and only once per failure.
    pub async fn complete_settlement(&self, key: &str) -> Result<ProcessOutcome, SettlementError> {
        let obligation = {
            let waiting = self.waiting.lock().await;
            waiting.get(key).map(|entry| entry.obligation.clone())
        }
        .ok_or_else(|| self.refuse(SettlementError::NotFound(key.to_string())))?;
        let match_id = obligation.match_id.clone();

        let retry = self.ledger.is_committed(&match_id);
        if retry && !self.is_retry_eligible(&match_id) {
            return Err(self.refuse(SettlementError::AlreadyCommitted(match_id)));
        }

        let height = self.current_height().await?;
        let blocks_remaining = self
            .options
            .window
            .manual_blocks_remaining(&obligation, height);
        if blocks_remaining > 0 {
            return Err(self.refuse(SettlementError::NotYetActive {
                match_id,
                blocks_remaining,
            }));
        }
        self.check_expiry(&obligation, height)?;

        let needed = obligation.required_balance(self.options.minimum_reserve) as u128;
        let available = self.payer_balance(&obligation).await?;
        if available < needed {
            self.collaborators
                .notifier
                .notify(Notice::SettlementRequired {
                    match_id: match_id.clone(),
                    payer: obligation.payer_address.clone(),
                    needed,
                    available,
                })
                .await;
            return Err(self.refuse(SettlementError::InsufficientBalance {
                address: obligation.payer_address,
                needed,
                available,
            }));
        }

        if retry && !self.take_retry(&match_id) {
            // Another retry claimed it between the check and here
            return Err(self.refuse(SettlementError::AlreadyCommitted(match_id)));
        }

        let outcome = self
            .commit_and_broadcast(&obligation, height, SettlementState::Waiting, retry)
            .await;
        self.refresh_pending().await;
        outcome
    }

    /// Alias of [`complete_settlement`](Self::complete_settlement) for the
    /// confirmation prompt
    pub async fn confirm_settlement(&self, key: &str) -> Result<ProcessOutcome, SettlementError> {
        self.complete_settlement(key).await
    }

    /// Leave the obligation in Waiting. Returns whether it was there.
    pub async fn defer_settlement(&self, key: &str) -> bool {
        let found = self.waiting.lock().await.get(key).is_some();
        if found {
            info!(key, "Settlement deferred");
        } else {
            warn!(key, "Cannot defer unknown settlement");
        }
        found
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BROADCAST
    // ═══════════════════════════════════════════════════════════════════════════

    async fn commit_and_broadcast(
        &self,
        obligation: &SettlementObligation,
        height: BlockHeight,
        from: SettlementState,
        retry: bool,
    ) -> Result<ProcessOutcome, SettlementError> {
        let match_id = obligation.match_id.clone();

        if !retry {
            if !self.ledger.mark_committed(&match_id) {
                error!(match_id = %match_id, "Double settlement attempt prevented");
                return Err(self.refuse(SettlementError::AlreadyCommitted(match_id)));
            }
            if let Some(metrics) = &self.metrics {
                metrics.record_commit();
            }
        }

        if let Err(e) = self.store.record_commit(&match_id, height).await {
            error!(match_id = %match_id, error = %e, "Failed to persist settlement commit");
            self.ensure_waiting(obligation, height).await;
            self.mark_retry_eligible(&match_id);
            return Err(SettlementError::Store(e));
        }

        self.journal(StateTransition::new(
            match_id.clone(),
            from,
            SettlementState::Broadcasting,
            height,
        ))
        .await;

        let params = PaymentParams {
            order_match_id: match_id.clone(),
            source: obligation.payer_address.clone(),
            destination: obligation.payee_address.clone(),
            asset: obligation.asset.clone(),
            amount_raw: obligation.amount_raw,
        };

        let span = SettlementSpan::new(match_id.as_str());
        let started = Instant::now();
        let result = self
            .collaborators
            .wallet
            .broadcast_payment(
                &obligation.payer_address,
                PaymentKind::SettlementPayment,
                &params,
            )
            .instrument(span.span())
            .await;
        let elapsed = started.elapsed();

        match result {
            Ok(tx_hash) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_broadcast(elapsed);
                }
                info!(
                    match_id = %match_id,
                    correlation_id = %span.correlation_id,
                    tx_hash = %tx_hash,
                    retry,
                    "Settlement payment broadcast"
                );

                self.waiting.lock().await.remove_by_id(match_id.as_str());
                self.journal(
                    StateTransition::new(
                        match_id.clone(),
                        SettlementState::Broadcasting,
                        SettlementState::Committed,
                        height,
                    )
                    .with_tx_hash(tx_hash.clone()),
                )
                .await;
                self.collaborators
                    .notifier
                    .notify(Notice::Settled {
                        match_id,
                        tx_hash: tx_hash.clone(),
                        payee: obligation.payee_address.clone(),
                        amount: obligation.amount,
                        automatic: from == SettlementState::AutoSettling,
                    })
                    .await;
                Ok(ProcessOutcome::Settled { tx_hash })
            }
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_broadcast_failure(elapsed);
                }
                let reason = e.to_string();
                error!(
                    match_id = %match_id,
                    correlation_id = %span.correlation_id,
                    error = %reason,
                    "Settlement broadcast failed"
                );

                self.ensure_waiting(obligation, height).await;
                self.mark_retry_eligible(&match_id);
                self.journal(
                    StateTransition::new(
                        match_id.clone(),
                        SettlementState::Broadcasting,
                        SettlementState::BroadcastFailed,
                        height,
                    )
                    .with_details(reason.clone()),
                )
                .await;
                self.collaborators
                    .notifier
                    .notify(Notice::BroadcastFailed {
                        match_id,
                        reason: reason.clone(),
                    })
                    .await;
                Ok(ProcessOutcome::BroadcastFailed { reason })
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════════════════

    fn check_expiry(
        &self,
        obligation: &SettlementObligation,
        height: BlockHeight,
    ) -> Result<(), SettlementError> {
        let window = &self.options.window;
        if window.is_past_expiry_gate(obligation, height) {
            return Err(self.refuse(SettlementError::ExpiredObligation {
                match_id: obligation.match_id.clone(),
                blocks_until_expiry: window.blocks_until_expiry(obligation, height),
                margin: window.expire_margin_blocks,
            }));
        }
        Ok(())
    }

    async fn payer_balance(&self, obligation: &SettlementObligation) -> Result<u128, SettlementError> {
        self.collaborators
            .wallet
            .balance(&obligation.payer_address, &obligation.asset, false)
            .await
            .map_err(|e| SettlementError::Wallet(e.to_string()))
    }

    /// Log and count a refusal, handing the error back
    fn refuse(&self, error: SettlementError) -> SettlementError {
        warn!(reason = error.reason(), error = %error, "Settlement refused");
        if let Some(metrics) = &self.metrics {
            metrics.record_refusal(error.reason());
        }
        error
    }

    pub(crate) fn record_derived(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_obligation_derived();
        }
    }

    /// Journal a transition; store failures are logged, not propagated
    pub(crate) async fn journal(&self, transition: StateTransition) {
        debug!(
            match_id = %transition.match_id,
            from = %transition.from,
            to = %transition.to,
            height = transition.height,
            "Settlement transition"
        );
        if let Err(e) = self.store.record_transition(transition).await {
            warn!(error = %e, "Failed to journal settlement transition");
        }
    }

    /// Transition history for one obligation
    pub async fn history(&self, match_id: &MatchId) -> Result<Vec<StateTransition>, SettlementError> {
        Ok(self.store.history(match_id).await?)
    }
}
