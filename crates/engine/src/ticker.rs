use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::SettlementEngine;

/// Run `engine.tick` every `period` until `shutdown` turns true or its
/// sender is dropped. Tick failures are logged and the loop carries on.
pub fn spawn_ticker(
    engine: Arc<SettlementEngine>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs_f64(), "Settlement ticker started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match engine.tick(Utc::now()).await {
                        Ok(report) => debug!(
                            height = report.height,
                            promoted = report.promoted,
                            "Tick complete"
                        ),
                        Err(e) => warn!(error = %e, "Settlement tick failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Settlement ticker stopped");
    })
}
