//! Submitter feedback for the most recent command.
//!
//! `FeedbackMonitor::observe` decides what to show from the newest command
//! and the current time. `spawn_feedback_monitor` polls the command log and
//! publishes each decision on a watch channel.

use command_store::{now_millis, Command, CommandId, CommandStore};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// A command older than this is hidden unless it is already shown as executed.
pub const STALE_AFTER_MS: i64 = 5_000;

/// An executed command stays visible this long after the acknowledgment was
/// first observed.
pub const AUTO_HIDE_AFTER_MS: i64 = 2_000;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What the submitter sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FeedbackStatus {
    Hidden,
    Pending { id: CommandId },
    Executed { id: CommandId },
}

/// Visibility state for the feedback indicator.
#[derive(Debug, Clone, Default)]
pub struct FeedbackMonitor {
    last_id: Option<CommandId>,
    visible: bool,
    executed_seen_at: Option<i64>,
}

impl FeedbackMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance with the newest command (if any) observed at `now_ms`.
    pub fn observe(&mut self, command: Option<&Command>, now_ms: i64) -> FeedbackStatus {
        let Some(command) = command else {
            return FeedbackStatus::Hidden;
        };

        if self.last_id.as_ref() != Some(&command.id) {
            self.last_id = Some(command.id.clone());
            self.visible = true;
            self.executed_seen_at = None;
        }

        // Once executed is on screen only the auto-hide timer takes it down.
        let showing_executed = self.visible && self.executed_seen_at.is_some();
        if !showing_executed && command.age_ms(now_ms) > STALE_AFTER_MS {
            self.visible = false;
            return FeedbackStatus::Hidden;
        }

        if !self.visible {
            return FeedbackStatus::Hidden;
        }

        if !command.acknowledged {
            return FeedbackStatus::Pending {
                id: command.id.clone(),
            };
        }

        let seen_at = *self.executed_seen_at.get_or_insert(now_ms);
        if now_ms - seen_at >= AUTO_HIDE_AFTER_MS {
            self.visible = false;
            return FeedbackStatus::Hidden;
        }

        FeedbackStatus::Executed {
            id: command.id.clone(),
        }
    }
}

/// Poll `recent(1)` every `poll_interval` and publish the feedback status.
pub fn spawn_feedback_monitor(
    store: CommandStore,
    poll_interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
) -> (watch::Receiver<FeedbackStatus>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(FeedbackStatus::Hidden);

    let task = tokio::spawn(async move {
        let mut monitor = FeedbackMonitor::new();
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Feedback monitor received shutdown signal");
                    break;
                }
                _ = tx.closed() => break,
                _ = ticker.tick() => {
                    let newest = match store.recent(Some(1)).await {
                        Ok(mut commands) => commands.pop(),
                        Err(e) => {
                            warn!(error = %e, "Failed to read recent commands");
                            continue;
                        }
                    };
                    let status = monitor.observe(newest.as_ref(), now_millis());
                    tx.send_if_modified(|current| {
                        if *current == status {
                            return false;
                        }
                        debug!(?status, "Feedback changed");
                        *current = status;
                        true
                    });
                }
            }
        }

        debug!("Feedback monitor task stopped");
    });

    (rx, task)
}
