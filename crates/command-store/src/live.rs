//! Live query over the latest unacknowledged command.
//!
//! # Delivery contract
//!
//! - On subscribe the current value (possibly `None`) is delivered at once.
//! - Afterwards a value is delivered whenever the query result differs from
//!   the last value delivered on this subscription. The query re-evaluates
//!   after every committed write through the store and on a poll tick.
//! - Delivery is at-least-once per logical change. Every new subscription
//!   re-delivers the current value, so a consumer that resubscribes sees
//!   commands it has already handled. Consumers must deduplicate.

use crate::{Command, CommandStore};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// One delivered value of the live query.
pub type LatestUnacknowledged = Option<Command>;

const SUBSCRIPTION_BUFFER: usize = 16;

/// A cancellable stream of live query results.
pub struct LiveSubscription {
    receiver: mpsc::Receiver<LatestUnacknowledged>,
    task: Option<JoinHandle<()>>,
}

impl LiveSubscription {
    /// Wrap a receiver fed by some other transport.
    pub fn from_receiver(receiver: mpsc::Receiver<LatestUnacknowledged>) -> Self {
        Self {
            receiver,
            task: None,
        }
    }

    fn with_task(receiver: mpsc::Receiver<LatestUnacknowledged>, task: JoinHandle<()>) -> Self {
        Self {
            receiver,
            task: Some(task),
        }
    }

    /// Wait for the next delivered value.
    ///
    /// Returns `None` once the subscription is closed, either by
    /// `unsubscribe()` or because the producer went away.
    pub async fn recv(&mut self) -> Option<LatestUnacknowledged> {
        self.receiver.recv().await
    }

    /// Take a delivered value without waiting.
    pub fn try_recv(&mut self) -> Option<LatestUnacknowledged> {
        self.receiver.try_recv().ok()
    }

    /// Stop delivery. Takes effect before this call returns.
    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.receiver.close();
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl CommandStore {
    /// Subscribe to the latest unacknowledged command.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe_latest_unacknowledged(&self) -> LiveSubscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let store = self.clone();
        let changes = self.watch_changes();
        let task = tokio::spawn(run_latest_unacknowledged(store, changes, tx));
        LiveSubscription::with_task(rx, task)
    }
}

async fn run_latest_unacknowledged(
    store: CommandStore,
    mut changes: watch::Receiver<u64>,
    tx: mpsc::Sender<LatestUnacknowledged>,
) {
    let mut poll = interval(store.live_poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    poll.reset();

    let mut last_sent: Option<LatestUnacknowledged> = None;

    loop {
        let _ = changes.borrow_and_update();

        match store.latest_unacknowledged().await {
            Ok(current) => {
                if last_sent.as_ref() != Some(&current) {
                    if tx.send(current.clone()).await.is_err() {
                        break;
                    }
                    last_sent = Some(current);
                }
            }
            Err(e) => {
                warn!(error = %e, "Live query evaluation failed");
            }
        }

        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = poll.tick() => {}
            _ = tx.closed() => break,
        }
    }

    debug!("Live query stopped");
}
