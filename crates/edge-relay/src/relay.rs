//! The relay state machine.
//!
//! `Idle` until `start()` opens a subscription, `Subscribed` until the
//! subscription stream ends or `shutdown()` is called. Each delivered command
//! goes through dedup, then its id is persisted, then it is forwarded and
//! acknowledged before the next value is looked at. The persisted id is what
//! makes the relay safe to kill and restart at any point.

use crate::{CommandForwarder, CommandSource, RelayConfig, RelayResult};
use command_store::{now_millis, Command, CommandId, LiveSubscription};
use edge_state_storage::RelayState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Whether the relay currently holds a live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStatus {
    Idle,
    Subscribed,
}

/// Events emitted by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A fresh subscription is open.
    Subscribed,
    /// The subscription ended or was shut down.
    Idle,
    /// Same id as the last delivered command; discarded.
    Duplicate(CommandId),
    /// Older than the stale window; acknowledged without forwarding.
    Stale(CommandId),
    /// Handed to the forwarder.
    Forwarded(CommandId),
    /// A target context was reached and the command acknowledged.
    Acknowledged(CommandId),
    /// No target context was reached; the command stays unacknowledged.
    Unreachable(CommandId),
}

struct Session {
    generation: u64,
    task: JoinHandle<()>,
}

impl Session {
    /// Cancel the delivery task and wait until it, and with it the
    /// subscription, is gone.
    async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

struct RelayInner {
    config: RelayConfig,
    source: Arc<dyn CommandSource>,
    forwarder: Arc<dyn CommandForwarder>,
    state: Arc<RelayState>,
    session: Mutex<Option<Session>>,
    next_generation: AtomicU64,
    event_tx: broadcast::Sender<RelayEvent>,
}

/// Relay from the live command view to the rendering side.
#[derive(Clone)]
pub struct EdgeRelay {
    inner: Arc<RelayInner>,
}

impl EdgeRelay {
    pub fn new(
        config: RelayConfig,
        source: Arc<dyn CommandSource>,
        forwarder: Arc<dyn CommandForwarder>,
        state: Arc<RelayState>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            inner: Arc::new(RelayInner {
                config,
                source,
                forwarder,
                state,
                session: Mutex::new(None),
                next_generation: AtomicU64::new(0),
                event_tx,
            }),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    pub fn state(&self) -> &Arc<RelayState> {
        &self.inner.state
    }

    /// Subscribe to relay events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<RelayEvent> {
        self.inner.event_tx.subscribe()
    }

    pub async fn status(&self) -> RelayStatus {
        match &*self.inner.session.lock().await {
            Some(session) if !session.task.is_finished() => RelayStatus::Subscribed,
            _ => RelayStatus::Idle,
        }
    }

    /// Open a fresh subscription, dropping the current one first.
    ///
    /// Safe to call in any state. On error the relay is left `Idle`.
    pub async fn start(&self) -> RelayResult<()> {
        let mut session = self.inner.session.lock().await;
        if let Some(previous) = session.take() {
            debug!(generation = previous.generation, "Unsubscribing before resubscribe");
            previous.stop().await;
        }

        let subscription = match self.inner.source.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.inner.set_connected(false);
                return Err(e);
            }
        };

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let task = tokio::spawn(run_delivery(self.inner.clone(), subscription, generation));
        *session = Some(Session { generation, task });

        self.inner.set_connected(true);
        self.inner.emit(RelayEvent::Subscribed);
        info!(generation, "Relay subscribed");
        Ok(())
    }

    /// Drop the subscription and go `Idle`. Forwards already in flight finish.
    pub async fn shutdown(&self) {
        let mut session = self.inner.session.lock().await;
        if let Some(previous) = session.take() {
            previous.stop().await;
            self.inner.set_connected(false);
            self.inner.emit(RelayEvent::Idle);
            info!("Relay stopped");
        }
    }
}

async fn run_delivery(inner: Arc<RelayInner>, mut subscription: LiveSubscription, generation: u64) {
    while let Some(latest) = subscription.recv().await {
        let Some(command) = latest else {
            debug!("No unacknowledged command");
            continue;
        };
        let id = command.id.clone();
        if let Err(e) = inner.deliver(command).await {
            warn!(command_id = %id, error = %e, "Failed to handle delivered command");
        }
    }

    let mut session = inner.session.lock().await;
    if session.as_ref().is_some_and(|s| s.generation == generation) {
        *session = None;
        inner.set_connected(false);
        inner.emit(RelayEvent::Idle);
        info!(generation, "Subscription ended, relay idle");
    }
}

impl RelayInner {
    fn emit(&self, event: RelayEvent) {
        let _ = self.event_tx.send(event);
    }

    fn set_connected(&self, connected: bool) {
        if let Err(e) = self.state.set_connected(connected) {
            warn!(connected, error = %e, "Failed to persist connection flag");
        }
    }

    async fn deliver(self: &Arc<Self>, command: Command) -> RelayResult<()> {
        let last = self.state.last_delivered_command_id()?;
        if last.as_deref() == Some(command.id.as_str()) {
            debug!(command_id = %command.id, "Duplicate delivery discarded");
            self.emit(RelayEvent::Duplicate(command.id));
            return Ok(());
        }

        self.state
            .set_last_delivered_command_id(Some(command.id.as_str()))?;

        if let Some(window) = self.config.stale_command_window() {
            let age_ms = command.age_ms(now_millis());
            if age_ms > window.as_millis() as i64 {
                info!(command_id = %command.id, age_ms, "Stale command acknowledged without forwarding");
                self.source.acknowledge(&command.id).await?;
                self.emit(RelayEvent::Stale(command.id));
                return Ok(());
            }
        }

        info!(
            command_id = %command.id,
            command_type = %command.command_type,
            "Forwarding command"
        );
        self.emit(RelayEvent::Forwarded(command.id.clone()));

        // The next value is not taken until this one is acknowledged, so an
        // older command resurfacing in the view cannot overtake it. The
        // forward runs in its own task so a resubscribe does not cut it off
        // between dispatch and acknowledgment.
        let inner = self.clone();
        let id = command.id.clone();
        if let Err(e) = tokio::spawn(async move { inner.forward(command).await }).await {
            warn!(command_id = %id, error = %e, "Forward task failed");
        }
        Ok(())
    }

    async fn forward(&self, command: Command) {
        let report = self.forwarder.forward(command.to_frame_request()).await;
        if !report.reached() {
            warn!(command_id = %command.id, "No target reached, command left unacknowledged");
            self.emit(RelayEvent::Unreachable(command.id));
            return;
        }

        match self.source.acknowledge(&command.id).await {
            Ok(_) => self.emit(RelayEvent::Acknowledged(command.id)),
            Err(e) => warn!(command_id = %command.id, error = %e, "Failed to acknowledge command"),
        }
    }
}
