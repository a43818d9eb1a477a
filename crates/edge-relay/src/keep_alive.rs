//! Keep-alive for the relay subscription.

use crate::{EdgeRelay, RelayStatus};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Start the relay and spawn its keep-alive.
pub async fn activate(relay: &EdgeRelay, shutdown: oneshot::Receiver<()>) -> JoinHandle<()> {
    if let Err(e) = relay.start().await {
        warn!(error = %e, "Initial relay start failed, keep-alive will retry");
    }
    spawn_keep_alive(relay.clone(), shutdown)
}

/// Restart the relay whenever it is found idle. Fixed period, no backoff.
pub fn spawn_keep_alive(relay: EdgeRelay, mut shutdown: oneshot::Receiver<()>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interval = relay.config().keep_alive_interval();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Relay keep-alive received shutdown signal");
                    break;
                }
                _ = sleep(interval) => {
                    if relay.status().await == RelayStatus::Subscribed {
                        continue;
                    }
                    info!("Relay idle, restarting subscription");
                    if let Err(e) = relay.start().await {
                        warn!(error = %e, "Relay restart failed");
                    }
                }
            }
        }

        debug!("Relay keep-alive task stopped");
    })
}
