//! The relay process.
//!
//! Runs the edge relay against the local command log. Commands are
//! delivered into an in-process demo page: one context at the configured
//! demo URL with a frame holding a video and a frame with nothing listening.

use command_store::CommandStore;
use edge_relay::{activate, EdgeRelay, RelayConfig, RelayEvent};
use edge_state_storage::RelayState;
use frame_dispatcher::{ContextId, FrameDispatcher, FrameId, InMemoryHost, MatchPattern};
use playback_executor::{MediaTarget, SimulatedVideo};
use relay_config_and_utils::{Config, Paths};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tracing::{info, warn};

/// Length of the demo video, in seconds.
const DEMO_VIDEO_DURATION: f64 = 600.0;

/// Run until Ctrl+C.
pub async fn run_relay(config: Config, paths: Paths) -> Result<(), Box<dyn std::error::Error>> {
    paths.ensure_dirs()?;

    let pattern: MatchPattern = config.target_site_pattern.parse()?;
    let page_url = config.demo_page_url()?;
    if !pattern.matches_url(&page_url) {
        warn!(
            pattern = %pattern,
            url = %page_url,
            "Demo page does not match the target site pattern, commands will stay pending"
        );
    }

    let store = CommandStore::open(&paths.database_file())
        .await
        .map_err(|e| format!("Failed to open command store: {}", e))?
        .with_live_poll_interval(config.live_poll_interval());

    let host = Arc::new(InMemoryHost::new());
    let context = host.add_context(page_url.as_str());
    let video_frame = host
        .add_frame(context, Some(SimulatedVideo::new(Some(DEMO_VIDEO_DURATION))))
        .ok_or("Failed to create demo frame")?;
    host.add_silent_frame(context);

    let dispatcher = FrameDispatcher::new(host.clone(), pattern);
    let state = Arc::new(RelayState::open(&paths.relay_state_file()));
    let relay = EdgeRelay::new(
        RelayConfig {
            keep_alive_interval_secs: config.keep_alive_interval_secs,
            stale_command_window_secs: config.stale_command_window_secs,
        },
        Arc::new(store),
        Arc::new(dispatcher),
        state,
    );

    info!(
        database = %paths.database_file().display(),
        state = %paths.relay_state_file().display(),
        page = %page_url,
        "Starting playback relay"
    );

    let events = spawn_event_printer(relay.subscribe_events(), host.clone(), context, video_frame);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let keep_alive = activate(&relay, shutdown_rx).await;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    let _ = shutdown_tx.send(());
    let _ = keep_alive.await;
    relay.shutdown().await;
    events.abort();

    info!("Playback relay stopped");
    Ok(())
}

fn spawn_event_printer(
    mut events: broadcast::Receiver<RelayEvent>,
    host: Arc<InMemoryHost>,
    context: ContextId,
    frame: FrameId,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(RelayEvent::Acknowledged(id)) => {
                    if let Some(video) = host.video(context, frame) {
                        println!(
                            "{} executed: {} at {:.1}s, {:.1}x",
                            id,
                            if video.is_paused() { "paused" } else { "playing" },
                            video.current_time(),
                            video.playback_rate()
                        );
                    }
                }
                Ok(RelayEvent::Unreachable(id)) => println!("{} pending: no target page", id),
                Ok(RelayEvent::Stale(id)) => println!("{} skipped: too old", id),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Relay event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
