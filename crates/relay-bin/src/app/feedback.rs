//! Printing the submitter feedback indicator.

use super::open_store;
use command_store::{CommandId, CommandStore};
use feedback_monitor::{spawn_feedback_monitor, FeedbackStatus};
use relay_config_and_utils::{Config, Paths};
use std::time::Duration;
use tokio::sync::oneshot;

fn render(status: &FeedbackStatus) -> String {
    match status {
        FeedbackStatus::Hidden => "(hidden)".to_string(),
        FeedbackStatus::Pending { id } => format!("{} pending", id),
        FeedbackStatus::Executed { id } => format!("{} executed", id),
    }
}

/// Print every indicator change until Ctrl+C.
pub async fn watch_feedback(
    config: &Config,
    paths: &Paths,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(paths).await?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let (mut status, task) =
        spawn_feedback_monitor(store, config.feedback_poll_interval(), shutdown_rx);

    println!("{}", render(&status.borrow_and_update()));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", render(&status.borrow_and_update()));
            }
        }
    }

    let _ = shutdown_tx.send(());
    let _ = task.await;
    Ok(())
}

/// Print the indicator for `id` until it is executed, hidden, or
/// superseded by a newer command.
pub(super) async fn follow_command(
    store: CommandStore,
    poll_interval: Duration,
    id: &CommandId,
) -> Result<(), Box<dyn std::error::Error>> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let (mut status, task) = spawn_feedback_monitor(store, poll_interval, shutdown_rx);

    while status.changed().await.is_ok() {
        let current = status.borrow_and_update().clone();
        println!("{}", render(&current));
        match current {
            FeedbackStatus::Pending { id: ref shown } if shown == id => continue,
            _ => break,
        }
    }

    let _ = shutdown_tx.send(());
    let _ = task.await;
    Ok(())
}
