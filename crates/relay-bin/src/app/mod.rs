//! Subcommand implementations.

mod feedback;
mod operator;
mod relay;

pub use feedback::watch_feedback;
pub use operator::{ack, identity, print_state, recent, set_role, submit};
pub use relay::run_relay;

use command_store::CommandStore;
use relay_config_and_utils::Paths;

/// Open the command log under `paths`.
async fn open_store(paths: &Paths) -> Result<CommandStore, Box<dyn std::error::Error>> {
    let store = CommandStore::open(&paths.database_file())
        .await
        .map_err(|e| format!("Failed to open command store: {}", e))?;
    Ok(store)
}
