//! Edge relay for playback commands.
//!
//! This crate provides:
//! - `EdgeRelay`: subscribes to the latest unacknowledged command, dedups
//!   against persisted state and forwards to the rendering side
//! - Keep-alive that restarts an idle relay on a fixed period
//! - `CommandSource` / `CommandForwarder` seams, implemented for the command
//!   store and the frame dispatcher

mod config;
mod error;
mod keep_alive;
mod relay;
mod source;

#[cfg(test)]
mod tests;

pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use keep_alive::{activate, spawn_keep_alive};
pub use relay::{EdgeRelay, RelayEvent, RelayStatus};
pub use source::{CommandForwarder, CommandSource};
