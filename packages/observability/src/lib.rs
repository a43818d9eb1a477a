//! # Observability
//!
//! Logging bootstrap for playback relay processes.
//!
//! Processes call `init_with_config` once at startup and then use plain
//! `tracing` macros. Every event is appended as one JSON object per line to
//! a shared file (by default `~/.playback-relay/logs/relay.jsonl`), so the
//! relay, the CLI and the feedback monitor all land in one stream:
//!
//! ```text
//! tail -f ~/.playback-relay/logs/relay.jsonl | jq
//! ```
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "relay".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! })?;
//! tracing::info!("relay started");
//! ```

mod file_sink;
mod json_layer;

pub use file_sink::{default_log_path, CentralLogWriter};
pub use json_layer::{JsonLayer, LogEntry};

use std::io;
use std::path::PathBuf;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the process (e.g. "relay", "cli"), written on every line.
    pub service_name: String,

    /// Default filter (e.g. "debug", "info,command_store=debug").
    /// `RUST_LOG` takes precedence when set.
    pub default_level: String,

    /// Log file. Defaults to `default_log_path()`.
    pub log_path: Option<PathBuf>,

    /// Also print compact human-readable lines to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize logging with default settings for `service_name`.
pub fn init(service_name: &str) -> io::Result<()> {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    })
}

/// Install the global subscriber.
///
/// Fails if the log file cannot be opened or a global subscriber is already
/// installed.
pub fn init_with_config(config: LogConfig) -> io::Result<()> {
    file_sink::init_subscriber(&config)
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, trace, warn, Level};
