//! Logging initialization.
//!
//! Every process writes structured JSONL to `<base>/logs/relay.jsonl`
//! through the observability package. `RUST_LOG` overrides `level`.

use crate::{CoreResult, Paths};

/// Install the global subscriber for `service_name`.
///
/// ```ignore
/// init_logging("relay", "info", &paths, true)?;
/// tracing::info!("Relay started");
/// ```
pub fn init_logging(
    service_name: &str,
    level: &str,
    paths: &Paths,
    also_stderr: bool,
) -> CoreResult<()> {
    paths.ensure_dirs()?;
    observability::init_with_config(observability::LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr,
    })?;
    Ok(())
}
