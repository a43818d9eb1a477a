//! Configuration, file system layout and logging bootstrap for the
//! playback relay processes.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_DEMO_PAGE_URL, DEFAULT_LOG_LEVEL, DEFAULT_TARGET_SITE_PATTERN,
    LOG_LEVEL_ENV,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
