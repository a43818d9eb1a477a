//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Pages the relay forwards commands to.
pub const DEFAULT_TARGET_SITE_PATTERN: &str = "*://*.pcloud.link/*";

/// Page opened in the in-process demo host by `playback-relay relay`.
pub const DEFAULT_DEMO_PAGE_URL: &str = "https://u.pcloud.link/publink/show?code=demo";

/// Runtime override for `log_level`.
pub const LOG_LEVEL_ENV: &str = "PLAYBACK_RELAY_LOG_LEVEL";

/// Process configuration, stored as `<base>/config.json`.
///
/// Every field has a default, so a partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Match pattern selecting the rendering context commands go to.
    pub target_site_pattern: String,
    /// Page URL for the demo host.
    pub demo_page_url: String,
    pub keep_alive_interval_secs: u64,
    /// Unset or `null` forwards commands regardless of age.
    pub stale_command_window_secs: Option<u64>,
    pub live_poll_interval_ms: u64,
    pub feedback_poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            target_site_pattern: DEFAULT_TARGET_SITE_PATTERN.to_string(),
            demo_page_url: DEFAULT_DEMO_PAGE_URL.to_string(),
            keep_alive_interval_secs: 30,
            stale_command_window_secs: None,
            live_poll_interval_ms: 1000,
            feedback_poll_interval_ms: 500,
        }
    }
}

impl Config {
    /// Load `<base>/config.json`, falling back to defaults when it does not
    /// exist, then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            debug!(path = %config_path.display(), "No config file, using defaults");
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to `<base>/config.json`.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Only `log_level` can be overridden at runtime.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }
    }

    fn validate(&self) -> CoreResult<()> {
        if self.target_site_pattern.trim().is_empty() {
            return Err(CoreError::Config(
                "target_site_pattern must not be empty".to_string(),
            ));
        }
        self.demo_page_url()?;
        Ok(())
    }

    pub fn demo_page_url(&self) -> CoreResult<Url> {
        Url::parse(&self.demo_page_url).map_err(CoreError::from)
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_interval_secs)
    }

    pub fn stale_command_window(&self) -> Option<Duration> {
        self.stale_command_window_secs.map(Duration::from_secs)
    }

    pub fn live_poll_interval(&self) -> Duration {
        Duration::from_millis(self.live_poll_interval_ms.max(1))
    }

    pub fn feedback_poll_interval(&self) -> Duration {
        Duration::from_millis(self.feedback_poll_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.target_site_pattern, "*://*.pcloud.link/*");
        assert_eq!(config.keep_alive_interval(), Duration::from_secs(30));
        assert_eq!(config.stale_command_window(), None);
        assert_eq!(config.live_poll_interval(), Duration::from_millis(1000));
        assert_eq!(config.feedback_poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{ "log_level": "debug", "stale_command_window_secs": 90 }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.stale_command_window(), Some(Duration::from_secs(90)));
        assert_eq!(config.keep_alive_interval_secs, 30);
        assert_eq!(config.target_site_pattern, DEFAULT_TARGET_SITE_PATTERN);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("base"));

        let config = Config {
            keep_alive_interval_secs: 5,
            target_site_pattern: "https://player.example.com/*".to_string(),
            ..Config::default()
        };
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.target_site_pattern, DEFAULT_TARGET_SITE_PATTERN);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        std::fs::write(paths.config_file(), "{ not json").unwrap();

        assert!(matches!(Config::load(&paths), Err(CoreError::Json(_))));
    }

    #[test]
    fn test_log_level_override() {
        let mut config = Config::default();
        config.apply_overrides(|name| (name == LOG_LEVEL_ENV).then(|| " trace ".to_string()));
        assert_eq!(config.log_level, "trace");

        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_validate() {
        let config = Config {
            target_site_pattern: " ".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let config = Config {
            demo_page_url: "not a valid url".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidUrl(_))));

        assert!(Config::default().validate().is_ok());
    }
}
