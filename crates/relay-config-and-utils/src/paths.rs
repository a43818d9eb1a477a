//! File system layout.

use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

const BASE_DIR_NAME: &str = ".playback-relay";

/// Locations of every file the relay processes read or write.
#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Paths rooted at `~/.playback-relay`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;
        Ok(Self::with_base_dir(home.join(BASE_DIR_NAME)))
    }

    /// Paths rooted at a custom directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `<base>/config.json`
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// `<base>/commands.sqlite`, the command log and user table.
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join("commands.sqlite")
    }

    /// `<base>/relay-state.json`, the relay's persisted key-value state.
    pub fn relay_state_file(&self) -> PathBuf {
        self.base_dir.join("relay-state.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// `<base>/logs/relay.jsonl`
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("relay.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths_with_base_dir() {
        let base = PathBuf::from("/tmp/test-playback-relay");
        let paths = Paths::with_base_dir(base.clone());

        assert_eq!(paths.base_dir(), base.as_path());
        assert_eq!(paths.config_file(), base.join("config.json"));
        assert_eq!(paths.database_file(), base.join("commands.sqlite"));
        assert_eq!(paths.relay_state_file(), base.join("relay-state.json"));
        assert_eq!(paths.logs_dir(), base.join("logs"));
        assert_eq!(paths.log_file(), base.join("logs/relay.jsonl"));
    }

    #[test]
    fn test_paths_default_under_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let paths = Paths::new().unwrap();
        assert_eq!(paths.base_dir(), home.join(".playback-relay").as_path());
    }

    #[test]
    fn test_ensure_dirs_creates_directories_idempotently() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("relay");
        let paths = Paths::with_base_dir(base.clone());

        assert!(!base.exists());
        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();

        assert!(base.is_dir());
        assert!(paths.logs_dir().is_dir());
        assert!(paths.log_file().starts_with(paths.logs_dir()));
    }
}
