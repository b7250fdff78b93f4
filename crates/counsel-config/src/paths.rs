//! File system paths for the client.

use crate::{ConfigError, ConfigResult};
use std::path::PathBuf;

const BASE_DIR_NAME: &str = ".counsel";
const LOG_FILE_NAME: &str = "client.jsonl";

/// Resolves where the client keeps its configuration and logs.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory (~/.counsel)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.counsel`.
    pub fn new() -> ConfigResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| ConfigError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.counsel).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.counsel/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the saved session cookies path (~/.counsel/cookies.json).
    pub fn cookies_file(&self) -> PathBuf {
        self.base_dir.join("cookies.json")
    }

    /// Get the logs directory (~/.counsel/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file path (~/.counsel/logs/client.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join(LOG_FILE_NAME)
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> ConfigResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
