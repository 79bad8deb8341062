//! Client configuration.
//!
//! Read from `<data_dir>/config.json` when present; every field has a default
//! so a partial (or missing) file is fine.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AppResult;

/// File name looked up inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Largest profile picture accepted for upload: 2 MB
pub const MAX_PROFILE_PICTURE_SIZE: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// How long the splash screen stays up before the first resolution
    pub splash_delay_ms: u64,
    /// Upper bound on a single role read
    pub resolve_timeout_ms: u64,
    pub max_profile_picture_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            splash_delay_ms: 2_000,
            resolve_timeout_ms: 10_000,
            max_profile_picture_bytes: MAX_PROFILE_PICTURE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn splash_delay(&self) -> Duration {
        Duration::from_millis(self.splash_delay_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    /// Load `config.json` from `data_dir`, falling back to defaults.
    pub fn load_or_default(data_dir: impl AsRef<Path>) -> AppResult<Self> {
        let path = data_dir.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            debug!(?path, "No config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        let config: ClientConfig = serde_json::from_str(&raw)?;
        info!(?path, ?config, "Loaded config");
        Ok(config)
    }

    pub fn save(&self, data_dir: impl AsRef<Path>) -> AppResult<()> {
        let dir = data_dir.as_ref();
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(CONFIG_FILE), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
