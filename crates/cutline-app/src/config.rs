//! Application configuration.
//!
//! Read from `$CUTLINE_CONFIG` if set, else `<config dir>/cutline/config.toml`.
//! A missing file yields the defaults.

use anyhow::{Context, Result};
use cutline_export::HdrMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CUTLINE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// How often export progress is polled.
    pub poll_interval_ms: u64,
    /// Explicit ffmpeg binary; otherwise the sidecar/PATH lookup is used.
    pub ffmpeg_path: Option<PathBuf>,
    pub default_hdr_mode: HdrMode,
    /// Where sessions are saved when no destination is given.
    pub project_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            poll_interval_ms: 250,
            ffmpeg_path: None,
            default_hdr_mode: HdrMode::KeepHdr,
            project_dir: None,
        }
    }
}

impl AppConfig {
    /// Load from the default location.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from a specific file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("cutline").join("config.toml"))
}
