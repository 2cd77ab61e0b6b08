//! src/config.rs
//! ============================================================================
//! # Config: Application Configuration Loader and Saver
//!
//! Loads and saves the demo's settings as TOML from the platform config path
//! resolved by the [`directories`](https://docs.rs/directories) crate.
//!
//! ## Example
//! ```rust,ignore
//! let config = Config::load().await?;
//! config.save_to(Path::new("evbus.toml")).await?;
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use tokio::fs as TokioFs;

use crate::logging::LoggerConfig;

/// Settings for the demo scene run by the `evbus` binary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Payload id carried by the `Test1` event
    pub param_id: i32,

    /// Integer carried by the `Test2` event
    pub value: i32,

    /// Emitter objects the installer activates, in order
    pub emitters: usize,

    /// Pause before exit so the non-blocking log writer drains
    #[serde(with = "humantime_serde")]
    pub flush_delay: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            param_id: 88,
            value: 666,
            emitters: 1,
            flush_delay: Duration::from_millis(50),
        }
    }
}

/// Main configuration struct for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggerConfig,

    #[serde(default)]
    pub demo: DemoConfig,
}

impl Config {
    /// Loads config from the platform config dir, or returns (and writes) defaults.
    ///
    /// The config is expected at `$XDG_CONFIG_HOME/evbus/config.toml`
    /// (Linux), or equivalent on Windows/macOS.
    pub async fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            info!(
                "No config file found at {}, using default configuration. Creating it now.",
                path.display()
            );

            let default_config = Self::default();
            default_config.save_to(&path).await?;

            Ok(default_config)
        }
    }

    /// Loads config from an explicit TOML file.
    pub async fn load_from(path: &Path) -> anyhow::Result<Self> {
        info!("Loading config from {}", path.display());

        let text = TokioFs::read_to_string(path).await?;
        let cfg: Self = toml::from_str(&text)?;

        Ok(cfg)
    }

    /// Saves config to an explicit path, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(path, toml_str).await?;

        Ok(())
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "evbus", "evbus")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory."))?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }
}
