use std::{
    path::{Component, Path, PathBuf},
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::{Context, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tokio::fs as TokioFs;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::Directive,
    fmt::time::ChronoUtc,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub log_dir: PathBuf,
    pub log_file_prefix: CompactString,
    pub log_level: CompactString,
    pub max_log_files: usize,
    pub rotation: LogRotation,
    /// Write the file log as JSON lines instead of plain text
    pub json: bool,
    /// Colorize the stderr output
    pub ansi: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    Hourly,
    Daily,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: CompactString::const_new("evbus"),
            log_level: CompactString::const_new("info"),
            max_log_files: 10,
            rotation: LogRotation::Daily,
            json: true,
            ansi: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logger already initialized")]
    AlreadyInitialized,

    #[error("Invalid log directory: {0}")]
    InvalidLogDirectory(String),

    #[error("Failed to create log directory: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

static LOGGER_INSTALLED: AtomicBool = AtomicBool::new(false);

// Logger builder
pub struct LoggerBuilder {
    config: LoggerConfig,
}

impl LoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: &str) -> Self {
        self.config.log_level = CompactString::new(level);
        self
    }

    /// Install the global subscriber. Keep the returned guard alive until
    /// exit or buffered file output is lost.
    pub async fn build(self) -> Result<WorkerGuard> {
        validate_config(&self.config)?;

        if LOGGER_INSTALLED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LoggingError::AlreadyInitialized.into());
        }

        let result = self.install().await;
        if result.is_err() {
            LOGGER_INSTALLED.store(false, Ordering::Release);
        }

        result
    }

    async fn install(self) -> Result<WorkerGuard> {
        let config = self.config;
        setup_log_directory(&config.log_dir)
            .await
            .with_context(|| format!("Log directory {}", config.log_dir.display()))?;

        let rotation = match config.rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        };

        let file_appender = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(config.log_file_prefix.as_str())
            .filename_suffix(if config.json { "jsonl" } else { "log" })
            .max_log_files(config.max_log_files)
            .build(&config.log_dir)
            .context("Failed to create file appender")?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let level_str = config.log_level.clone();
        let make_filter = || -> Result<EnvFilter> {
            Ok(EnvFilter::from_default_env().add_directive(
                Directive::from_str(&level_str).context("Invalid log level in config")?,
            ))
        };

        let file_layer = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(non_blocking)
                .with_filter(make_filter()?)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(non_blocking)
                .with_filter(make_filter()?)
                .boxed()
        };

        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_ansi(config.ansi)
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(make_filter()?);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .try_init()
            .context("Failed to install global tracing subscriber")?;

        Ok(guard)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn validate_config(config: &LoggerConfig) -> Result<()> {
    if config.max_log_files == 0 {
        return Err(
            LoggingError::ConfigError("Max log files must be greater than 0".to_string()).into(),
        );
    }

    if config.log_file_prefix.is_empty() {
        return Err(
            LoggingError::ConfigError("Log file prefix must not be empty".to_string()).into(),
        );
    }

    if Directive::from_str(&config.log_level).is_err() {
        return Err(LoggingError::ConfigError(format!(
            "Unrecognized log level: {}",
            config.log_level
        ))
        .into());
    }

    validate_log_directory(&config.log_dir)?;
    Ok(())
}

fn validate_log_directory(path: &Path) -> Result<(), LoggingError> {
    let mut components = path.components().peekable();
    if components.peek().is_none() {
        return Err(LoggingError::InvalidLogDirectory("Empty path".to_string()));
    }

    if components.any(|c| c == Component::ParentDir) {
        return Err(LoggingError::InvalidLogDirectory(format!(
            "{} escapes the working directory",
            path.display()
        )));
    }

    Ok(())
}

/// Create `log_dir` (and parents) if it does not exist yet
async fn setup_log_directory(log_dir: &Path) -> Result<(), LoggingError> {
    if TokioFs::try_exists(log_dir).await? {
        return Ok(());
    }

    TokioFs::create_dir_all(log_dir).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&LoggerConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = LoggerConfig {
            max_log_files: 0,
            ..LoggerConfig::default()
        };
        assert!(validate_config(&config).is_err());

        let config = LoggerConfig {
            log_dir: PathBuf::from("../outside"),
            ..LoggerConfig::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoggingError>(),
            Some(LoggingError::InvalidLogDirectory(_))
        ));

        let config = LoggerConfig {
            log_dir: PathBuf::new(),
            ..LoggerConfig::default()
        };
        assert!(validate_config(&config).is_err());

        let config = LoggerConfig {
            log_level: CompactString::const_new("evbus_core=loud"),
            ..LoggerConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_setup_log_directory_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        setup_log_directory(&nested).await.unwrap();
        assert!(nested.is_dir());

        // Existing directory is left alone
        setup_log_directory(&nested).await.unwrap();
    }

    #[tokio::test]
    async fn test_setup_log_directory_reports_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let err = setup_log_directory(&blocker.join("logs")).await.unwrap_err();
        assert!(matches!(err, LoggingError::DirectoryCreationFailed(_)));
    }

    #[test]
    fn test_config_toml_shape() {
        let config: LoggerConfig = toml::from_str(
            r#"
            log_level = "debug"
            rotation = "never"
            json = false
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.rotation, LogRotation::Never);
        assert!(!config.json);
        assert_eq!(config.max_log_files, 10);
    }
}
