//! Tracing subscriber setup for applications embedding map callbacks.
//!
//! The library only emits `tracing` events; hosts call [`init_logging`] (or
//! drive a [`LoggerBuilder`]) once at startup to see them.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::Config;

/// `[logging]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default filter directive, e.g. `"info"` or `"mapcb_core=debug"`.
    /// `RUST_LOG` directives are applied on top.
    pub level: CompactString,
    /// JSON lines are written here when set; console only otherwise.
    pub directory: Option<PathBuf>,
    pub file_prefix: CompactString,
    pub rotation: LogRotation,
    pub max_files: usize,
    pub ansi: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: CompactString::const_new("info"),
            directory: None,
            file_prefix: CompactString::const_new("mapcb"),
            rotation: LogRotation::Daily,
            max_files: 10,
            ansi: true,
        }
    }
}

impl LoggerConfig {
    fn validate(&self) -> Result<(), LoggingError> {
        if self.level.trim().is_empty() {
            return Err(LoggingError::InvalidSetting("level is empty"));
        }
        if self.file_prefix.is_empty() {
            return Err(LoggingError::InvalidSetting("file_prefix is empty"));
        }
        if self.max_files == 0 {
            return Err(LoggingError::InvalidSetting("max_files must be at least 1"));
        }
        match &self.directory {
            Some(dir) => check_directory(dir),
            None => Ok(()),
        }
    }

    fn directive(&self) -> Result<Directive> {
        self.level
            .parse()
            .with_context(|| format!("invalid log level `{}`", self.level))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    Hourly,
    #[default]
    Daily,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Never => Self::NEVER,
            LogRotation::Hourly => Self::HOURLY,
            LogRotation::Daily => Self::DAILY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,

    #[error("log directory {path} rejected: {reason}")]
    InvalidDirectory { path: PathBuf, reason: &'static str },

    #[error("cannot create log directory {path}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid logging setting: {0}")]
    InvalidSetting(&'static str),
}

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Builds and installs the global subscriber: a console layer plus an
/// optional rolling JSON file layer.
#[derive(Debug, Default)]
pub struct LoggerBuilder {
    config: LoggerConfig,
}

impl LoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_level<L: Into<CompactString>>(mut self, level: L) -> Self {
        self.config.level = level.into();
        self
    }

    #[must_use]
    pub fn with_directory<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.directory = Some(dir.into());
        self
    }

    /// Install the subscriber. Keep the returned guard alive for as long as
    /// file output is wanted; dropping it flushes the writer.
    pub fn build(self) -> Result<Option<WorkerGuard>> {
        self.config.validate()?;

        if INSTALLED.swap(true, Ordering::AcqRel) {
            return Err(LoggingError::AlreadyInstalled.into());
        }
        let installed = self.install();
        if installed.is_err() {
            INSTALLED.store(false, Ordering::Release);
        }
        installed
    }

    fn install(self) -> Result<Option<WorkerGuard>> {
        let config = &self.config;
        let filter = || -> Result<EnvFilter> {
            Ok(EnvFilter::from_default_env().add_directive(config.directive()?))
        };

        let mut guard = None;
        let file_layer = match &config.directory {
            Some(dir) => {
                if !dir.exists() {
                    std::fs::create_dir_all(dir).map_err(|source| {
                        LoggingError::CreateDirectory {
                            path: dir.clone(),
                            source,
                        }
                    })?;
                }
                let appender = RollingFileAppender::builder()
                    .rotation(config.rotation.into())
                    .filename_prefix(config.file_prefix.as_str())
                    .filename_suffix("jsonl")
                    .max_log_files(config.max_files)
                    .build(dir)
                    .with_context(|| format!("rolling appender in {}", dir.display()))?;

                let (writer, worker) = tracing_appender::non_blocking(appender);
                guard = Some(worker);
                Some(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(false)
                        .with_writer(writer)
                        .with_filter(filter()?),
                )
            }
            None => None,
        };

        let console_layer = tracing_subscriber::fmt::layer()
            .with_ansi(config.ansi)
            .with_filter(filter()?);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer)
            .try_init()
            .context("installing the tracing subscriber")?;

        Ok(guard)
    }
}

fn check_directory(path: &Path) -> Result<(), LoggingError> {
    let reason = if path.as_os_str().is_empty() {
        Some("empty path")
    } else if path.components().any(|c| c == Component::ParentDir) {
        Some("contains `..`")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(LoggingError::InvalidDirectory {
            path: path.to_path_buf(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Install logging from the `[logging]` section of `config`.
pub fn init_logging(config: &Config) -> Result<Option<WorkerGuard>> {
    LoggerBuilder::new().with_config(config.logging.clone()).build()
}
