//! src/config.rs
//! ============================================================================
//! # Config: Dispatch Configuration Loader and Saver
//!
//! User-editable settings for callback dispatch, pick resolution, default
//! keymap handling and logging. Stored as TOML at the cross-platform config
//! path provided by the [`directories`](https://docs.rs/directories) crate.
//!
//! ## Example
//! ```rust,ignore
//! let config = Config::load_or_default()?;
//! let m = Maps::builder().config(config).build();
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CallbackError, CallbackResult};
use crate::logging::LoggerConfig;

/// What a dispatch cycle does when a callback returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerErrorPolicy {
    /// Log the failure and run the remaining callbacks.
    #[default]
    Continue,

    /// Stop the cycle and return the error to the host.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub on_handler_error: HandlerErrorPolicy,

    /// Forwarding hops allowed for one triggering event.
    pub max_forward_depth: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            on_handler_error: HandlerErrorPolicy::Continue,
            max_forward_depth: 8,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickConfig {
    /// Largest distance (data units of the receiving map) at which a
    /// forwarded pick still resolves to a point. Unlimited when unset.
    pub search_radius: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeymapConfig {
    /// Release the host's default key bindings on `init_callbacks`.
    pub release_defaults: bool,
}

impl Default for KeymapConfig {
    fn default() -> Self {
        Self {
            release_defaults: true,
        }
    }
}

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dispatch: DispatchConfig,

    pub pick: PickConfig,

    pub keymap: KeymapConfig,

    pub logging: LoggerConfig,
}

impl Config {
    pub fn load_from_file(path: &Path) -> CallbackResult<Self> {
        info!(path = %path.display(), "loading configuration");
        let text = fs::read_to_string(path).map_err(|e| CallbackError::config_io(path, e))?;
        let cfg: Self = toml::from_str(&text)?;
        Ok(cfg)
    }

    pub fn save_to_file(&self, path: &Path) -> CallbackResult<()> {
        info!(path = %path.display(), "saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CallbackError::config_io(parent, e))?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).map_err(|e| CallbackError::config_io(path, e))?;

        Ok(())
    }

    /// Loads the config at [`Config::config_path`], or returns defaults when
    /// no file exists yet.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Ok(Self::load_from_file(&path)?)
        } else {
            info!(
                "No config file found at {}, using default configuration",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// `config.toml` in the platform config directory for `mapcb`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "mapcb", "mapcb")
            .ok_or_else(|| anyhow::anyhow!("no home directory to place the configuration in"))?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dispatch.max_forward_depth, 8);
        assert_eq!(config.dispatch.on_handler_error, HandlerErrorPolicy::Continue);
        assert!(config.keymap.release_defaults);
        assert_eq!(config.pick.search_radius, None);
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.dispatch.on_handler_error = HandlerErrorPolicy::Abort;
        config.pick.search_radius = Some(2.5);
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[dispatch]\non_handler_error = \"abort\"\n").unwrap();
        assert_eq!(config.dispatch.on_handler_error, HandlerErrorPolicy::Abort);
        assert_eq!(config.dispatch.max_forward_depth, 8);
        assert!(config.keymap.release_defaults);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, CallbackError::ConfigIo { .. }));
    }
}
