//! Configuration loading traits and types.
//!
//! Every config struct that derives `Deserialize` gets `load(path)` and
//! `from_toml(str)` through the [`ConfigLoader`] blanket impl. The
//! `[shared]` section carries the fields common to all turret binaries.
//!
//! ```rust,no_run
//! use turret_common::config::{ConfigError, ConfigLoader};
//! use turret_common::control_unit::config::TurretConfig;
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = TurretConfig::load(Path::new("config/turret.toml"))?;
//!     println!("{} logs at {:?}", config.shared.service_name, config.shared.log_level);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Failure while reading, parsing or checking a config file.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("config file not found")]
    FileNotFound,

    /// Unreadable file or invalid TOML.
    #[error("config parse error: {0}")]
    ParseError(String),

    /// A value outside its bounds or an inconsistent combination.
    #[error("invalid config: {0}")]
    ValidationError(String),
}

/// Default verbosity from `[shared] log_level`. `--verbose` can only raise it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, per-tick motion traces.
    Trace,
    /// Per-command decode and dispatch.
    Debug,
    /// Lifecycle, mode changes and target events.
    #[default]
    Info,
    /// ESTOP, staleness, range rejections.
    Warn,
    /// Serious problems only.
    Error,
}

impl LogLevel {
    /// Matching `tracing` level.
    pub const fn as_tracing(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

/// `[shared]` section.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "turret-bench-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance identifier, shown in logs and telemetry.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "turret".to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "shared.service_name must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// TOML loading for any deserializable config type.
///
/// A missing file is `FileNotFound`; any other read failure and any TOML
/// error is `ParseError`. Validation is left to the caller.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::FileNotFound);
            }
            Err(e) => return Err(ConfigError::ParseError(format!("{}: {e}", path.display()))),
        };
        tracing::debug!(path = %path.display(), bytes = content.len(), "Parsing config");
        Self::from_toml(&content)
    }

    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
