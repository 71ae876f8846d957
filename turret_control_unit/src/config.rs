//! TOML configuration loader with validation.
//!
//! Loads a `TurretConfig` from a single file and runs every section's
//! bounds check plus the cross-section constraints (scan patterns inside
//! axis ranges).

use std::path::Path;

use tracing::info;
use turret_common::config::{ConfigError, ConfigLoader};
use turret_common::control_unit::config::TurretConfig;

/// Load and validate the control unit configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TurretConfig, ConfigError> {
    let config = TurretConfig::load(path)?;
    config.validate()?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Load and validate the configuration from a TOML string.
pub fn load_config_from_str(content: &str) -> Result<TurretConfig, ConfigError> {
    let config = TurretConfig::from_toml(content)?;
    config.validate()?;
    Ok(config)
}

/// Load from `path` when given, built-in defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> Result<TurretConfig, ConfigError> {
    match path {
        Some(p) => load_config(p),
        None => {
            let config = TurretConfig::default();
            config.validate()?;
            info!("No config file given, using built-in defaults");
            Ok(config)
        }
    }
}
