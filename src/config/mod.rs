//! Configuration for the peripheral manager
//!
//! Provides a serde-deserializable configuration with sane defaults,
//! file loading, and runtime validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Conservative notification payload ceiling used when no target centrals
/// are addressed and no MTU has been negotiated.
pub const DEFAULT_MAX_PAYLOAD: usize = 512;

/// Minimum ATT payload any BLE link must accept.
pub const MIN_MTU: usize = 23;

/// Peripheral manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeripheralConfig {
    /// Number of accepted values retained per characteristic,
    /// most-recent-first.
    pub history_limit: usize,

    /// Payload ceiling applied when an update addresses no specific
    /// centrals.
    pub default_max_payload: usize,

    /// How long a reported error stays in the error slot before it
    /// auto-clears.
    #[serde(with = "humantime_serde")]
    pub error_clear_delay: Duration,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            history_limit: 16,
            default_max_payload: DEFAULT_MAX_PAYLOAD,
            error_clear_delay: Duration::from_secs(2),
        }
    }
}

impl PeripheralConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("failed to read config file: {}", e)))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(Error::Config(
                "history_limit must be at least 1".to_string(),
            ));
        }
        if self.default_max_payload < MIN_MTU {
            return Err(Error::Config(format!(
                "default_max_payload must be at least {} bytes",
                MIN_MTU
            )));
        }
        Ok(())
    }
}
