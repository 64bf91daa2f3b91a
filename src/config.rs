//! Bridge configuration parameters
//!
//! All tunable parameters for both halves of the bridge. The host binary
//! loads them from a JSON file; missing fields take their defaults.

use std::path::Path;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::protocol::pending::MAX_IN_FLIGHT;

/// Core bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    // --- Medium ---
    /// Medium size in 512-byte blocks (8192 = 4 MiB card)
    pub block_count: u32,

    // --- Client ---
    /// How long a caller waits for its result (milliseconds)
    pub response_timeout_ms: u32,
    /// Maximum block addresses in flight at once (1..=8)
    pub max_in_flight: u8,

    // --- Debug ---
    /// Hex-dump every block crossing the bridge at trace level
    pub trace_blocks: bool,
    /// Console log level: off, error, warn, info, debug, trace
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            // Medium
            block_count: 8192,

            // Client
            response_timeout_ms: 5000,
            max_in_flight: MAX_IN_FLIGHT as u8,

            // Debug
            trace_blocks: false,
            log_level: "info".into(),
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|_| ConfigError::Io)?;
        Self::from_json(&text)
    }

    /// Reject values the bridge cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_count == 0 {
            return Err(ConfigError::ValidationFailed("block_count must be > 0"));
        }
        if self.response_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "response_timeout_ms must be > 0",
            ));
        }
        if self.max_in_flight == 0 || usize::from(self.max_in_flight) > MAX_IN_FLIGHT {
            return Err(ConfigError::ValidationFailed(
                "max_in_flight must be within 1..=8",
            ));
        }
        if self.level_filter().is_none() {
            return Err(ConfigError::ValidationFailed("log_level is not a known level"));
        }
        Ok(())
    }

    pub fn response_timeout(&self) -> core::time::Duration {
        core::time::Duration::from_millis(u64::from(self.response_timeout_ms))
    }

    /// `log_level` as a filter, if recognised.
    pub fn level_filter(&self) -> Option<LevelFilter> {
        self.log_level.parse().ok()
    }
}
