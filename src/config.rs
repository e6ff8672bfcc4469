//! Loading and validating the TOML configuration.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tokio::time::Duration;

use crate::device_profile::{DeviceProfile, Timings};
use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub session: SessionConfig,
    pub monitor: MonitorConfig,
}

/// Which BMS to connect to
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    pub address: String,
    pub discovery_timeout_ms: u64,
}

/// Keep-alive cadence
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub settle_ms: u64,
    pub heartbeat_gap_ms: u64,
    pub request_gap_ms: u64,
}

/// How the binary presents what it receives
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub status_buffer: usize,
    pub summary_interval_s: u64,
    pub clear_screen: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: DeviceProfile::DEFAULT_ADDRESS.to_string(),
            discovery_timeout_ms: 10_000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_ms: 1000,
            heartbeat_gap_ms: 500,
            request_gap_ms: 1000,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            status_buffer: 50,
            summary_interval_s: 30,
            clear_screen: true,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// Missing sections and keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, does not parse, or fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.device.address.trim().is_empty() {
            return Err(ConfigError::Invalid("device address cannot be empty".to_string()));
        }

        let durations = [
            ("discovery_timeout_ms", self.device.discovery_timeout_ms),
            ("settle_ms", self.session.settle_ms),
            ("heartbeat_gap_ms", self.session.heartbeat_gap_ms),
            ("request_gap_ms", self.session.request_gap_ms),
            ("summary_interval_s", self.monitor.summary_interval_s),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
        }

        if self.monitor.status_buffer == 0 {
            return Err(ConfigError::Invalid("status_buffer must be at least 1".to_string()));
        }

        Ok(())
    }

    pub fn timings(&self) -> Timings {
        Timings {
            discovery_timeout: Duration::from_millis(self.device.discovery_timeout_ms),
            settle_delay: Duration::from_millis(self.session.settle_ms),
            heartbeat_gap: Duration::from_millis(self.session.heartbeat_gap_ms),
            request_gap: Duration::from_millis(self.session.request_gap_ms),
        }
    }

    /// The WattCycle profile for the configured address and cadence
    pub fn profile(&self) -> DeviceProfile {
        DeviceProfile::wattcycle(self.device.address.clone()).with_timings(self.timings())
    }
}
