//! Type-safe configuration value objects.
//!
//! Strongly-typed configuration structs replace ad-hoc parameter passing at
//! controller construction. Benefits:
//!
//! - Compile-time type safety
//! - Centralized validation logic
//! - Self-documenting configuration requirements
//!
//! Configurations can be built in code or loaded from TOML:
//!
//! ```toml
//! n_laser = 3
//! n_ttl = 2
//! use_camera = true
//! camera_generation = "fire_exposure"
//! known_device = "/dev/ttyUSB1"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::regmap::{self, CameraGeneration};

/// How many channels of each signal class to drive, and whether the
/// camera trigger module is used.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Number of laser trigger channels to instantiate.
    #[serde(default)]
    pub n_laser: u32,
    /// Number of TTL output channels to instantiate.
    #[serde(default)]
    pub n_ttl: u32,
    /// Number of servo output channels to instantiate.
    #[serde(default)]
    pub n_servo: u32,
    /// Number of PWM output channels to instantiate.
    #[serde(default)]
    pub n_pwm: u32,
    /// Number of analog input channels to instantiate. Ignored on boards
    /// without an analog front end.
    #[serde(default)]
    pub n_ai: u32,
    /// Provision the camera trigger module and start in active
    /// synchronization.
    #[serde(default = "default_use_camera")]
    pub use_camera: bool,
    /// Camera timing generation; fixed for the whole session.
    #[serde(default)]
    pub camera_generation: CameraGeneration,
    /// Serial device to prefer when discovery finds several candidates.
    #[serde(default)]
    pub known_device: Option<String>,
}

fn default_use_camera() -> bool {
    true
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            n_laser: 0,
            n_ttl: 0,
            n_servo: 0,
            n_pwm: 0,
            n_ai: 0,
            use_camera: true,
            camera_generation: CameraGeneration::default(),
            known_device: None,
        }
    }
}

impl ControllerConfig {
    /// Creates a configuration from a TOML value.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the TOML structure or field types do not match.
    pub fn from_toml(config: &toml::Value) -> Result<Self> {
        toml::from_str(&toml::to_string(config)?)
            .context("Failed to parse controller configuration")
    }

    /// Validates the channel counts against the board capacities.
    ///
    /// # Errors
    ///
    /// Returns `Err` when any count exceeds the corresponding capacity.
    pub fn validate(&self) -> Result<()> {
        let bounds = [
            ("n_laser", self.n_laser, regmap::NUM_LASERS),
            ("n_ttl", self.n_ttl, regmap::NUM_TTL),
            ("n_servo", self.n_servo, regmap::NUM_SERVOS),
            ("n_pwm", self.n_pwm, regmap::NUM_PWM),
            ("n_ai", self.n_ai, regmap::NUM_AI),
        ];
        for (name, requested, capacity) in bounds {
            if requested > capacity {
                anyhow::bail!("{name} must be at most {capacity}, got {requested}");
            }
        }
        Ok(())
    }

    /// Creates a validated configuration from TOML.
    ///
    /// Combines `from_toml()` and `validate()` in one call.
    pub fn from_toml_validated(config: &toml::Value) -> Result<Self> {
        let config = Self::from_toml(config)?;
        config.validate()?;
        Ok(config)
    }
}

/// Serial line parameters for the device connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    /// Baud rate of the device UART.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Read timeout in milliseconds; bounds every register read.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_baud_rate() -> u32 {
    57_600
}

fn default_timeout_ms() -> u64 {
    1_000
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.use_camera);
        assert_eq!(config.camera_generation, CameraGeneration::FireExposure);
    }

    #[test]
    fn test_validation_rejects_too_many_channels() {
        let config = ControllerConfig {
            n_laser: 9,
            ..ControllerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ControllerConfig {
            n_ttl: 5,
            ..ControllerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            n_laser = 3
            n_ttl = 2
            use_camera = false
            camera_generation = "legacy"
            known_device = "/dev/ttyUSB1"
        "#;
        let value: toml::Value = toml::from_str(toml_str).unwrap();
        let config = ControllerConfig::from_toml_validated(&value).unwrap();

        assert_eq!(config.n_laser, 3);
        assert_eq!(config.n_ttl, 2);
        assert_eq!(config.n_servo, 0);
        assert!(!config.use_camera);
        assert_eq!(config.camera_generation, CameraGeneration::Legacy);
        assert_eq!(config.known_device.as_deref(), Some("/dev/ttyUSB1"));
    }

    #[test]
    fn test_serial_defaults() {
        let serial = SerialConfig::default();
        assert_eq!(serial.baud_rate, 57_600);
        assert_eq!(serial.timeout_ms, 1_000);
    }
}
