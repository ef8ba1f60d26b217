//! Utility module for embedmpv
//!
//! This module provides common utilities used throughout the crate:
//! - Error handling with custom error types
//! - Configuration management
//! - Small numeric helpers

pub mod config;
pub mod error;

// Re-export commonly used items
pub use config::{Config, EngineConfig, EngineKind, GeneralConfig, MpvConfig, SpeedConfig};
pub use error::{EngineError, PlayerError, Result, ValidationError};

/// Initialize the application configuration
///
/// Loads configuration from:
/// 1. Default values
/// 2. System configuration file
/// 3. User configuration file
/// 4. Environment variables
///
/// # Returns
///
/// Returns the loaded configuration or an error if loading fails
pub fn load_config() -> Result<Config> {
    Config::load()
}

/// Round a value to two decimal places
///
/// # Arguments
///
/// * `value` - Value to round
///
/// # Returns
///
/// The value rounded half away from zero to the nearest hundredth
pub fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compare two floats with a tolerance suited to user-entered rates
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
