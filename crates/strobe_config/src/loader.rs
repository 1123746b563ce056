//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{DelayRange, RunConfig};
use std::path::Path;

/// Conventional file name of a run configuration.
pub const CONFIG_FILE_NAME: &str = "strobe.toml";

/// Loads and validates a run configuration from a file.
pub fn load_config(path: &Path) -> Result<RunConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a run configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<RunConfig, ConfigError> {
    let config: RunConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

impl RunConfig {
    /// Checks that every option is within its legal domain.
    ///
    /// Probabilities must lie in `[0, 1]`, delay ranges must be non-empty,
    /// the clock period and watchdog must be positive, and the scoreboard
    /// target must be present and positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_period == 0 {
            return Err(invalid("clock_period must be positive"));
        }
        if self.watchdog_timeout_cycles == 0 {
            return Err(invalid("watchdog_timeout_cycles must be positive"));
        }
        check_probability("driver_stall_probability", self.driver_stall_probability)?;
        check_probability("monitor_stall_probability", self.monitor_stall_probability)?;
        check_range("driver_pre_delay_range", self.driver_pre_delay_range)?;
        check_range("driver_post_delay_range", self.driver_post_delay_range)?;
        match self.scoreboard_expected_matches {
            None => {
                return Err(ConfigError::MissingField(
                    "scoreboard_expected_matches".to_string(),
                ))
            }
            Some(0) => return Err(invalid("scoreboard_expected_matches must be positive")),
            Some(_) => {}
        }

        let stimulus = &self.stimulus;
        if stimulus.min_length == 0 {
            return Err(invalid("stimulus.min_length must be at least 1"));
        }
        if stimulus.min_length > stimulus.max_length {
            return Err(invalid(&format!(
                "stimulus.min_length ({}) exceeds stimulus.max_length ({})",
                stimulus.min_length, stimulus.max_length
            )));
        }

        let design = &self.design;
        if design.data_width == 0 || design.data_width % 8 != 0 {
            return Err(invalid(&format!(
                "design.data_width must be a positive multiple of 8, got {}",
                design.data_width
            )));
        }
        if design.depth == 0 {
            return Err(invalid("design.depth must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::ValidationError(msg.to_string())
}

fn check_probability(name: &str, p: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(invalid(&format!("{name} must be within [0, 1], got {p}")));
    }
    Ok(())
}

fn check_range(name: &str, range: DelayRange) -> Result<(), ConfigError> {
    if range.lo > range.hi {
        return Err(invalid(&format!("{name} is empty: {range}")));
    }
    Ok(())
}
