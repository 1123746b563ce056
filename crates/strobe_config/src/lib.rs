//! Parsing and validation of `strobe.toml` run configuration files.
//!
//! This crate reads the run configuration and produces a strongly-typed
//! [`RunConfig`] holding clocking, stall, delay, watchdog and scoreboard
//! options together with the reset, stimulus and reference-design tables used
//! by the command-line tool.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
