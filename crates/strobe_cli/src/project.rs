//! Locating and loading `strobe.toml`.

use std::path::{Path, PathBuf};

use strobe_config::{ConfigError, RunConfig, CONFIG_FILE_NAME};

use crate::GlobalArgs;

/// Resolves the configuration file for this invocation.
///
/// `--config` may name the file or the directory holding it. Without it,
/// the current directory and its parents are searched.
pub fn resolve_config_path(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match &global.config {
        Some(path) => {
            let path = PathBuf::from(path);
            if path.is_dir() {
                Ok(path.join(CONFIG_FILE_NAME))
            } else {
                Ok(path)
            }
        }
        None => find_config(&std::env::current_dir()?),
    }
}

/// Walks up from `start` looking for `strobe.toml`.
pub fn find_config(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            format!(
                "could not find `{CONFIG_FILE_NAME}` in {} or any parent directory (run `strobe init`)",
                start.display()
            )
            .into()
        })
}

/// Parses a configuration file without validating it.
///
/// Callers apply command-line overrides and [`fill_target`] first, then
/// call [`RunConfig::validate`].
pub fn load(path: &Path) -> Result<RunConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Defaults the match target to one match per generated transaction.
pub fn fill_target(config: &mut RunConfig) {
    if config.scoreboard_expected_matches.is_none() {
        config.scoreboard_expected_matches = Some(config.stimulus.transactions);
    }
}
