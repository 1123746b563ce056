//! `strobe init`: writes a commented starter `strobe.toml`.

use std::fs;
use std::path::PathBuf;

use strobe_config::CONFIG_FILE_NAME;

use crate::GlobalArgs;

const TEMPLATE: &str = r#"# Strobe run configuration.

# Clock period, in `timescale` units.
clock_period = 10
timescale = "ns"

# Clock edges allowed after stimulus starts before the run fails.
watchdog_timeout_cycles = 100000

# Probability that the driver holds tvalid low / the monitor holds tready low
# on any given edge.
driver_stall_probability = 0.1
monitor_stall_probability = 0.1

# Idle edges before and after each transaction, drawn uniformly.
driver_pre_delay_range = [0, 10]
driver_post_delay_range = "0..=10"

# Matches required to pass. Defaults to [stimulus] transactions when omitted.
scoreboard_expected_matches = 20

# Master seed. Omit for a fresh seed on every run.
# seed = 3233816613

[reset]
cycles = 5
active_high = true

[stimulus]
transactions = 20
min_length = 1
max_length = 64

[design]
kind = "fifo"        # "loopback" | "fifo"
data_width = 32
depth = 2
keep = true
"#;

/// Runs the `strobe init` command.
///
/// Writes `strobe.toml` into `dir` (created if needed), or the current
/// directory. Refuses to overwrite an existing file. Returns exit code 0.
pub fn run(dir: Option<String>, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let dir = match dir {
        Some(d) => {
            let dir = PathBuf::from(d);
            fs::create_dir_all(&dir)?;
            dir
        }
        None => std::env::current_dir()?,
    };

    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(format!("'{}' already exists", path.display()).into());
    }
    fs::write(&path, TEMPLATE)?;

    if !global.quiet {
        eprintln!("     Created {}", path.display());
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quiet() -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config: None,
        }
    }

    #[test]
    fn init_writes_valid_config() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("bench");
        let code = run(Some(dir.to_str().unwrap().to_string()), &quiet()).unwrap();
        assert_eq!(code, 0);

        let text = fs::read_to_string(dir.join(CONFIG_FILE_NAME)).unwrap();
        let config = strobe_config::load_config_from_str(&text);
        assert!(config.is_ok(), "generated strobe.toml should be valid: {config:?}");
        let config = config.unwrap();
        assert_eq!(config.scoreboard_expected_matches, Some(20));
        assert_eq!(config.stimulus.transactions, 20);
        assert!(config.seed.is_none());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "# mine\n").unwrap();

        let result = run(Some(tmp.path().to_str().unwrap().to_string()), &quiet());
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "# mine\n");
    }
}
