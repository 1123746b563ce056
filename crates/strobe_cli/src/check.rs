//! `strobe check`: validates the configuration and prints what a run would do.

use strobe_config::{DesignKind, RunConfig};

use crate::project::{fill_target, load, resolve_config_path};
use crate::GlobalArgs;

/// Runs the `strobe check` command.
///
/// Returns exit code 0 when the configuration is valid. Load and
/// validation failures are returned as errors.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let path = resolve_config_path(global)?;
    if !global.quiet {
        eprintln!("   Checking {}", path.display());
    }

    let mut config = load(&path)?;
    fill_target(&mut config);
    config.validate()?;

    if !global.quiet {
        for line in summary(&config) {
            eprintln!("             {line}");
        }
        eprintln!("         Ok configuration is valid");
    }
    Ok(0)
}

/// One line per setting group, for display.
fn summary(config: &RunConfig) -> Vec<String> {
    let design = &config.design;
    let design_line = match design.kind {
        DesignKind::Loopback => format!(
            "design: loopback, {}-bit, keep {}",
            design.data_width,
            on_off(design.keep)
        ),
        DesignKind::Fifo => format!(
            "design: fifo, {}-bit, depth {}, keep {}",
            design.data_width,
            design.depth,
            on_off(design.keep)
        ),
    };
    vec![
        format!(
            "clock: {} {} period ({})",
            config.clock_period,
            config.timescale,
            config.clock_period_time()
        ),
        format!(
            "reset: {} cycles, active {}",
            config.reset.cycles,
            if config.reset.active_high { "high" } else { "low" }
        ),
        format!(
            "stimulus: {} transactions of {}..={} bytes",
            config.stimulus.transactions, config.stimulus.min_length, config.stimulus.max_length
        ),
        format!(
            "stalls: driver {}, monitor {}",
            config.driver_stall_probability, config.monitor_stall_probability
        ),
        format!(
            "delays: pre {}, post {}",
            config.driver_pre_delay_range, config.driver_post_delay_range
        ),
        format!(
            "target: {} matches within {} cycles",
            config.scoreboard_expected_matches.unwrap_or_default(),
            config.watchdog_timeout_cycles
        ),
        match config.seed {
            Some(seed) => format!("seed: {seed}"),
            None => "seed: random".to_string(),
        },
        design_line,
    ]
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use strobe_config::CONFIG_FILE_NAME;
    use tempfile::TempDir;

    fn global(dir: &TempDir) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(dir.path().to_str().unwrap().to_string()),
        }
    }

    #[test]
    fn valid_config_passes() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "seed = 1\n").unwrap();
        assert_eq!(run(&global(&tmp)).unwrap(), 0);
    }

    #[test]
    fn invalid_probability_fails() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "driver_stall_probability = 1.5\n",
        )
        .unwrap();
        let err = run(&global(&tmp)).unwrap_err();
        assert!(err.to_string().contains("driver_stall_probability"), "{err}");
    }

    #[test]
    fn summary_describes_defaults() {
        let mut config = RunConfig::default();
        fill_target(&mut config);
        let lines = summary(&config);
        assert_eq!(lines[0], "clock: 10 ns period (10 ns)");
        assert_eq!(lines[2], "stimulus: 10 transactions of 1..=64 bytes");
        assert_eq!(lines[4], "delays: pre 0..=10, post 0..=10");
        assert_eq!(lines[5], "target: 10 matches within 1000000 cycles");
        assert_eq!(lines[6], "seed: random");
        assert_eq!(lines[7], "design: fifo, 32-bit, depth 2, keep on");
    }
}
