//! `strobe run`: drives random traffic through a reference design.
//!
//! The pipeline:
//!
//! 1. Resolve and parse `strobe.toml`
//! 2. Apply command-line overrides, default the match target, validate
//! 3. Elaborate the selected design and bind `s_axis` / `m_axis`
//! 4. Register the driver, monitor and `rst` reset
//! 5. Run and report the outcome

use serde_json::json;
use strobe_config::{DesignKind, RunConfig};
use strobe_sim::{AxisFifo, AxisLoopback};
use strobe_tb::{
    AxiStreamBus, AxiStreamDriveLogic, AxiStreamReceiveLogic, Driver, Environment, HarnessError,
    Monitor, RandomStimulus, RunReport,
};
use tracing::debug;

use crate::project::{fill_target, load, resolve_config_path};
use crate::{DesignChoice, GlobalArgs, ReportFormat, RunArgs};

/// Runs the `strobe run` command.
///
/// Returns exit code 0 on pass and 1 on a scoreboard mismatch, a watchdog
/// timeout or a harness error.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let path = resolve_config_path(global)?;
    let mut config = load(&path)?;
    apply_overrides(&mut config, args);
    fill_target(&mut config);
    config.validate()?;
    debug!(path = %path.display(), ?config, "configuration loaded");

    let mut env = build_environment(config)?;
    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!(
            "     Running {} (seed {})",
            env.scheduler().design_name(),
            env.seed()
        );
    }

    let seed = env.seed();
    let outcome = env.run();
    match args.format {
        ReportFormat::Text => print_text(&outcome, global),
        ReportFormat::Json => {
            let value = match &outcome {
                Ok(report) => json!({ "status": "pass", "report": report }),
                Err(e) => json!({ "status": failure_kind(e), "seed": seed, "error": e.to_string() }),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(if outcome.is_ok() { 0 } else { 1 })
}

/// Applies `--seed`, `--design` and `--transactions`.
///
/// `--transactions` also sets the match target.
fn apply_overrides(config: &mut RunConfig, args: &RunArgs) {
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(design) = args.design {
        config.design.kind = match design {
            DesignChoice::Loopback => DesignKind::Loopback,
            DesignChoice::Fifo => DesignKind::Fifo,
        };
    }
    if let Some(count) = args.transactions {
        config.stimulus.transactions = count;
        config.scoreboard_expected_matches = Some(count);
    }
}

/// Assembles the environment for the configured reference design.
fn build_environment(config: RunConfig) -> Result<Environment, HarnessError> {
    let design = config.design.clone();
    let mut env = match design.kind {
        DesignKind::Loopback => {
            Environment::new(AxisLoopback::new(design.data_width, design.keep)?, config)?
        }
        DesignKind::Fifo => Environment::new(
            AxisFifo::new(design.data_width, design.depth, design.keep)?,
            config,
        )?,
    };

    let s_axis = AxiStreamBus::from_prefix("s_axis", env.signals())?;
    let m_axis = AxiStreamBus::from_prefix("m_axis", env.signals())?;
    let mut stimulus = RandomStimulus::new(env.component_seed());
    if s_axis.tkeep().is_none() {
        stimulus = stimulus.aligned_to(s_axis.byte_width());
    }

    let seed = env.component_seed();
    env.add_driver(
        Driver::new("s_axis", AxiStreamDriveLogic::new(s_axis), seed),
        stimulus,
    );
    let seed = env.component_seed();
    env.add_monitor(Monitor::new(
        "m_axis",
        AxiStreamReceiveLogic::new(m_axis),
        seed,
    ));
    env.add_reset_signal("rst")?;
    Ok(env)
}

fn failure_kind(error: &HarnessError) -> &'static str {
    match error {
        HarnessError::ScoreboardMismatch { .. } => "mismatch",
        HarnessError::Timeout { .. } => "timeout",
        _ => "error",
    }
}

fn print_text(outcome: &Result<RunReport, HarnessError>, global: &GlobalArgs) {
    match outcome {
        Ok(report) => {
            if !global.quiet {
                eprintln!("      Passed {report}");
            }
        }
        Err(e) => eprintln!("      Failed {e}"),
    }
}
