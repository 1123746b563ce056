//! The verification environment: one design, one run.
//!
//! [`Environment::run`] sequences the whole test. Each step must finish
//! before the next begins:
//!
//! 1. start the clock at `clock_period` × `timescale`;
//! 2. configure the scoreboard and the monitors;
//! 3. start the monitors;
//! 4. spawn every reset sequence and step until all of them have finished;
//! 5. configure each driver, generate its stimulus, load and start it;
//! 6. step until the scoreboard reaches its target, or fail with
//!    [`HarnessError::Timeout`] once `watchdog_timeout_cycles` edges elapse.
//!
//! Drivers and monitors are stopped however the run ends.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use strobe_common::SimTime;
use strobe_config::RunConfig;
use strobe_sim::{Design, SignalBank, SignalHandle};
use tracing::{debug, info, warn};

use crate::driver::TransactionDriver;
use crate::error::{ConfigurationError, HarnessError};
use crate::monitor::TransactionMonitor;
use crate::reset::ResetSequence;
use crate::scheduler::{Scheduler, TaskId};
use crate::scoreboard::{Scoreboard, SharedScoreboard};
use crate::stimulus::StimulusGenerator;

const COMPONENT: &str = "environment";

/// Default name of the clock signal.
pub const DEFAULT_CLOCK: &str = "clk";

struct DriverSlot {
    driver: Box<dyn TransactionDriver>,
    stimulus: Box<dyn StimulusGenerator>,
}

/// Summary of a passing run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Name of the design under test.
    pub design: String,
    /// Master seed the run was derived from.
    pub seed: u64,
    /// Edges stepped after the drivers started.
    pub cycles: u64,
    /// Edges stepped in total, reset included.
    pub total_cycles: u64,
    /// Simulation time of the last edge.
    pub sim_time: SimTime,
    /// Matches counted by the scoreboard.
    pub matches: u64,
    /// Matches required to pass.
    pub target: u64,
    /// Transactions fully driven, over all drivers.
    pub driven: u64,
    /// Transactions reported, over all monitors.
    pub received: u64,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} matches in {} cycles ({} total, {}), seed {}",
            self.design,
            self.matches,
            self.target,
            self.cycles,
            self.total_cycles,
            self.sim_time,
            self.seed
        )
    }
}

/// Owns the scheduler, scoreboard and every registered component of a run.
pub struct Environment {
    config: RunConfig,
    seed: u64,
    seeds: StdRng,
    scheduler: Scheduler,
    scoreboard: SharedScoreboard,
    clock: String,
    resets: Vec<ResetSequence>,
    drivers: Vec<DriverSlot>,
    monitors: Vec<Box<dyn TransactionMonitor>>,
    started: bool,
}

impl Environment {
    /// Validates `config` and elaborates `design`.
    ///
    /// The master seed is `config.seed`, or drawn from entropy when absent.
    pub fn new(design: impl Design + 'static, config: RunConfig) -> Result<Self, HarnessError> {
        config.validate().map_err(ConfigurationError::from)?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let scheduler = Scheduler::new(Box::new(design))?;
        debug!(design = scheduler.design_name(), seed, "environment created");
        Ok(Self {
            config,
            seed,
            seeds: StdRng::seed_from_u64(seed),
            scheduler,
            scoreboard: SharedScoreboard::default(),
            clock: DEFAULT_CLOCK.to_string(),
            resets: Vec::new(),
            drivers: Vec::new(),
            monitors: Vec::new(),
            started: false,
        })
    }

    /// The validated run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The master seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draws the next per-component seed from the master seed.
    ///
    /// Components seeded in the same order get the same seeds on every run
    /// with the same master seed.
    pub fn component_seed(&mut self) -> u64 {
        self.seeds.gen()
    }

    /// The design's signals, for building interface bindings.
    pub fn signals(&self) -> &SignalBank {
        self.scheduler.signals()
    }

    /// Resolves a design signal by name.
    pub fn handle(&self, name: &str) -> Result<SignalHandle, HarnessError> {
        self.scheduler.handle(name)
    }

    /// The scheduler, for inspection after a run.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The run's scoreboard.
    pub fn scoreboard(&self) -> &SharedScoreboard {
        &self.scoreboard
    }

    /// Replaces the scoreboard, e.g. with one carrying a reference model.
    pub fn set_scoreboard(&mut self, scoreboard: Scoreboard) {
        self.scoreboard = SharedScoreboard::new(scoreboard);
    }

    /// Uses `name` as the clock instead of [`DEFAULT_CLOCK`].
    pub fn set_clock(&mut self, name: impl Into<String>) {
        self.clock = name.into();
    }

    /// Registers a reset sequence.
    pub fn add_reset(&mut self, reset: ResetSequence) {
        self.resets.push(reset);
    }

    /// Registers a reset on signal `name` using the `[reset]` configuration.
    pub fn add_reset_signal(&mut self, name: &str) -> Result<(), HarnessError> {
        let handle = self.handle(name)?;
        let reset = ResetSequence::from_config(handle, &self.config.reset);
        self.add_reset(reset);
        Ok(())
    }

    /// Registers a driver and the generator that supplies its transactions.
    pub fn add_driver(
        &mut self,
        driver: impl TransactionDriver + 'static,
        stimulus: impl StimulusGenerator + 'static,
    ) {
        self.drivers.push(DriverSlot {
            driver: Box::new(driver),
            stimulus: Box::new(stimulus),
        });
    }

    /// Registers a monitor.
    pub fn add_monitor(&mut self, monitor: impl TransactionMonitor + 'static) {
        self.monitors.push(Box::new(monitor));
    }

    /// Looks up a registered driver by name.
    pub fn driver(&self, name: &str) -> Option<&dyn TransactionDriver> {
        self.drivers
            .iter()
            .find(|slot| slot.driver.name() == name)
            .map(|slot| slot.driver.as_ref())
    }

    /// Looks up a registered monitor by name.
    pub fn monitor(&self, name: &str) -> Option<&dyn TransactionMonitor> {
        self.monitors
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    /// Runs the test to completion. An environment runs once.
    pub fn run(&mut self) -> Result<RunReport, HarnessError> {
        if self.started {
            return Err(HarnessError::runtime(COMPONENT, "run already started"));
        }
        self.started = true;
        info!(
            design = self.scheduler.design_name(),
            seed = self.seed,
            drivers = self.drivers.len(),
            monitors = self.monitors.len(),
            "run started"
        );

        let outcome = self.execute();
        let stopped = self.stop_all();
        match &outcome {
            Ok(report) => info!(
                matches = report.matches,
                cycles = report.cycles,
                "run passed"
            ),
            Err(e) => warn!(cycle = self.scheduler.cycle(), "run failed: {e}"),
        }
        let report = outcome?;
        stopped?;
        Ok(report)
    }

    fn execute(&mut self) -> Result<RunReport, HarnessError> {
        let period = self.config.clock_period_time();
        self.scheduler.start_clock(&self.clock, period)?;

        let config = &self.config;
        self.scoreboard.with_mut(|sb| sb.set_config(config));
        for monitor in &mut self.monitors {
            monitor.set_config(&self.config);
            monitor.set_receive_callback(self.scoreboard.receive_callback());
        }
        for monitor in &mut self.monitors {
            monitor.start(&mut self.scheduler)?;
        }

        self.run_resets()?;

        for slot in &mut self.drivers {
            slot.driver.set_config(&self.config);
            slot.driver
                .set_expect_callback(self.scoreboard.expect_callback());
            let transactions = slot.stimulus.generate(&self.config);
            debug!(
                driver = slot.driver.name(),
                count = transactions.len(),
                "stimulus generated"
            );
            slot.driver.load(transactions)?;
            slot.driver.start(&mut self.scheduler)?;
        }
        info!(cycle = self.scheduler.cycle(), "drivers started");

        let watchdog = self.config.watchdog_timeout_cycles;
        let scoreboard = self.scoreboard.clone();
        let elapsed = self
            .scheduler
            .run_until(watchdog, |_| scoreboard.is_complete())?;

        let (matches, target, pending_expected, pending_received) = self.scoreboard.with(|sb| {
            (
                sb.matches(),
                sb.target().unwrap_or_default(),
                sb.pending_expected(),
                sb.pending_received(),
            )
        });
        let Some(cycles) = elapsed else {
            return Err(HarnessError::Timeout {
                cycles: watchdog,
                matched: matches,
                target,
                pending_expected,
                pending_received,
            });
        };

        Ok(RunReport {
            design: self.scheduler.design_name().to_string(),
            seed: self.seed,
            cycles,
            total_cycles: self.scheduler.cycle(),
            sim_time: self.scheduler.time(),
            matches,
            target,
            driven: self.drivers.iter().map(|slot| slot.driver.driven()).sum(),
            received: self.monitors.iter().map(|m| m.received()).sum(),
        })
    }

    fn run_resets(&mut self) -> Result<(), HarnessError> {
        if self.resets.is_empty() {
            return Ok(());
        }
        let ids: Vec<TaskId> = self
            .resets
            .drain(..)
            .map(|reset| self.scheduler.spawn(reset))
            .collect();
        let budget = self.config.watchdog_timeout_cycles;
        let done = self
            .scheduler
            .run_until(budget, |s| ids.iter().all(|id| !s.is_alive(*id)))?;
        match done {
            Some(edges) => {
                info!(edges, resets = ids.len(), "reset complete");
                Ok(())
            }
            None => Err(HarnessError::runtime(
                COMPONENT,
                format!("reset did not finish within {budget} cycles"),
            )),
        }
    }

    fn stop_all(&mut self) -> Result<(), HarnessError> {
        let mut first = None;
        for slot in &mut self.drivers {
            if let Err(e) = slot.driver.stop(&mut self.scheduler) {
                first.get_or_insert(e);
            }
        }
        for monitor in &mut self.monitors {
            if let Err(e) = monitor.stop(&mut self.scheduler) {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("design", &self.scheduler.design_name())
            .field("seed", &self.seed)
            .field("clock", &self.clock)
            .field("resets", &self.resets.len())
            .field("drivers", &self.drivers.len())
            .field("monitors", &self.monitors.len())
            .field("started", &self.started)
            .finish()
    }
}
