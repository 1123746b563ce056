//! The [`Design`] trait and the settle loop.

use tracing::trace;

use crate::error::SimError;
use crate::signal::SignalBank;

/// Maximum evaluation passes per settle before a combinational loop is assumed.
pub const MAX_SETTLE_ITERATIONS: u32 = 1000;

/// A clocked digital design driven through its ports.
///
/// The design owns its internal state; the harness only sees the signals the
/// design declares during [`elaborate`](Design::elaborate). Designs write
/// their outputs with immediate deposits.
pub trait Design {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Declares every port into `signals`. Called once before simulation.
    fn elaborate(&mut self, signals: &mut SignalBank) -> Result<(), SimError>;

    /// Updates sequential state on a rising clock edge.
    ///
    /// Inputs are sampled as they were settled before the edge.
    fn clock_edge(&mut self, signals: &mut SignalBank) -> Result<(), SimError>;

    /// Recomputes combinational outputs from the current inputs and state.
    ///
    /// Called repeatedly until no signal changes.
    fn evaluate(&mut self, signals: &mut SignalBank) -> Result<(), SimError>;
}

/// Commits scheduled writes and evaluates `design` until its signals are stable.
///
/// Returns the number of evaluation passes taken. Fails with
/// [`SimError::SettleLimit`] when the design has not converged after
/// [`MAX_SETTLE_ITERATIONS`] passes.
pub fn settle(
    design: &mut dyn Design,
    signals: &mut SignalBank,
    cycle: u64,
) -> Result<u32, SimError> {
    signals.commit_pending();
    for pass in 1..=MAX_SETTLE_ITERATIONS {
        signals.clear_dirty();
        design.evaluate(signals)?;
        if !signals.is_dirty() {
            trace!(design = design.name(), cycle, passes = pass, "settled");
            return Ok(pass);
        }
    }
    Err(SimError::SettleLimit {
        cycle,
        max_iterations: MAX_SETTLE_ITERATIONS,
    })
}
