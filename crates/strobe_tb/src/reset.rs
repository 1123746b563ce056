//! Synchronous reset sequencing.

use strobe_config::ResetConfig;
use strobe_sim::SignalHandle;
use tracing::debug;

use crate::error::HarnessError;
use crate::scheduler::{Process, SimContext, Suspend};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResetState {
    Start,
    Hold(u64),
    Release,
}

/// Holds a reset signal asserted for a number of clock edges, releases it,
/// then waits one more edge before finishing.
///
/// The design samples the asserted level on exactly `cycles` rising edges.
#[derive(Debug)]
pub struct ResetSequence {
    signal: SignalHandle,
    cycles: u64,
    active_high: bool,
    state: ResetState,
}

impl ResetSequence {
    /// Creates a sequence for the one-bit `signal`.
    pub fn new(signal: SignalHandle, cycles: u64, active_high: bool) -> Self {
        Self {
            signal,
            cycles,
            active_high,
            state: ResetState::Start,
        }
    }

    /// Creates a sequence using the configured cycle count and polarity.
    pub fn from_config(signal: SignalHandle, config: &ResetConfig) -> Self {
        Self::new(signal, config.cycles, config.active_high)
    }

    /// The reset signal.
    pub fn signal(&self) -> &SignalHandle {
        &self.signal
    }

    /// Edges the reset is held asserted.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Whether the reset is asserted by driving 1.
    pub fn active_high(&self) -> bool {
        self.active_high
    }

    fn release(&mut self, cx: &mut SimContext<'_>) -> Result<Suspend, HarnessError> {
        cx.set_bool(&self.signal, !self.active_high)?;
        debug!(signal = self.signal.name(), cycle = cx.cycle(), "reset released");
        self.state = ResetState::Release;
        Ok(Suspend::RisingEdge)
    }
}

impl Process for ResetSequence {
    fn name(&self) -> &str {
        self.signal.name()
    }

    fn resume(&mut self, cx: &mut SimContext<'_>) -> Result<Suspend, HarnessError> {
        match self.state {
            ResetState::Start if self.cycles == 0 => self.release(cx),
            ResetState::Start => {
                cx.set_bool(&self.signal, self.active_high)?;
                debug!(
                    signal = self.signal.name(),
                    cycle = cx.cycle(),
                    cycles = self.cycles,
                    "reset asserted"
                );
                self.state = ResetState::Hold(self.cycles);
                Ok(Suspend::RisingEdge)
            }
            ResetState::Hold(n) if n <= 1 => self.release(cx),
            ResetState::Hold(n) => {
                self.state = ResetState::Hold(n - 1);
                Ok(Suspend::RisingEdge)
            }
            ResetState::Release => Ok(Suspend::Finished),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use strobe_common::SimTime;
    use strobe_sim::{AxisLoopback, Design, SignalBank, SimError};

    use crate::scheduler::Scheduler;

    /// Records the reset level it sees on every edge.
    struct Probe {
        rst: Option<SignalHandle>,
        seen: Rc<RefCell<Vec<bool>>>,
    }

    impl Design for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn elaborate(&mut self, signals: &mut SignalBank) -> Result<(), SimError> {
            signals.add("clk", 1)?;
            self.rst = Some(signals.add("rst", 1)?);
            Ok(())
        }

        fn clock_edge(&mut self, signals: &mut SignalBank) -> Result<(), SimError> {
            if let Some(rst) = &self.rst {
                self.seen.borrow_mut().push(signals.get_bool(rst));
            }
            Ok(())
        }

        fn evaluate(&mut self, _signals: &mut SignalBank) -> Result<(), SimError> {
            Ok(())
        }
    }

    fn probe() -> (Scheduler, Rc<RefCell<Vec<bool>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut s = Scheduler::new(Box::new(Probe {
            rst: None,
            seen: Rc::clone(&seen),
        }))
        .unwrap();
        s.start_clock("clk", SimTime::from_ns(10)).unwrap();
        (s, seen)
    }

    #[test]
    fn design_samples_reset_for_configured_edges() {
        let (mut s, seen) = probe();
        let rst = s.handle("rst").unwrap();
        let id = s.spawn(ResetSequence::new(rst, 3, true));
        let edges = s.run_until(20, |s| !s.is_alive(id)).unwrap();
        assert_eq!(edges, Some(5));
        assert_eq!(*seen.borrow(), vec![false, true, true, true, false]);
    }

    #[test]
    fn active_low_polarity() {
        let (mut s, seen) = probe();
        let rst = s.handle("rst").unwrap();
        s.signals_mut().deposit_bool(&rst, true).unwrap();
        let config = ResetConfig {
            cycles: 2,
            active_high: false,
        };
        let id = s.spawn(ResetSequence::from_config(rst.clone(), &config));
        s.run_until(20, |s| !s.is_alive(id)).unwrap();
        assert_eq!(*seen.borrow(), vec![true, false, false, true]);
        assert!(s.signals().get_bool(&rst));
    }

    #[test]
    fn zero_cycles_only_releases() {
        let (mut s, seen) = probe();
        let rst = s.handle("rst").unwrap();
        let id = s.spawn(ResetSequence::new(rst, 0, true));
        let edges = s.run_until(20, |s| !s.is_alive(id)).unwrap();
        assert_eq!(edges, Some(2));
        assert!(seen.borrow().iter().all(|level| !level));
    }

    #[test]
    fn releases_after_held_edges_on_real_design() {
        let mut s = Scheduler::new(Box::new(AxisLoopback::new(8, false).unwrap())).unwrap();
        s.start_clock("clk", SimTime::from_ns(10)).unwrap();
        let rst = s.handle("rst").unwrap();
        let id = s.spawn(ResetSequence::new(rst.clone(), 5, true));
        s.run_until(20, |s| !s.is_alive(id)).unwrap();
        assert_eq!(s.cycle(), 7);
        assert!(!s.signals().get_bool(&rst));
    }
}
