//! Protocol-agnostic transaction monitor.
//!
//! A [`Monitor`] runs its [`ReceiveLogic`] as a scheduler task and reports
//! every reconstructed transaction to the receive callback, once, in wire
//! order. The monitor only drives the consumer-side ready signal.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use strobe_config::RunConfig;
use tracing::debug;

use crate::error::HarnessError;
use crate::scheduler::{Process, Scheduler, SimContext, Suspend, TaskId};
use crate::scoreboard::TransactionCallback;
use crate::transaction::Transaction;

/// Sink through which receive logic hands over a completed transaction.
pub type Emit<'a> = dyn FnMut(Transaction) -> Result<(), HarnessError> + 'a;

/// Protocol-specific observation behaviour plugged into a [`Monitor`].
pub trait ReceiveLogic {
    /// Reads protocol options (stall probability, ...) from the run configuration.
    fn configure(&mut self, _config: &RunConfig) {}

    /// Advances observation by one suspension point, calling `emit` for each
    /// completed transaction.
    fn resume(
        &mut self,
        cx: &mut SimContext<'_>,
        rng: &mut StdRng,
        emit: &mut Emit<'_>,
    ) -> Result<Suspend, HarnessError>;

    /// Called when the monitor task is killed.
    fn cancel(&mut self, _cx: &mut SimContext<'_>) -> Result<(), HarnessError> {
        Ok(())
    }
}

/// Object-safe monitor interface used by the environment.
pub trait TransactionMonitor {
    /// Monitor name, for logs and lookups.
    fn name(&self) -> &str;

    /// Takes protocol options from the run configuration.
    fn set_config(&mut self, config: &RunConfig);

    /// Installs the callback told about each reconstructed transaction.
    fn set_receive_callback(&mut self, callback: TransactionCallback);

    /// Spawns the observation task, or returns the existing one while alive.
    fn start(&mut self, scheduler: &mut Scheduler) -> Result<TaskId, HarnessError>;

    /// Kills the observation task if alive.
    fn stop(&mut self, scheduler: &mut Scheduler) -> Result<(), HarnessError>;

    /// Whether the observation task is alive.
    fn is_running(&self, scheduler: &Scheduler) -> bool;

    /// Transactions reported so far.
    fn received(&self) -> u64;

    /// How many observation tasks have been spawned.
    fn launches(&self) -> u64;
}

struct MonitorCore<L> {
    name: String,
    logic: L,
    rng: StdRng,
    receive: Option<TransactionCallback>,
    received: u64,
}

struct MonitorTask<L> {
    name: String,
    core: Rc<RefCell<MonitorCore<L>>>,
}

impl<L: ReceiveLogic> Process for MonitorTask<L> {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, cx: &mut SimContext<'_>) -> Result<Suspend, HarnessError> {
        let mut core = self.core.borrow_mut();
        let MonitorCore {
            name,
            logic,
            rng,
            receive,
            received,
        } = &mut *core;
        let cycle = cx.cycle();
        let mut emit = |transaction: Transaction| -> Result<(), HarnessError> {
            *received += 1;
            debug!(monitor = %name, cycle, %transaction, "received");
            match receive.as_mut() {
                Some(callback) => callback(&transaction),
                None => Ok(()),
            }
        };
        logic.resume(cx, rng, &mut emit)
    }

    fn cancel(&mut self, cx: &mut SimContext<'_>) -> Result<(), HarnessError> {
        self.core.borrow_mut().logic.cancel(cx)
    }
}

/// A transaction monitor parameterized by its protocol logic.
pub struct Monitor<L> {
    name: String,
    core: Rc<RefCell<MonitorCore<L>>>,
    task: Option<TaskId>,
    launches: u64,
}

impl<L: ReceiveLogic + 'static> Monitor<L> {
    /// Creates an idle monitor whose random draws are seeded with `seed`.
    pub fn new(name: impl Into<String>, logic: L, seed: u64) -> Self {
        let name = name.into();
        Self {
            core: Rc::new(RefCell::new(MonitorCore {
                name: name.clone(),
                logic,
                rng: StdRng::seed_from_u64(seed),
                receive: None,
                received: 0,
            })),
            name,
            task: None,
            launches: 0,
        }
    }

    /// Builder form of [`set_receive_callback`](TransactionMonitor::set_receive_callback).
    pub fn with_receive_callback(self, callback: TransactionCallback) -> Self {
        self.core.borrow_mut().receive = Some(callback);
        self
    }
}

impl<L: ReceiveLogic + 'static> TransactionMonitor for Monitor<L> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_config(&mut self, config: &RunConfig) {
        self.core.borrow_mut().logic.configure(config);
    }

    fn set_receive_callback(&mut self, callback: TransactionCallback) {
        self.core.borrow_mut().receive = Some(callback);
    }

    fn start(&mut self, scheduler: &mut Scheduler) -> Result<TaskId, HarnessError> {
        if let Some(id) = self.task {
            if scheduler.is_alive(id) {
                return Ok(id);
            }
        }
        let id = scheduler.spawn(MonitorTask {
            name: format!("monitor '{}'", self.name),
            core: Rc::clone(&self.core),
        });
        self.task = Some(id);
        self.launches += 1;
        Ok(id)
    }

    fn stop(&mut self, scheduler: &mut Scheduler) -> Result<(), HarnessError> {
        if let Some(id) = self.task.take() {
            scheduler.kill(id)?;
        }
        Ok(())
    }

    fn is_running(&self, scheduler: &Scheduler) -> bool {
        self.task.is_some_and(|id| scheduler.is_alive(id))
    }

    fn received(&self) -> u64 {
        self.core.borrow().received
    }

    fn launches(&self) -> u64 {
        self.launches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_common::SimTime;
    use strobe_sim::AxisLoopback;

    /// Emits a one-byte transaction holding the cycle number on every read-only phase.
    struct Ticker;

    impl ReceiveLogic for Ticker {
        fn resume(
            &mut self,
            cx: &mut SimContext<'_>,
            _rng: &mut StdRng,
            emit: &mut Emit<'_>,
        ) -> Result<Suspend, HarnessError> {
            match cx.phase() {
                crate::scheduler::Phase::RisingEdge => Ok(Suspend::ReadOnly),
                crate::scheduler::Phase::ReadOnly => {
                    emit(Transaction::from([cx.cycle() as u8]))?;
                    Ok(Suspend::RisingEdge)
                }
            }
        }
    }

    fn scheduler() -> Scheduler {
        let mut s = Scheduler::new(Box::new(AxisLoopback::new(8, false).unwrap())).unwrap();
        s.start_clock("clk", SimTime::from_ns(10)).unwrap();
        s
    }

    #[test]
    fn reports_each_transaction_once_in_order() {
        let mut s = scheduler();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut m = Monitor::new("m", Ticker, 0).with_receive_callback(Box::new(move |t| {
            sink.borrow_mut().push(t.as_bytes()[0]);
            Ok(())
        }));
        m.start(&mut s).unwrap();
        s.run_cycles(3).unwrap();
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
        assert_eq!(m.received(), 3);
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let mut s = scheduler();
        let mut m = Monitor::new("m", Ticker, 0);
        let a = m.start(&mut s).unwrap();
        let b = m.start(&mut s).unwrap();
        assert_eq!(a, b);
        assert_eq!(m.launches(), 1);
        assert_eq!(s.task_count(), 1);
    }

    #[test]
    fn stop_then_start_relaunches() {
        let mut s = scheduler();
        let mut m = Monitor::new("m", Ticker, 0);
        m.start(&mut s).unwrap();
        m.stop(&mut s).unwrap();
        assert!(!m.is_running(&s));
        m.start(&mut s).unwrap();
        assert_eq!(m.launches(), 2);
        assert!(m.is_running(&s));
    }

    #[test]
    fn callback_error_propagates() {
        let mut s = scheduler();
        let mut m = Monitor::new("m", Ticker, 0)
            .with_receive_callback(Box::new(|_| Err(HarnessError::runtime("sb", "mismatch"))));
        m.start(&mut s).unwrap();
        assert!(s.step().is_err());
    }
}
