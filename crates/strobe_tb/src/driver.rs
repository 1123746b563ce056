//! Protocol-agnostic transaction driver.
//!
//! A [`Driver`] owns a queue of transactions and a [`DriveLogic`] that knows
//! how to put one transaction on the wire. Once started it runs as a
//! scheduler task that, for each queued transaction:
//!
//! 1. idles for a random number of edges drawn from the pre-delay range;
//! 2. reports the transaction to the expect callback;
//! 3. runs the drive logic to completion;
//! 4. idles for a random number of edges drawn from the post-delay range.
//!
//! The task finishes when the queue is empty; it never refills.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strobe_config::{DelayRange, RunConfig};
use tracing::debug;

use crate::error::{ConfigurationError, HarnessError};
use crate::scheduler::{Phase, Process, Scheduler, SimContext, Suspend, TaskId};
use crate::scoreboard::TransactionCallback;
use crate::transaction::Transaction;

/// Progress reported by [`DriveLogic::resume`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriveStatus {
    /// The transaction is still on the wire; wait for the given point.
    Pending(Suspend),
    /// The transaction has been fully transferred and the bus released.
    Complete,
}

/// Protocol-specific drive behaviour plugged into a [`Driver`].
pub trait DriveLogic {
    /// Reads protocol options (stall probability, ...) from the run configuration.
    fn configure(&mut self, _config: &RunConfig) {}

    /// Rejects transactions the protocol cannot carry. Called at enqueue time.
    fn validate(&self, _index: usize, _transaction: &Transaction) -> Result<(), ConfigurationError> {
        Ok(())
    }

    /// Starts driving `transaction`. Always followed by [`resume`](Self::resume)
    /// in the rising-edge phase.
    fn begin(&mut self, transaction: &Transaction);

    /// Advances the handshake.
    fn resume(
        &mut self,
        cx: &mut SimContext<'_>,
        rng: &mut StdRng,
    ) -> Result<DriveStatus, HarnessError>;

    /// Returns the bus to idle when the drive task is killed mid-transaction.
    fn cancel(&mut self, _cx: &mut SimContext<'_>) -> Result<(), HarnessError> {
        Ok(())
    }
}

/// Object-safe driver interface used by the environment.
pub trait TransactionDriver {
    /// Driver name, for logs and lookups.
    fn name(&self) -> &str;

    /// Takes delay ranges and protocol options from the run configuration.
    fn set_config(&mut self, config: &RunConfig);

    /// Installs the callback told about each transaction before it is driven.
    fn set_expect_callback(&mut self, callback: TransactionCallback);

    /// Replaces the pending queue. Fails while the driver is running or if
    /// the protocol rejects a transaction.
    fn load(&mut self, transactions: Vec<Transaction>) -> Result<(), HarnessError>;

    /// Spawns the drive task. Fails if the queue is empty; returns the
    /// existing task while one is alive.
    fn start(&mut self, scheduler: &mut Scheduler) -> Result<TaskId, HarnessError>;

    /// Kills the drive task if alive.
    fn stop(&mut self, scheduler: &mut Scheduler) -> Result<(), HarnessError>;

    /// Whether the drive task is alive.
    fn is_running(&self, scheduler: &Scheduler) -> bool;

    /// Transactions not yet dequeued.
    fn pending(&self) -> usize;

    /// Transactions fully driven.
    fn driven(&self) -> u64;

    /// How many drive tasks have been spawned.
    fn launches(&self) -> u64;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DriveState {
    Next,
    PreDelay(u64),
    Driving,
    PostDelay(u64),
}

struct DriverCore<L> {
    name: String,
    logic: L,
    queue: VecDeque<Transaction>,
    expect: Option<TransactionCallback>,
    rng: StdRng,
    pre_delay: DelayRange,
    post_delay: DelayRange,
    state: DriveState,
    active: bool,
    driven: u64,
}

impl<L: DriveLogic> DriverCore<L> {
    fn resume(&mut self, cx: &mut SimContext<'_>) -> Result<Suspend, HarnessError> {
        loop {
            match self.state {
                DriveState::Next => {
                    if self.queue.is_empty() {
                        debug!(driver = %self.name, driven = self.driven, "queue drained");
                        self.active = false;
                        return Ok(Suspend::Finished);
                    }
                    let delay = self.draw(self.pre_delay);
                    self.state = DriveState::PreDelay(delay);
                }
                DriveState::PreDelay(0) => {
                    if cx.phase() == Phase::ReadOnly {
                        return Ok(Suspend::RisingEdge);
                    }
                    let Some(transaction) = self.queue.pop_front() else {
                        self.state = DriveState::Next;
                        continue;
                    };
                    debug!(driver = %self.name, cycle = cx.cycle(), %transaction, "driving");
                    if let Some(expect) = self.expect.as_mut() {
                        expect(&transaction)?;
                    }
                    self.logic.begin(&transaction);
                    self.state = DriveState::Driving;
                }
                DriveState::PreDelay(n) => {
                    self.state = DriveState::PreDelay(n - 1);
                    return Ok(Suspend::RisingEdge);
                }
                DriveState::Driving => match self.logic.resume(cx, &mut self.rng)? {
                    DriveStatus::Pending(suspend) => return Ok(suspend),
                    DriveStatus::Complete => {
                        self.driven += 1;
                        let delay = self.draw(self.post_delay);
                        self.state = DriveState::PostDelay(delay);
                    }
                },
                DriveState::PostDelay(0) => self.state = DriveState::Next,
                DriveState::PostDelay(n) => {
                    self.state = DriveState::PostDelay(n - 1);
                    return Ok(Suspend::RisingEdge);
                }
            }
        }
    }

    fn draw(&mut self, range: DelayRange) -> u64 {
        self.rng.gen_range(range.lo..=range.hi)
    }
}

struct DriveTask<L> {
    name: String,
    core: Rc<RefCell<DriverCore<L>>>,
}

impl<L: DriveLogic> Process for DriveTask<L> {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, cx: &mut SimContext<'_>) -> Result<Suspend, HarnessError> {
        let mut core = self.core.borrow_mut();
        let result = core.resume(cx);
        if result.is_err() {
            // The scheduler drops a failed task without cancelling it.
            core.state = DriveState::Next;
            core.active = false;
        }
        result
    }

    fn cancel(&mut self, cx: &mut SimContext<'_>) -> Result<(), HarnessError> {
        let mut core = self.core.borrow_mut();
        if core.state == DriveState::Driving {
            core.logic.cancel(cx)?;
        }
        core.state = DriveState::Next;
        core.active = false;
        Ok(())
    }
}

/// A transaction driver parameterized by its protocol logic.
pub struct Driver<L> {
    name: String,
    core: Rc<RefCell<DriverCore<L>>>,
    task: Option<TaskId>,
    launches: u64,
}

impl<L: DriveLogic + 'static> Driver<L> {
    /// Creates an idle driver whose random draws are seeded with `seed`.
    ///
    /// Delay ranges default to `0..=10` until [`set_config`](TransactionDriver::set_config).
    pub fn new(name: impl Into<String>, logic: L, seed: u64) -> Self {
        let name = name.into();
        let defaults = RunConfig::default();
        Self {
            core: Rc::new(RefCell::new(DriverCore {
                name: name.clone(),
                logic,
                queue: VecDeque::new(),
                expect: None,
                rng: StdRng::seed_from_u64(seed),
                pre_delay: defaults.driver_pre_delay_range,
                post_delay: defaults.driver_post_delay_range,
                state: DriveState::Next,
                active: false,
                driven: 0,
            })),
            name,
            task: None,
            launches: 0,
        }
    }

    /// Builder form of [`set_expect_callback`](TransactionDriver::set_expect_callback).
    pub fn with_expect_callback(self, callback: TransactionCallback) -> Self {
        self.core.borrow_mut().expect = Some(callback);
        self
    }

    /// Runs `f` with access to the protocol logic.
    pub fn with_logic<R>(&self, f: impl FnOnce(&L) -> R) -> R {
        f(&self.core.borrow().logic)
    }

    fn component(&self) -> String {
        format!("driver '{}'", self.name)
    }
}

impl<L: DriveLogic + 'static> TransactionDriver for Driver<L> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_config(&mut self, config: &RunConfig) {
        let mut core = self.core.borrow_mut();
        core.pre_delay = config.driver_pre_delay_range;
        core.post_delay = config.driver_post_delay_range;
        core.logic.configure(config);
    }

    fn set_expect_callback(&mut self, callback: TransactionCallback) {
        self.core.borrow_mut().expect = Some(callback);
    }

    fn load(&mut self, transactions: Vec<Transaction>) -> Result<(), HarnessError> {
        if self.core.borrow().active {
            return Err(HarnessError::runtime(
                self.component(),
                "cannot load while running",
            ));
        }
        let mut core = self.core.borrow_mut();
        for (index, transaction) in transactions.iter().enumerate() {
            core.logic.validate(index, transaction)?;
        }
        debug!(driver = %self.name, count = transactions.len(), "queue loaded");
        core.queue = transactions.into();
        core.state = DriveState::Next;
        Ok(())
    }

    fn start(&mut self, scheduler: &mut Scheduler) -> Result<TaskId, HarnessError> {
        if let Some(id) = self.task {
            if scheduler.is_alive(id) {
                return Ok(id);
            }
            self.task = None;
        }
        if self.core.borrow().queue.is_empty() {
            return Err(HarnessError::runtime(
                self.component(),
                "transaction queue not loaded",
            ));
        }
        {
            let mut core = self.core.borrow_mut();
            core.state = DriveState::Next;
            core.active = true;
        }
        let id = scheduler.spawn(DriveTask {
            name: self.component(),
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
        self.core.borrow_mut().active = false;
        Ok(())
    }

    fn is_running(&self, scheduler: &Scheduler) -> bool {
        self.task.is_some_and(|id| scheduler.is_alive(id))
    }

    fn pending(&self) -> usize {
        self.core.borrow().queue.len()
    }

    fn driven(&self) -> u64 {
        self.core.borrow().driven
    }

    fn launches(&self) -> u64 {
        self.launches
    }
}
