//! Single-threaded cooperative scheduler driving a design one clock edge at a time.
//!
//! Components are [`Process`] state machines. Each call to
//! [`Process::resume`] runs until the component needs to wait and returns the
//! [`Suspend`] point it waits for. Per rising edge, [`Scheduler::step`]:
//!
//! 1. raises the clock and lets the design update its sequential state;
//! 2. settles the design (commits writes scheduled before the edge);
//! 3. resumes every task waiting on [`Suspend::RisingEdge`], in spawn order;
//! 4. commits the writes those tasks scheduled and settles the design;
//! 5. resumes every task waiting on [`Suspend::ReadOnly`], in spawn order;
//! 6. lowers the clock.
//!
//! Writes scheduled during the read-only phase are committed after the next
//! edge, so the design never samples them on the edge that follows the
//! read. A task that asks for [`Suspend::ReadOnly`] while already in the
//! read-only phase waits for the next edge's read-only phase.

use std::collections::BTreeMap;
use std::fmt;

use strobe_common::{Bits, SimTime};
use strobe_sim::{settle, Design, SignalBank, SignalHandle, SimError};
use tracing::{debug, warn};

use crate::error::HarnessError;

/// The point a task waits for before it is resumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Suspend {
    /// Resume right after the next rising clock edge, before signals settle.
    RisingEdge,
    /// Resume once the design has settled after the current or next edge.
    ReadOnly,
    /// The task is done and is removed from the scheduler.
    Finished,
}

/// The scheduling phase a task is being resumed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Right after the rising edge. Scheduled writes commit at the next settle.
    RisingEdge,
    /// After settle. Signals are stable for the rest of the cycle.
    ReadOnly,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::RisingEdge => f.write_str("rising-edge"),
            Phase::ReadOnly => f.write_str("read-only"),
        }
    }
}

/// Identifies a spawned task. Lower IDs were spawned earlier and resume first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// The raw spawn index.
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// A component's view of the simulation while it is being resumed.
pub struct SimContext<'a> {
    signals: &'a mut SignalBank,
    cycle: u64,
    time: SimTime,
    phase: Phase,
}

impl<'a> SimContext<'a> {
    /// Creates a context over `signals`. Used by the scheduler and by unit tests
    /// that exercise a process without a design.
    pub fn new(signals: &'a mut SignalBank, cycle: u64, time: SimTime, phase: Phase) -> Self {
        Self {
            signals,
            cycle,
            time,
            phase,
        }
    }

    /// Rising edges elapsed since simulation start.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Simulation time of the current rising edge.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// The phase being executed.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Read access to every signal.
    pub fn signals(&self) -> &SignalBank {
        self.signals
    }

    /// The current value of a signal.
    pub fn get(&self, handle: &SignalHandle) -> &Bits {
        self.signals.value(handle)
    }

    /// The current value of a signal as a boolean.
    pub fn get_bool(&self, handle: &SignalHandle) -> bool {
        self.signals.get_bool(handle)
    }

    /// The current value of a signal as an integer, if it fits in 64 bits.
    pub fn get_u64(&self, handle: &SignalHandle) -> Option<u64> {
        self.signals.get_u64(handle)
    }

    /// Schedules a write, visible after the next settle.
    pub fn set(&mut self, handle: &SignalHandle, value: Bits) -> Result<(), SimError> {
        self.signals.schedule(handle, value)
    }

    /// Schedules an integer write.
    pub fn set_u64(&mut self, handle: &SignalHandle, value: u64) -> Result<(), SimError> {
        self.signals.schedule_u64(handle, value)
    }

    /// Schedules a boolean write.
    pub fn set_bool(&mut self, handle: &SignalHandle, value: bool) -> Result<(), SimError> {
        self.signals.schedule_bool(handle, value)
    }

    /// Writes a value immediately.
    pub fn deposit(&mut self, handle: &SignalHandle, value: Bits) -> Result<(), SimError> {
        self.signals.deposit(handle, value)
    }

    /// Writes an integer immediately.
    pub fn deposit_u64(&mut self, handle: &SignalHandle, value: u64) -> Result<(), SimError> {
        self.signals.deposit_u64(handle, value)
    }

    /// Writes a boolean immediately.
    pub fn deposit_bool(&mut self, handle: &SignalHandle, value: bool) -> Result<(), SimError> {
        self.signals.deposit_bool(handle, value)
    }
}

/// A cooperative task resumed by the [`Scheduler`].
pub trait Process {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Runs until the next suspension point.
    ///
    /// A freshly spawned task is first resumed in the rising-edge phase of
    /// the next clock edge.
    fn resume(&mut self, cx: &mut SimContext<'_>) -> Result<Suspend, HarnessError>;

    /// Called when the task is killed at a suspension point.
    fn cancel(&mut self, _cx: &mut SimContext<'_>) -> Result<(), HarnessError> {
        Ok(())
    }
}

struct Task {
    process: Box<dyn Process>,
    waiting: Phase,
}

#[derive(Clone)]
struct Clock {
    handle: SignalHandle,
    half_period_fs: u64,
}

/// Owns the design, its signals, the clock and all tasks.
pub struct Scheduler {
    design: Box<dyn Design>,
    signals: SignalBank,
    clock: Option<Clock>,
    tasks: BTreeMap<TaskId, Task>,
    next_task: u64,
    cycle: u64,
    time: SimTime,
    initialized: bool,
}

impl Scheduler {
    /// Elaborates `design` into a fresh signal bank.
    pub fn new(mut design: Box<dyn Design>) -> Result<Self, HarnessError> {
        let mut signals = SignalBank::new();
        design.elaborate(&mut signals)?;
        debug!(
            design = design.name(),
            signals = signals.len(),
            "design elaborated"
        );
        Ok(Self {
            design,
            signals,
            clock: None,
            tasks: BTreeMap::new(),
            next_task: 0,
            cycle: 0,
            time: SimTime::zero(),
            initialized: false,
        })
    }

    /// The design's name.
    pub fn design_name(&self) -> &str {
        self.design.name()
    }

    /// Read access to every signal.
    pub fn signals(&self) -> &SignalBank {
        &self.signals
    }

    /// Write access to the signal bank, for setting initial values before
    /// the first edge.
    pub fn signals_mut(&mut self) -> &mut SignalBank {
        &mut self.signals
    }

    /// Resolves a signal by name.
    pub fn handle(&self, name: &str) -> Result<SignalHandle, HarnessError> {
        Ok(self.signals.handle(name)?)
    }

    /// Starts toggling the one-bit signal `name` with the given period.
    ///
    /// The clock starts low; rising edge `n` happens at `n * period`.
    pub fn start_clock(&mut self, name: &str, period: SimTime) -> Result<(), HarnessError> {
        let handle = self.handle(name)?;
        if handle.width() != 1 {
            return Err(HarnessError::runtime(
                "scheduler",
                format!("clock '{name}' must be 1 bit wide, got {}", handle.width()),
            ));
        }
        if period.fs < 2 {
            return Err(HarnessError::runtime(
                "scheduler",
                format!("clock period {period} is too short"),
            ));
        }
        debug!(clock = name, %period, "clock started");
        self.clock = Some(Clock {
            handle,
            half_period_fs: period.fs / 2,
        });
        Ok(())
    }

    /// Adds a task. It is first resumed at the next rising edge.
    pub fn spawn(&mut self, process: impl Process + 'static) -> TaskId {
        self.spawn_boxed(Box::new(process))
    }

    /// Adds an already boxed task.
    pub fn spawn_boxed(&mut self, process: Box<dyn Process>) -> TaskId {
        let id = TaskId(self.next_task);
        self.next_task += 1;
        debug!(task = process.name(), %id, cycle = self.cycle, "task spawned");
        self.tasks.insert(
            id,
            Task {
                process,
                waiting: Phase::RisingEdge,
            },
        );
        id
    }

    /// Removes a task, running its cancel hook. Returns false if it had already finished.
    ///
    /// Writes made by the hook are scheduled and take effect at the next settle.
    pub fn kill(&mut self, id: TaskId) -> Result<bool, HarnessError> {
        let Some(mut task) = self.tasks.remove(&id) else {
            return Ok(false);
        };
        debug!(task = task.process.name(), %id, cycle = self.cycle, "task killed");
        let mut cx = SimContext::new(&mut self.signals, self.cycle, self.time, task.waiting);
        task.process.cancel(&mut cx)?;
        Ok(true)
    }

    /// Whether the task is still scheduled.
    pub fn is_alive(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Number of live tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Rising edges elapsed.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Time of the most recent rising edge.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Settles the design at time zero so outputs reflect the reset-free state.
    ///
    /// Runs automatically before the first edge; calling it again is a no-op.
    pub fn initialize(&mut self) -> Result<(), HarnessError> {
        if !self.initialized {
            settle(self.design.as_mut(), &mut self.signals, 0)?;
            self.initialized = true;
        }
        Ok(())
    }

    /// Advances the simulation by one clock cycle.
    pub fn step(&mut self) -> Result<(), HarnessError> {
        self.initialize()?;
        let Some(clock) = self.clock.clone() else {
            return Err(HarnessError::runtime("scheduler", "clock not started"));
        };

        self.cycle += 1;
        self.time = SimTime::from_fs(
            self.cycle
                .saturating_mul(clock.half_period_fs)
                .saturating_mul(2),
        );
        self.signals.deposit_bool(&clock.handle, true)?;
        self.design.clock_edge(&mut self.signals)?;
        settle(self.design.as_mut(), &mut self.signals, self.cycle)?;

        self.resume_phase(Phase::RisingEdge)?;
        settle(self.design.as_mut(), &mut self.signals, self.cycle)?;
        self.resume_phase(Phase::ReadOnly)?;

        self.signals.deposit_bool(&clock.handle, false)?;
        Ok(())
    }

    /// Steps until `done` holds or `max_cycles` edges have elapsed.
    ///
    /// `done` is checked before every edge. Returns the number of edges
    /// stepped when it held, or `None` if the budget ran out first.
    pub fn run_until(
        &mut self,
        max_cycles: u64,
        mut done: impl FnMut(&Scheduler) -> bool,
    ) -> Result<Option<u64>, HarnessError> {
        let mut elapsed = 0;
        loop {
            if done(self) {
                return Ok(Some(elapsed));
            }
            if elapsed == max_cycles {
                return Ok(None);
            }
            self.step()?;
            elapsed += 1;
        }
    }

    /// Steps exactly `cycles` edges.
    pub fn run_cycles(&mut self, cycles: u64) -> Result<(), HarnessError> {
        for _ in 0..cycles {
            self.step()?;
        }
        Ok(())
    }

    fn resume_phase(&mut self, phase: Phase) -> Result<(), HarnessError> {
        let ready: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|(_, task)| task.waiting == phase)
            .map(|(id, _)| *id)
            .collect();

        for id in ready {
            let Some(task) = self.tasks.get_mut(&id) else {
                continue;
            };
            let mut cx = SimContext::new(&mut self.signals, self.cycle, self.time, phase);
            let next = match task.process.resume(&mut cx) {
                Ok(next) => next,
                Err(e) => {
                    warn!(task = task.process.name(), %id, cycle = self.cycle, %phase, "task failed: {e}");
                    self.tasks.remove(&id);
                    return Err(e);
                }
            };
            match next {
                Suspend::RisingEdge => task.waiting = Phase::RisingEdge,
                Suspend::ReadOnly => task.waiting = Phase::ReadOnly,
                Suspend::Finished => {
                    debug!(task = task.process.name(), %id, cycle = self.cycle, "task finished");
                    self.tasks.remove(&id);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("design", &self.design.name())
            .field("cycle", &self.cycle)
            .field("time", &self.time)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}
