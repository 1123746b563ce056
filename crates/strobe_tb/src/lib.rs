//! Transaction-level verification harness for clocked designs.
//!
//! The harness drives generated transactions into a design through a
//! [`Driver`], reconstructs what comes out with a [`Monitor`], and checks the
//! two streams against each other in order with a [`Scoreboard`]. An
//! [`Environment`] sequences the clock, reset, stimulus and watchdog.
//!
//! Everything runs on a single-threaded cooperative [`Scheduler`]: each
//! component is a [`Process`] state machine that suspends until the next
//! rising clock edge or until the design has settled.
//!
//! The protocol-specific parts live behind [`DriveLogic`] and
//! [`ReceiveLogic`]; [`axi4s`] implements them for AXI4-Stream.

#![warn(missing_docs)]

pub mod axi4s;
pub mod binding;
pub mod driver;
pub mod env;
pub mod error;
pub mod monitor;
pub mod reset;
pub mod scheduler;
pub mod scoreboard;
pub mod stimulus;
pub mod transaction;

pub use axi4s::{AxiStreamBus, AxiStreamDriveLogic, AxiStreamReceiveLogic, AXI4_STREAM_ROLES};
pub use binding::{InterfaceBinding, ProtocolRoles};
pub use driver::{DriveLogic, DriveStatus, Driver, TransactionDriver};
pub use env::{Environment, RunReport};
pub use error::{ConfigurationError, HarnessError};
pub use monitor::{Emit, Monitor, ReceiveLogic, TransactionMonitor};
pub use reset::ResetSequence;
pub use scheduler::{Phase, Process, Scheduler, SimContext, Suspend, TaskId};
pub use scoreboard::{Scoreboard, SharedScoreboard, TransactionCallback};
pub use stimulus::{RandomStimulus, StimulusGenerator};
pub use transaction::Transaction;
