//! The simulated-design boundary of the strobe verification harness.
//!
//! A design under test is anything implementing [`Design`]: it declares its
//! ports into a [`SignalBank`], updates sequential state on every rising clock
//! edge and recomputes combinational outputs while the bank settles. The
//! harness never looks inside a design; it only reads and writes the signals
//! the design declared.
//!
//! # Modules
//!
//! - `error`: Simulation error types
//! - `signal`: Signal storage, handles, immediate and scheduled writes
//! - `design`: The [`Design`] trait and the settle loop
//! - `designs`: Reference AXI4-Stream designs (loopback and FIFO)

#![warn(missing_docs)]

pub mod design;
pub mod designs;
pub mod error;
pub mod signal;

pub use design::{settle, Design, MAX_SETTLE_ITERATIONS};
pub use designs::{AxisFifo, AxisLoopback, AxisPorts};
pub use error::SimError;
pub use signal::{SignalBank, SignalHandle, SignalId, SignalState};
