//! Shared foundational types used across the strobe verification harness.
//!
//! This crate provides the fixed-width unsigned bit vector used for every signal
//! value, and the simulation time and timescale types.

#![warn(missing_docs)]

pub mod bits;
pub mod time;

pub use bits::{Bits, BitsError};
pub use time::{ParseTimeUnitError, SimTime, TimeUnit};
