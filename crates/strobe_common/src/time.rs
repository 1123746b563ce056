//! Simulation time with femtosecond precision and the `timescale` unit.
//!
//! [`SimTime`] is the wall-clock time of the simulated clock. [`TimeUnit`]
//! scales a configured clock period (an integer count of units) into
//! femtoseconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;
/// Femtoseconds per second.
pub const FS_PER_S: u64 = 1_000_000_000_000_000;

/// A simulation time point with femtosecond resolution.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SimTime {
    /// Simulation time in femtoseconds.
    pub fs: u64,
}

impl SimTime {
    /// Time zero.
    pub fn zero() -> Self {
        Self { fs: 0 }
    }

    /// Creates a time from a femtosecond value.
    pub fn from_fs(fs: u64) -> Self {
        Self { fs }
    }

    /// Creates a time from a nanosecond value.
    pub fn from_ns(ns: u64) -> Self {
        Self { fs: ns * FS_PER_NS }
    }

    /// Creates a time from a count of `unit`s.
    pub fn from_units(count: u64, unit: TimeUnit) -> Self {
        Self {
            fs: count.saturating_mul(unit.to_fs()),
        }
    }

    /// Returns this time advanced by `delta_fs` femtoseconds (saturating).
    pub fn advance(&self, delta_fs: u64) -> Self {
        Self {
            fs: self.fs.saturating_add(delta_fs),
        }
    }

    /// Converts to nanoseconds (truncated).
    pub fn to_ns(&self) -> u64 {
        self.fs / FS_PER_NS
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs = self.fs;
        if fs == 0 {
            write!(f, "0 fs")
        } else if fs % FS_PER_MS == 0 {
            write!(f, "{} ms", fs / FS_PER_MS)
        } else if fs % FS_PER_US == 0 {
            write!(f, "{} us", fs / FS_PER_US)
        } else if fs % FS_PER_NS == 0 {
            write!(f, "{} ns", fs / FS_PER_NS)
        } else if fs % FS_PER_PS == 0 {
            write!(f, "{} ps", fs / FS_PER_PS)
        } else {
            write!(f, "{fs} fs")
        }
    }
}

/// The unit in which clock periods are expressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Femtoseconds.
    Fs,
    /// Picoseconds.
    Ps,
    /// Nanoseconds.
    #[default]
    Ns,
    /// Microseconds.
    Us,
    /// Milliseconds.
    Ms,
    /// Seconds.
    S,
}

impl TimeUnit {
    /// Femtoseconds in one unit.
    pub fn to_fs(self) -> u64 {
        match self {
            TimeUnit::Fs => 1,
            TimeUnit::Ps => FS_PER_PS,
            TimeUnit::Ns => FS_PER_NS,
            TimeUnit::Us => FS_PER_US,
            TimeUnit::Ms => FS_PER_MS,
            TimeUnit::S => FS_PER_S,
        }
    }

    /// The lowercase suffix used in config files and display.
    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Fs => "fs",
            TimeUnit::Ps => "ps",
            TimeUnit::Ns => "ns",
            TimeUnit::Us => "us",
            TimeUnit::Ms => "ms",
            TimeUnit::S => "s",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a recognized time unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown time unit `{0}` (expected fs, ps, ns, us, ms or s)")]
pub struct ParseTimeUnitError(pub String);

impl FromStr for TimeUnit {
    type Err = ParseTimeUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fs" => Ok(TimeUnit::Fs),
            "ps" => Ok(TimeUnit::Ps),
            "ns" => Ok(TimeUnit::Ns),
            "us" => Ok(TimeUnit::Us),
            "ms" => Ok(TimeUnit::Ms),
            "s" => Ok(TimeUnit::S),
            _ => Err(ParseTimeUnitError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_default_agree() {
        assert_eq!(SimTime::default(), SimTime::zero());
        assert_eq!(SimTime::zero().fs, 0);
    }

    #[test]
    fn from_units_scales() {
        assert_eq!(SimTime::from_units(10, TimeUnit::Ns), SimTime::from_ns(10));
        assert_eq!(SimTime::from_units(3, TimeUnit::Ps).fs, 3_000);
        assert_eq!(SimTime::from_units(1, TimeUnit::S).fs, FS_PER_S);
    }

    #[test]
    fn from_units_saturates() {
        assert_eq!(SimTime::from_units(u64::MAX, TimeUnit::Ns).fs, u64::MAX);
    }

    #[test]
    fn advance_accumulates() {
        let t = SimTime::zero().advance(5 * FS_PER_NS).advance(5 * FS_PER_NS);
        assert_eq!(t.to_ns(), 10);
    }

    #[test]
    fn to_ns_truncates() {
        assert_eq!(SimTime::from_fs(1_500_000).to_ns(), 1);
    }

    #[test]
    fn ordering() {
        assert!(SimTime::from_ns(1) < SimTime::from_ns(2));
    }

    #[test]
    fn display_picks_largest_exact_unit() {
        assert_eq!(SimTime::zero().to_string(), "0 fs");
        assert_eq!(SimTime::from_ns(10).to_string(), "10 ns");
        assert_eq!(SimTime::from_fs(500 * FS_PER_PS).to_string(), "500 ps");
        assert_eq!(SimTime::from_fs(5 * FS_PER_US).to_string(), "5 us");
        assert_eq!(SimTime::from_fs(2 * FS_PER_MS).to_string(), "2 ms");
        assert_eq!(SimTime::from_fs(1500).to_string(), "1500 fs");
    }

    #[test]
    fn unit_parse() {
        assert_eq!("ns".parse::<TimeUnit>().unwrap(), TimeUnit::Ns);
        assert_eq!(" PS ".parse::<TimeUnit>().unwrap(), TimeUnit::Ps);
        assert_eq!("s".parse::<TimeUnit>().unwrap(), TimeUnit::S);
        let err = "min".parse::<TimeUnit>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown time unit `min` (expected fs, ps, ns, us, ms or s)"
        );
    }

    #[test]
    fn unit_default_is_ns() {
        assert_eq!(TimeUnit::default(), TimeUnit::Ns);
        assert_eq!(TimeUnit::Us.to_string(), "us");
    }

    #[test]
    fn unit_serde_lowercase() {
        let json = serde_json::to_string(&TimeUnit::Ms).unwrap();
        assert_eq!(json, "\"ms\"");
        let back: TimeUnit = serde_json::from_str("\"fs\"").unwrap();
        assert_eq!(back, TimeUnit::Fs);
    }
}
