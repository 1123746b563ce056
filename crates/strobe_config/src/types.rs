//! Configuration types deserialized from `strobe.toml`.
//!
//! The top level holds the run options consumed by the harness core. The
//! `[reset]`, `[stimulus]` and `[design]` tables drive the command-line tool's
//! reference-design runs and are optional everywhere.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use strobe_common::{SimTime, TimeUnit};

/// The complete run configuration.
///
/// Immutable once validated and handed to an environment; every component
/// reads it, none writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Clock period as an integer count of `timescale` units.
    #[serde(default = "default_clock_period")]
    pub clock_period: u64,
    /// Unit of `clock_period`.
    #[serde(default)]
    pub timescale: TimeUnit,
    /// Clock edges allowed after stimulus starts before the run times out.
    #[serde(default = "default_watchdog")]
    pub watchdog_timeout_cycles: u64,
    /// Probability that a driver holds `valid` low on any given edge.
    #[serde(default)]
    pub driver_stall_probability: f64,
    /// Probability that a monitor holds `ready` low on any given edge.
    #[serde(default)]
    pub monitor_stall_probability: f64,
    /// Idle edges before each transaction, drawn uniformly (inclusive).
    #[serde(default)]
    pub driver_pre_delay_range: DelayRange,
    /// Idle edges after each transaction, drawn uniformly (inclusive).
    #[serde(default)]
    pub driver_post_delay_range: DelayRange,
    /// Number of matches that constitutes a passing run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoreboard_expected_matches: Option<u64>,
    /// Master seed for every random source in the run. Drawn from entropy when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Reset sequencing.
    #[serde(default)]
    pub reset: ResetConfig,
    /// Random stimulus shape.
    #[serde(default)]
    pub stimulus: StimulusConfig,
    /// Reference design selection.
    #[serde(default)]
    pub design: DesignConfig,
}

fn default_clock_period() -> u64 {
    10
}

fn default_watchdog() -> u64 {
    1_000_000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            clock_period: default_clock_period(),
            timescale: TimeUnit::default(),
            watchdog_timeout_cycles: default_watchdog(),
            driver_stall_probability: 0.0,
            monitor_stall_probability: 0.0,
            driver_pre_delay_range: DelayRange::default(),
            driver_post_delay_range: DelayRange::default(),
            scoreboard_expected_matches: None,
            seed: None,
            reset: ResetConfig::default(),
            stimulus: StimulusConfig::default(),
            design: DesignConfig::default(),
        }
    }
}

impl RunConfig {
    /// The clock period converted to simulation time.
    pub fn clock_period_time(&self) -> SimTime {
        SimTime::from_units(self.clock_period, self.timescale)
    }
}

/// Reset sequencing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetConfig {
    /// Clock edges the reset is held asserted.
    #[serde(default = "default_reset_cycles")]
    pub cycles: u64,
    /// Whether reset is asserted by driving 1.
    #[serde(default = "default_true")]
    pub active_high: bool,
}

fn default_reset_cycles() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            cycles: default_reset_cycles(),
            active_high: true,
        }
    }
}

/// Shape of the random stimulus generated for each driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StimulusConfig {
    /// Transactions generated per driver.
    #[serde(default = "default_transactions")]
    pub transactions: u64,
    /// Minimum transaction length in bytes.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Maximum transaction length in bytes.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_transactions() -> u64 {
    10
}

fn default_min_length() -> usize {
    1
}

fn default_max_length() -> usize {
    64
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self {
            transactions: default_transactions(),
            min_length: default_min_length(),
            max_length: default_max_length(),
        }
    }
}

/// Which reference design the command-line tool instantiates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesignKind {
    /// Combinational slave-to-master wiring.
    Loopback,
    /// Registered FIFO (depth 2 is a skid buffer).
    #[default]
    Fifo,
}

impl fmt::Display for DesignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesignKind::Loopback => f.write_str("loopback"),
            DesignKind::Fifo => f.write_str("fifo"),
        }
    }
}

/// Reference design parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesignConfig {
    /// Design selection.
    #[serde(default)]
    pub kind: DesignKind,
    /// Width of `tdata` in bits.
    #[serde(default = "default_data_width")]
    pub data_width: u32,
    /// FIFO depth in words (ignored by the loopback).
    #[serde(default = "default_depth")]
    pub depth: usize,
    /// Whether the design exposes `tkeep` ports.
    #[serde(default = "default_true")]
    pub keep: bool,
}

fn default_data_width() -> u32 {
    32
}

fn default_depth() -> usize {
    2
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            kind: DesignKind::default(),
            data_width: default_data_width(),
            depth: default_depth(),
            keep: true,
        }
    }
}

/// An inclusive range of clock edges.
///
/// Accepts `[lo, hi]`, `"lo..=hi"` or a single integer (a fixed delay).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    /// Lower bound (inclusive).
    pub lo: u64,
    /// Upper bound (inclusive).
    pub hi: u64,
}

impl DelayRange {
    /// Creates a range `lo..=hi`.
    pub fn new(lo: u64, hi: u64) -> Self {
        Self { lo, hi }
    }

    /// A range that always yields `n`.
    pub fn fixed(n: u64) -> Self {
        Self { lo: n, hi: n }
    }

    /// Whether `n` lies within the range.
    pub fn contains(&self, n: u64) -> bool {
        self.lo <= n && n <= self.hi
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self { lo: 0, hi: 10 }
    }
}

impl fmt::Display for DelayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.lo, self.hi)
    }
}

impl Serialize for DelayRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DelayRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DelayRangeVisitor)
    }
}

struct DelayRangeVisitor;

impl<'de> Visitor<'de> for DelayRangeVisitor {
    type Value = DelayRange;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an integer, a `lo..=hi` string or a [lo, hi] pair")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(DelayRange::fixed(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(DelayRange::fixed)
            .map_err(|_| E::custom(format!("delay must be non-negative, got {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        let (lo, hi) = v
            .split_once("..=")
            .ok_or_else(|| E::custom(format!("expected `lo..=hi`, got `{v}`")))?;
        let parse = |s: &str| {
            s.trim()
                .parse::<u64>()
                .map_err(|_| E::custom(format!("invalid delay bound `{}` in `{v}`", s.trim())))
        };
        Ok(DelayRange::new(parse(lo)?, parse(hi)?))
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let lo: u64 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let hi: u64 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        if seq.next_element::<u64>()?.is_some() {
            return Err(de::Error::invalid_length(3, &self));
        }
        Ok(DelayRange::new(lo, hi))
    }
}
