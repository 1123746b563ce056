//! Error types for the verification harness.
//!
//! Configuration problems are detected before or at construction time and
//! reported as [`ConfigurationError`]. Everything that can go wrong while a
//! run is in progress is a [`HarnessError`]. All of them abort the run; none
//! is retried.

use strobe_config::ConfigError;
use strobe_sim::SimError;

use crate::transaction::Transaction;

/// Errors caught while assembling a testbench, before any clock edge.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The role mapping does not match the protocol's role description.
    #[error(
        "interface '{interface}' binding mismatch: missing [{}], unexpected [{}]",
        .missing.join(", "),
        .unexpected.join(", ")
    )]
    Binding {
        /// The interface being bound.
        interface: String,
        /// Required roles with no mapping.
        missing: Vec<String>,
        /// Mapped roles the protocol does not declare.
        unexpected: Vec<String>,
    },

    /// A role maps to a signal name the design does not declare.
    #[error("role '{role}' maps to unknown signal '{signal}'")]
    UnknownSignal {
        /// The role being resolved.
        role: String,
        /// The signal name that was not found.
        signal: String,
    },

    /// A bound signal has the wrong width for its role.
    #[error("role '{role}' ({signal}) must be {expected} bits wide, got {actual}")]
    RoleWidth {
        /// The role.
        role: String,
        /// The bound signal.
        signal: String,
        /// The width the role requires.
        expected: u32,
        /// The signal's actual width.
        actual: u32,
    },

    /// The data signal width is not a positive multiple of 8 bits.
    #[error("data width must be a positive multiple of 8 bits, got {0}")]
    DataWidth(u32),

    /// A zero-length transaction was queued.
    #[error("transaction {index} is empty")]
    EmptyTransaction {
        /// Position in the loaded list.
        index: usize,
    },

    /// A transaction cannot be framed without a byte-lane qualifier.
    #[error(
        "transaction {index} is {len} bytes, not a multiple of the {bytes}-byte word, \
         and no keep signal is bound"
    )]
    UnalignedTransaction {
        /// Position in the loaded list.
        index: usize,
        /// Transaction length in bytes.
        len: usize,
        /// Word width in bytes.
        bytes: usize,
    },

    /// The run configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors that end a verification run.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The testbench was assembled incorrectly.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A component was used in a state that does not allow the operation.
    #[error("{component}: {reason}")]
    Runtime {
        /// The component that failed.
        component: String,
        /// What went wrong.
        reason: String,
    },

    /// The scoreboard saw an out-of-order or corrupted transaction.
    #[error(
        "scoreboard mismatch after {matched} match(es): expected [{expected}], received [{received}]"
    )]
    ScoreboardMismatch {
        /// Head of the expected queue.
        expected: Transaction,
        /// Head of the received queue.
        received: Transaction,
        /// Matches counted before the mismatch.
        matched: u64,
        /// Expected transactions still queued, including the mismatched head.
        pending_expected: usize,
        /// Received transactions still queued, including the mismatched head.
        pending_received: usize,
    },

    /// The watchdog expired before the scoreboard reached its target.
    #[error(
        "watchdog timeout after {cycles} cycles: {matched}/{target} matches \
         ({pending_expected} expected, {pending_received} received pending)"
    )]
    Timeout {
        /// Clock edges elapsed under the watchdog.
        cycles: u64,
        /// Matches counted.
        matched: u64,
        /// Matches required.
        target: u64,
        /// Expected transactions not yet matched.
        pending_expected: usize,
        /// Received transactions not yet matched.
        pending_received: usize,
    },

    /// The simulated design reported an error.
    #[error("simulation error: {0}")]
    Sim(#[from] SimError),
}

impl HarnessError {
    /// Shorthand for a [`HarnessError::Runtime`].
    pub fn runtime(component: impl Into<String>, reason: impl Into<String>) -> Self {
        HarnessError::Runtime {
            component: component.into(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for HarnessError {
    fn from(e: ConfigError) -> Self {
        HarnessError::Configuration(ConfigurationError::Config(e))
    }
}
