//! Simulation error types for the design boundary.
//!
//! Every failure while declaring, reading, writing or settling design signals
//! is a variant of [`SimError`].

/// Errors that can occur while building or running a simulated design.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// No signal with the given name exists in the design.
    #[error("unknown signal '{name}'")]
    UnknownSignal {
        /// The name that failed to resolve.
        name: String,
    },

    /// A design declared the same signal name twice.
    #[error("signal '{name}' declared more than once")]
    DuplicateSignal {
        /// The duplicated name.
        name: String,
    },

    /// A value of the wrong width was written to a signal.
    #[error("width mismatch on '{signal}': expected {expected} bits, got {actual}")]
    WidthMismatch {
        /// The signal written.
        signal: String,
        /// The signal's declared width.
        expected: u32,
        /// The width of the written value.
        actual: u32,
    },

    /// An integer written to a signal does not fit its width.
    #[error("value {value:#x} out of range for '{signal}' ({width} bits)")]
    ValueOutOfRange {
        /// The signal written.
        signal: String,
        /// The rejected value.
        value: u64,
        /// The signal's declared width.
        width: u32,
    },

    /// Combinational evaluation did not converge, indicating a combinational loop.
    #[error("settle limit exceeded at cycle {cycle} (max {max_iterations} iterations)")]
    SettleLimit {
        /// The clock cycle where the limit was hit.
        cycle: u64,
        /// The maximum number of evaluation passes allowed.
        max_iterations: u32,
    },

    /// A design was constructed with parameters it cannot implement.
    #[error("invalid design parameters: {reason}")]
    InvalidDesign {
        /// Description of the rejected parameter.
        reason: String,
    },
}
