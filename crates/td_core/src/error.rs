//! Error types for the balance simulation.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Invalid or inconsistent configuration. The run cannot start.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A stat catalog has no entries, so no fallback is possible.
    #[error("Configuration error: {kind} catalog is empty")]
    EmptyCatalog {
        /// Catalog kind ("building" or "enemy").
        kind: &'static str,
    },

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParse {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// A stat record violates its invariants.
    #[error("Invalid stat '{field}' = {value} for '{key}'")]
    InvalidStat {
        /// Type key of the offending record.
        key: String,
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Tried to spend more money than the session holds.
    #[error("Insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        /// Amount required.
        required: u32,
        /// Amount available.
        available: u32,
    },

    /// NaN, infinite or out-of-range coordinates.
    #[error("Invalid position ({x}, {y})")]
    InvalidPosition {
        /// X coordinate as given.
        x: f64,
        /// Y coordinate as given.
        y: f64,
    },

    /// The configured wave set was never registered with the runner.
    #[error("Unknown wave set: {0}")]
    UnknownWaveSet(String),
}

impl SimError {
    /// Whether this error belongs to the configuration family.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::EmptyCatalog { .. }
                | Self::DataParse { .. }
                | Self::InvalidStat { .. }
                | Self::UnknownWaveSet(_)
        )
    }
}
