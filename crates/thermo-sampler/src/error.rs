//! Error types for the thermo-sampler crate.

use thiserror::Error;

/// Errors reported by a sensor source.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The sensor produced no usable value this time.
    #[error("sensor unavailable: {reason}")]
    Unavailable {
        /// Why no value could be read.
        reason: String,
    },
}

impl SensorError {
    /// Shorthand for an `Unavailable` error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Result type for sensor reads.
pub type Result<T> = std::result::Result<T, SensorError>;
