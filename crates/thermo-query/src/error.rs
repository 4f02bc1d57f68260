//! Error types for the thermo-query crate.

use thermo_store::StoreError;
use thiserror::Error;

/// Errors returned by the query engine.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The resolution key is not one of the known streams.
    #[error("invalid resolution '{value}', expected one of raw, mean_60s, mean_1h, mean_1d")]
    InvalidResolution {
        /// The rejected key.
        value: String,
    },

    /// The lookback could not be parsed.
    #[error("invalid lookback '{value}': {reason}")]
    InvalidLookback {
        /// The rejected lookback.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The store failed the query.
    #[error(transparent)]
    Store(StoreError),
}

impl QueryError {
    /// Returns true when the store could not be reached.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_unavailable())
    }
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidResolution { value } => Self::InvalidResolution { value },
            StoreError::InvalidLookback { value, reason } => {
                Self::InvalidLookback { value, reason }
            }
            other => Self::Store(other),
        }
    }
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_are_lifted() {
        let err: QueryError = StoreError::InvalidResolution {
            value: "mean_5m".to_string(),
        }
        .into();
        assert!(matches!(err, QueryError::InvalidResolution { ref value } if value == "mean_5m"));
        assert!(err.to_string().contains("mean_5m"));
    }

    #[test]
    fn unavailable_is_kept() {
        let err: QueryError = StoreError::Unavailable {
            reason: "timeout".to_string(),
        }
        .into();
        assert!(err.is_unavailable());
        assert_eq!(err.to_string(), "store unavailable: timeout");
    }
}
