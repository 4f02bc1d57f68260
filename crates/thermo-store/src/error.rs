//! Error types for the thermo-store crate.

use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or did not answer in time.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Why the backend is considered unavailable.
        reason: String,
    },

    /// The backend answered but rejected the statement.
    #[error("backend rejected statement: {reason}")]
    Backend {
        /// The error reported by the backend.
        reason: String,
    },

    /// The requested database has not been initialized.
    #[error("database not found: {name}")]
    DatabaseNotFound {
        /// The database name that was looked up.
        name: String,
    },

    /// The resolution key is not one of the known streams.
    #[error("invalid resolution: {value}")]
    InvalidResolution {
        /// The rejected resolution key.
        value: String,
    },

    /// The lookback string could not be parsed.
    #[error("invalid lookback '{value}': {reason}")]
    InvalidLookback {
        /// The rejected lookback string.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A caller tried to write into a stream maintained by a rollup rule.
    #[error("stream {stream} is derived and cannot be written directly")]
    DerivedStreamWrite {
        /// The derived stream name.
        stream: String,
    },

    /// The reading cannot be stored (non-finite value).
    #[error("invalid reading: {reason}")]
    InvalidReading {
        /// Why the reading was rejected.
        reason: String,
    },

    /// The store handle was configured with unusable settings.
    #[error("invalid store configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },
}

impl StoreError {
    /// Returns true when the failure is a reachability problem rather than a
    /// rejected request.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unavailable() {
        let err = StoreError::Unavailable {
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "store unavailable: connection refused");
        assert!(err.is_unavailable());
    }

    #[test]
    fn error_display_invalid_resolution() {
        let err = StoreError::InvalidResolution {
            value: "mean_5m".to_string(),
        };
        assert_eq!(err.to_string(), "invalid resolution: mean_5m");
        assert!(!err.is_unavailable());
    }

    #[test]
    fn error_display_invalid_lookback() {
        let err = StoreError::InvalidLookback {
            value: "3x".to_string(),
            reason: "unknown unit 'x'".to_string(),
        };
        assert_eq!(err.to_string(), "invalid lookback '3x': unknown unit 'x'");
    }

    #[test]
    fn error_display_derived_stream_write() {
        let err = StoreError::DerivedStreamWrite {
            stream: "mean_1h".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "stream mean_1h is derived and cannot be written directly"
        );
    }

    #[test]
    fn error_display_database_not_found() {
        let err = StoreError::DatabaseNotFound {
            name: "sensor_data".to_string(),
        };
        assert_eq!(err.to_string(), "database not found: sensor_data");
    }
}
