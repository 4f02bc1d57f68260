//! Error types for thermod.

use thermo_query::QueryError;
use thermo_store::StoreError;
use thiserror::Error;

/// Errors that can occur while running the daemon.
#[derive(Debug, Error)]
pub enum ThermodError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Query error.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Output could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for daemon operations.
pub type Result<T> = std::result::Result<T, ThermodError>;
