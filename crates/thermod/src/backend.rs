//! Runtime selection of the store backend.

use std::time::Duration;

use thermo_store::{
    InfluxStore, Lookback, MemoryStore, Reading, Resolution, Result as StoreResult, Store,
};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{BackendKind, StoreConfig};
use crate::error::{Result, ThermodError};

/// How often the embedded engine evaluates its rollups.
pub const ROLLUP_EVERY: Duration = Duration::from_secs(10);

/// The store picked by `[store].backend`.
#[derive(Debug, Clone)]
pub enum Backend {
    /// InfluxDB over HTTP.
    Influx(InfluxStore),
    /// The in-process engine.
    Memory(MemoryStore),
}

impl Backend {
    /// Builds the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the influx connection settings are unusable.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let backend = match config.backend {
            BackendKind::Influx => Self::Influx(InfluxStore::new(&config.influx())?),
            BackendKind::Memory => Self::Memory(MemoryStore::new(&config.database)),
        };
        info!(backend = backend.kind(), database = %config.database, "store selected");
        Ok(backend)
    }

    /// Short name of the backend.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Influx(_) => "influx",
            Self::Memory(_) => "memory",
        }
    }

    /// Whether other processes see what this handle writes.
    #[must_use]
    pub const fn is_shared(&self) -> bool {
        matches!(self, Self::Influx(_))
    }

    /// Rejects the in-process engine for `command`, whose data would be
    /// invisible to every other process.
    ///
    /// # Errors
    ///
    /// Returns `ThermodError::Config` for the memory backend.
    pub fn require_shared(&self, command: &str) -> Result<()> {
        if self.is_shared() {
            return Ok(());
        }
        Err(ThermodError::Config(format!(
            "the memory backend keeps data inside one process; \
             use `thermod run` instead of `thermod {command}`"
        )))
    }

    /// Starts the rollup worker when the engine runs in-process.
    ///
    /// InfluxDB evaluates its continuous queries itself, so nothing is
    /// started for it.
    #[must_use]
    pub fn spawn_rollups(&self) -> Option<JoinHandle<()>> {
        match self {
            Self::Influx(_) => None,
            Self::Memory(store) => Some(store.spawn_rollup_worker(ROLLUP_EVERY)),
        }
    }
}

impl Store for Backend {
    fn database(&self) -> &str {
        match self {
            Self::Influx(s) => s.database(),
            Self::Memory(s) => s.database(),
        }
    }

    async fn ensure_initialized(&self) -> StoreResult<bool> {
        match self {
            Self::Influx(s) => s.ensure_initialized().await,
            Self::Memory(s) => s.ensure_initialized().await,
        }
    }

    async fn append(&self, stream: Resolution, reading: Reading) -> StoreResult<()> {
        match self {
            Self::Influx(s) => s.append(stream, reading).await,
            Self::Memory(s) => s.append(stream, reading).await,
        }
    }

    async fn query(&self, stream: Resolution, since: Lookback) -> StoreResult<Vec<Reading>> {
        match self {
            Self::Influx(s) => s.query(stream, since).await,
            Self::Memory(s) => s.query(stream, since).await,
        }
    }
}
