//! The storage contract shared by every backend.

use crate::error::Result;
use crate::lookback::Lookback;
use crate::types::{Reading, Resolution};

/// A time-series store holding one database of resolution streams.
///
/// A handle is bound to a single database name at construction. Handles are
/// cheap to clone and safe to use from the sampler and any number of
/// concurrent queries at once; backends provide their own internal locking.
#[allow(async_fn_in_trait)]
pub trait Store: Send + Sync {
    /// The database this handle reads and writes.
    fn database(&self) -> &str;

    /// Creates the database, its retention policy and each rollup rule that
    /// does not exist yet, matching names exactly.
    ///
    /// Returns `true` when this call created anything. Calling it again is a
    /// no-op that returns `false`, and a setup left incomplete by an earlier
    /// failure is finished without duplicating what already exists.
    async fn ensure_initialized(&self) -> Result<bool>;

    /// Appends one reading to `stream`.
    ///
    /// Only [`Resolution::Raw`] accepts writes; derived streams are fed by
    /// their rollup rules.
    async fn append(&self, stream: Resolution, reading: Reading) -> Result<()>;

    /// Returns all readings of `stream` newer than `now - since`, oldest first.
    ///
    /// An empty window yields an empty vector, not an error.
    async fn query(&self, stream: Resolution, since: Lookback) -> Result<Vec<Reading>>;
}
