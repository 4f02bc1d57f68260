//! The query engine behind the dashboard.

use chrono_tz::Tz;
use thermo_store::Store;
use tracing::debug;

use crate::error::Result;
use crate::series::Series;
use crate::window::QueryWindow;

/// Timezone readings are shown in unless configured otherwise.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Berlin;

/// Reads windows of a stream and shapes them for display.
///
/// Holds its own store handle; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct QueryEngine<S> {
    store: S,
    timezone: Tz,
}

impl<S: Store> QueryEngine<S> {
    /// Creates an engine showing times in [`DEFAULT_TIMEZONE`].
    pub const fn new(store: S) -> Self {
        Self {
            store,
            timezone: DEFAULT_TIMEZONE,
        }
    }

    /// Sets the display timezone.
    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// The display timezone.
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Queries `window` and converts it to a local-time series.
    ///
    /// # Errors
    ///
    /// Store failures are passed through; an empty window is not an error.
    pub async fn series(&self, window: &QueryWindow) -> Result<Series> {
        let readings = self.store.query(window.resolution, window.lookback).await?;
        let series =
            Series::from_readings(&readings, self.timezone, window.resolution, window.lookback);

        debug!(
            resolution = %window.resolution,
            lookback = %window.lookback,
            points = series.len(),
            "served series"
        );
        Ok(series)
    }

    /// Parses dashboard parameters and queries them.
    ///
    /// The parameters are validated before the store is touched.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidResolution` or
    /// `QueryError::InvalidLookback` for bad parameters, and store failures
    /// otherwise.
    pub async fn get_series(&self, resolution: &str, lookback: &str) -> Result<Series> {
        let window = QueryWindow::parse(resolution, lookback)?;
        self.series(&window).await
    }
}
