//! The parameters of one query.

use serde::{Deserialize, Serialize};
use thermo_store::{Lookback, Resolution};

use crate::error::Result;

/// Which stream to read and how far back.
///
/// Built once from caller input and passed explicitly to every query; there
/// is no shared default that queries fall back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    /// Stream to read.
    pub resolution: Resolution,
    /// Window counted back from query time.
    pub lookback: Lookback,
}

impl QueryWindow {
    /// Creates a window from typed parts.
    #[must_use]
    pub const fn new(resolution: Resolution, lookback: Lookback) -> Self {
        Self {
            resolution,
            lookback,
        }
    }

    /// Parses a window from dashboard parameters such as `("mean_60s", "30d")`.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidResolution` for an unknown stream key and
    /// `QueryError::InvalidLookback` for a malformed lookback.
    pub fn parse(resolution: &str, lookback: &str) -> Result<Self> {
        let resolution: Resolution = resolution.parse()?;
        let lookback: Lookback = lookback.parse()?;
        Ok(Self::new(resolution, lookback))
    }
}

impl Default for QueryWindow {
    /// One day of minute means, the dashboard's opening view.
    fn default() -> Self {
        Self::new(Resolution::Mean60s, Lookback::one_day())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use test_case::test_case;

    #[test_case("raw", "1h")]
    #[test_case("mean_60s", "1d")]
    #[test_case("mean_1h", "30d")]
    #[test_case("mean_1d", "52w")]
    fn parses_dashboard_choices(resolution: &str, lookback: &str) {
        let window = QueryWindow::parse(resolution, lookback).unwrap();
        assert_eq!(window.resolution.as_str(), resolution);
        assert_eq!(window.lookback.to_string(), lookback);
    }

    #[test_case("mean_5m")]
    #[test_case("MEAN_60S")]
    #[test_case("autogen.mean_60s")]
    #[test_case("")]
    fn unknown_resolution(resolution: &str) {
        assert!(matches!(
            QueryWindow::parse(resolution, "1d"),
            Err(QueryError::InvalidResolution { .. })
        ));
    }

    #[test]
    fn bad_lookback() {
        assert!(matches!(
            QueryWindow::parse("raw", "1 day"),
            Err(QueryError::InvalidLookback { .. })
        ));
    }

    #[test]
    fn resolution_is_checked_first() {
        assert!(matches!(
            QueryWindow::parse("nope", "nope"),
            Err(QueryError::InvalidResolution { .. })
        ));
    }

    #[test]
    fn default_window() {
        let window = QueryWindow::default();
        assert_eq!(window.resolution, Resolution::Mean60s);
        assert_eq!(window.lookback, Lookback::one_day());
    }
}
