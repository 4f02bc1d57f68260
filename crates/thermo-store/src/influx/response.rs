//! Decoding of `/query` response bodies.

use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::types::{FIELD, Reading};

/// Top-level `/query` body.
#[derive(Debug, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<StatementResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Result of one statement in a `/query` call.
#[derive(Debug, Default, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub series: Vec<SeriesData>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One result table.
#[derive(Debug, Default, Deserialize)]
pub struct SeriesData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl SeriesData {
    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn names(&self) -> impl Iterator<Item = String> + '_ {
        let idx = self.column("name").unwrap_or(0);
        self.values
            .iter()
            .filter_map(move |row| row.get(idx).and_then(Value::as_str))
            .map(str::to_string)
    }
}

impl QueryResponse {
    /// Parses a response body.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` for malformed JSON or when the server
    /// reported an error for the call or any statement in it.
    pub fn parse(body: &str) -> Result<Self> {
        let response: Self = serde_json::from_str(body).map_err(|e| StoreError::Backend {
            reason: format!("malformed query response: {e}"),
        })?;

        if let Some(error) = &response.error {
            return Err(StoreError::Backend {
                reason: error.clone(),
            });
        }
        if let Some(error) = response.results.iter().find_map(|r| r.error.as_ref()) {
            return Err(StoreError::Backend {
                reason: error.clone(),
            });
        }
        Ok(response)
    }

    fn series(&self) -> impl Iterator<Item = &SeriesData> {
        self.results.iter().flat_map(|r| r.series.iter())
    }

    /// Values of the `name` column across every series, as listed by
    /// `SHOW DATABASES` or `SHOW RETENTION POLICIES`.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.series().flat_map(SeriesData::names).collect()
    }

    /// Values of the `name` column in the series called `series`.
    ///
    /// `SHOW CONTINUOUS QUERIES` returns one series per database.
    #[must_use]
    pub fn names_in(&self, series: &str) -> Vec<String> {
        self.series()
            .filter(|s| s.name.as_deref() == Some(series))
            .flat_map(SeriesData::names)
            .collect()
    }

    /// Readings of a `SELECT` made with `epoch=ms`.
    ///
    /// Rows with a null or non-numeric value are skipped, as are rows whose
    /// timestamp is out of range.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` when a series lacks the `time` or value
    /// column.
    pub fn readings(&self) -> Result<Vec<Reading>> {
        let mut readings = Vec::new();

        for series in self.series() {
            let (Some(time_idx), Some(value_idx)) = (series.column("time"), series.column(FIELD))
            else {
                return Err(StoreError::Backend {
                    reason: format!(
                        "series {} lacks time or {FIELD} column",
                        series.name.as_deref().unwrap_or("<unnamed>")
                    ),
                });
            };

            readings.extend(series.values.iter().filter_map(|row| {
                let millis = row.get(time_idx)?.as_i64()?;
                let value = row.get(value_idx)?.as_f64()?;
                Some(Reading::new(DateTime::from_timestamp_millis(millis)?, value))
            }));
        }

        readings.sort_by_key(|r| r.timestamp);
        Ok(readings)
    }
}
