//! Core types for the store.
//!
//! - [`Reading`]: a single timestamped temperature value
//! - [`Resolution`]: the four named streams a database keeps
//! - [`RollupRule`]: one link of the downsampling chain
//! - [`RetentionPolicy`]: the expiry horizon attached to a stream

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Name of the field readings are stored under.
pub const FIELD: &str = "temperature";

/// A single temperature reading.
///
/// Readings are immutable once written. Timestamps are always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// When the value was measured.
    pub timestamp: DateTime<Utc>,
    /// The measured value in degrees Celsius.
    pub value: f64,
}

impl Reading {
    /// Creates a reading at the given instant.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Creates a reading stamped with the current instant.
    #[must_use]
    pub fn now(value: f64) -> Self {
        Self::new(Utc::now(), value)
    }

    /// Rejects values the backends cannot represent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidReading` for NaN or infinite values.
    pub fn validate(&self) -> Result<()> {
        if self.value.is_finite() {
            Ok(())
        } else {
            Err(StoreError::InvalidReading {
                reason: format!("value {} is not finite", self.value),
            })
        }
    }
}

/// The resolution streams every database carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    /// Samples exactly as the sampler wrote them.
    Raw,
    /// Mean over 60 second buckets.
    Mean60s,
    /// Mean over 1 hour buckets.
    Mean1h,
    /// Mean over 1 day buckets.
    Mean1d,
}

impl Resolution {
    /// All streams, finest first.
    pub const ALL: [Self; 4] = [Self::Raw, Self::Mean60s, Self::Mean1h, Self::Mean1d];

    /// Returns the stream key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Mean60s => "mean_60s",
            Self::Mean1h => "mean_1h",
            Self::Mean1d => "mean_1d",
        }
    }

    /// The stream this one is rolled up from, `None` for `raw`.
    #[must_use]
    pub const fn upstream(self) -> Option<Self> {
        match self {
            Self::Raw => None,
            Self::Mean60s => Some(Self::Raw),
            Self::Mean1h => Some(Self::Mean60s),
            Self::Mean1d => Some(Self::Mean1h),
        }
    }

    /// Bucket width in seconds for derived streams.
    #[must_use]
    pub const fn bucket_width_secs(self) -> Option<i64> {
        match self {
            Self::Raw => None,
            Self::Mean60s => Some(60),
            Self::Mean1h => Some(3_600),
            Self::Mean1d => Some(86_400),
        }
    }

    /// Returns true for streams maintained by a rollup rule.
    #[must_use]
    pub const fn is_derived(self) -> bool {
        !matches!(self, Self::Raw)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| StoreError::InvalidResolution {
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for Resolution {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.as_str().to_string()
    }
}

/// Aggregation applied by a rollup rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Arithmetic mean of the bucket.
    Mean,
}

impl Aggregation {
    /// Applies this aggregation to a slice of values.
    ///
    /// Returns `None` if the slice is empty.
    #[must_use]
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }

        match self {
            Self::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        }
    }

    /// The function name in query languages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
        }
    }
}

/// One link of the downsampling chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupRule {
    /// The stream read from.
    pub source: Resolution,
    /// The stream written to.
    pub target: Resolution,
    /// Width of the aligned buckets, in seconds.
    pub bucket_width_secs: i64,
    /// How each bucket is reduced.
    pub aggregation: Aggregation,
}

impl RollupRule {
    /// Builds the rule that maintains `target` from its upstream stream.
    ///
    /// Returns `None` for `raw`, which has no upstream.
    #[must_use]
    pub const fn for_target(target: Resolution) -> Option<Self> {
        match (target.upstream(), target.bucket_width_secs()) {
            (Some(source), Some(bucket_width_secs)) => Some(Self {
                source,
                target,
                bucket_width_secs,
                aggregation: Aggregation::Mean,
            }),
            _ => None,
        }
    }

    /// The full chain `raw → mean_60s → mean_1h → mean_1d`, in evaluation order.
    #[must_use]
    pub fn chain() -> Vec<Self> {
        Resolution::ALL
            .into_iter()
            .filter_map(Self::for_target)
            .collect()
    }

    /// Registration name of the rule, e.g. `cq_60s`.
    #[must_use]
    pub fn name(&self) -> String {
        let suffix = self
            .target
            .as_str()
            .strip_prefix("mean_")
            .unwrap_or(self.target.as_str());
        format!("cq_{suffix}")
    }

    /// Bucket width as a time delta.
    #[must_use]
    pub fn bucket_width(&self) -> TimeDelta {
        TimeDelta::seconds(self.bucket_width_secs)
    }
}

/// Retention horizon attached to a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Registration name, e.g. `rp_1h`.
    pub name: String,
    /// The stream the horizon applies to.
    pub stream: Resolution,
    /// Maximum age of kept readings, in seconds.
    pub duration_secs: i64,
    /// Whether new raw points are written under this policy.
    pub default: bool,
}

impl RetentionPolicy {
    /// The one-hour horizon on the raw stream.
    #[must_use]
    pub fn raw_one_hour() -> Self {
        Self {
            name: "rp_1h".to_string(),
            stream: Resolution::Raw,
            duration_secs: 3_600,
            default: true,
        }
    }

    /// Oldest timestamp kept at `now`.
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - TimeDelta::seconds(self.duration_secs)
    }
}

/// Renders a second count with the largest unit that divides it evenly.
#[must_use]
pub fn format_duration_secs(secs: i64) -> String {
    if secs != 0 && secs % 604_800 == 0 {
        format!("{}w", secs / 604_800)
    } else if secs != 0 && secs % 86_400 == 0 {
        format!("{}d", secs / 86_400)
    } else if secs != 0 && secs % 3_600 == 0 {
        format!("{}h", secs / 3_600)
    } else {
        format!("{secs}s")
    }
}
