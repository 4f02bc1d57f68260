//! Query results: local-time series and their display ranges.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::ser::{Serialize, SerializeTuple, Serializer};
use thermo_store::{FIELD, Lookback, Reading, Resolution};

/// Padding added above and below the value range.
pub const Y_MARGIN: f64 = 4.0;

/// Unit label of the stored field.
pub const UNIT: &str = "°C";

const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An instant shown in a display timezone.
///
/// Ordering follows the full-precision instant, so the two wall-clock hours
/// that repeat when daylight saving ends still sort correctly, as do readings
/// less than a second apart. Only the rendered form is cut to whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalTime(DateTime<Tz>);

impl LocalTime {
    /// Converts a UTC instant into `tz`.
    #[must_use]
    pub fn from_utc(instant: DateTime<Utc>, tz: Tz) -> Self {
        Self(instant.with_timezone(&tz))
    }

    /// The zoned instant.
    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Tz> {
        &self.0
    }

    /// The wall-clock time without an offset.
    #[must_use]
    pub fn naive(&self) -> NaiveDateTime {
        self.0.naive_local()
    }
}

impl fmt::Display for LocalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(LOCAL_FORMAT))
    }
}

impl Serialize for LocalTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One point of a [`Series`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SeriesPoint {
    /// Local time of the reading.
    pub time: LocalTime,
    /// The reading's value.
    pub value: f64,
}

/// Range of one chart axis.
///
/// Serializes as a two-element array; an empty series gets `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisRange<T> {
    /// Placeholder range for an empty series.
    Sentinel,
    /// Range covering the data.
    Span {
        /// Lower bound.
        min: T,
        /// Upper bound.
        max: T,
    },
}

impl<T> AxisRange<T> {
    /// Returns true for the empty-series placeholder.
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        matches!(self, Self::Sentinel)
    }
}

impl<T: Serialize> Serialize for AxisRange<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        match self {
            Self::Sentinel => {
                tuple.serialize_element(&-1)?;
                tuple.serialize_element(&1)?;
            }
            Self::Span { min, max } => {
                tuple.serialize_element(min)?;
                tuple.serialize_element(max)?;
            }
        }
        tuple.end()
    }
}

/// Axis ranges for rendering a series.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct DisplayRange {
    /// First to last local time.
    pub x: AxisRange<LocalTime>,
    /// Smallest to largest value, padded by [`Y_MARGIN`].
    pub y: AxisRange<f64>,
}

impl DisplayRange {
    /// Computes the ranges of `points`, which must be in time order.
    #[must_use]
    pub fn of(points: &[SeriesPoint]) -> Self {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Self {
                x: AxisRange::Sentinel,
                y: AxisRange::Sentinel,
            };
        };

        let (min, max) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.value), hi.max(p.value))
            });

        Self {
            x: AxisRange::Span {
                min: first.time,
                max: last.time,
            },
            y: AxisRange::Span {
                min: min - Y_MARGIN,
                max: max + Y_MARGIN,
            },
        }
    }
}

/// The result of one query, built fresh for every call.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Series {
    /// Name of the plotted field.
    pub item: &'static str,
    /// Unit of the values.
    pub unit: &'static str,
    /// Stream the points came from.
    pub resolution: Resolution,
    /// Window the points cover.
    pub lookback: Lookback,
    /// Points in time order.
    pub points: Vec<SeriesPoint>,
    /// Axis ranges for the points.
    pub range: DisplayRange,
}

impl Series {
    /// Converts store readings into a local-time series.
    ///
    /// Readings are expected oldest first, as the store returns them.
    #[must_use]
    pub fn from_readings(
        readings: &[Reading],
        tz: Tz,
        resolution: Resolution,
        lookback: Lookback,
    ) -> Self {
        let points: Vec<SeriesPoint> = readings
            .iter()
            .map(|r| SeriesPoint {
                time: LocalTime::from_utc(r.timestamp, tz),
                value: r.value,
            })
            .collect();
        let range = DisplayRange::of(&points);

        Self {
            item: FIELD,
            unit: UNIT,
            resolution,
            lookback,
            points,
            range,
        }
    }

    /// Returns true when the window held no readings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// The x column for a chart.
    #[must_use]
    pub fn timestamps(&self) -> Vec<LocalTime> {
        self.points.iter().map(|p| p.time).collect()
    }

    /// The y column for a chart.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}
