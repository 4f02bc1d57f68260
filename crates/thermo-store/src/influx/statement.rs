//! InfluxQL statement builder and line-protocol encoding.
//!
//! Every identifier is quoted and every duration comes from a typed value, so
//! statements are never assembled from unchecked text.

use std::fmt;

use crate::lookback::Lookback;
use crate::types::{FIELD, Reading, Resolution, RetentionPolicy, RollupRule, format_duration_secs};

/// Retention policy derived streams are written under.
pub const DERIVED_POLICY: &str = "autogen";

/// Measurement holding raw samples.
pub const RAW_MEASUREMENT: &str = "data_raw";

/// Where a stream lives in InfluxDB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Retention policy qualifier, `None` for the database default.
    pub policy: Option<&'static str>,
    /// Measurement name.
    pub name: &'static str,
}

impl Measurement {
    /// Maps a stream onto its measurement.
    #[must_use]
    pub const fn of(stream: Resolution) -> Self {
        match stream {
            Resolution::Raw => Self {
                policy: None,
                name: RAW_MEASUREMENT,
            },
            derived => Self {
                policy: Some(DERIVED_POLICY),
                name: derived.as_str(),
            },
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(policy) = self.policy {
            write!(f, "{}.", Ident(policy))?;
        }
        write!(f, "{}", Ident(self.name))
    }
}

/// A double-quoted InfluxQL identifier.
#[derive(Debug, Clone, Copy)]
pub struct Ident<'a>(pub &'a str);

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                c => write!(f, "{c}")?,
            }
        }
        f.write_str("\"")
    }
}

/// The statements the store issues.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    /// `SHOW DATABASES`.
    ShowDatabases,
    /// `CREATE DATABASE`.
    CreateDatabase {
        /// Database name.
        database: &'a str,
    },
    /// `SHOW RETENTION POLICIES ON` a database.
    ShowRetentionPolicies {
        /// Database name.
        database: &'a str,
    },
    /// `CREATE RETENTION POLICY`.
    CreateRetentionPolicy {
        /// Database name.
        database: &'a str,
        /// Policy to register.
        policy: &'a RetentionPolicy,
    },
    /// `SHOW CONTINUOUS QUERIES`, grouped by database.
    ShowContinuousQueries,
    /// `CREATE CONTINUOUS QUERY` for one rollup rule.
    CreateContinuousQuery {
        /// Database name.
        database: &'a str,
        /// Rule to register.
        rule: &'a RollupRule,
    },
    /// `SELECT` of a stream over a relative window.
    SelectSince {
        /// Stream to read.
        stream: Resolution,
        /// How far back to read.
        since: Lookback,
    },
}

impl Statement<'_> {
    /// Whether the statement changes server state and therefore must be sent
    /// with POST.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Self::ShowDatabases
                | Self::ShowRetentionPolicies { .. }
                | Self::ShowContinuousQueries
                | Self::SelectSince { .. }
        )
    }
}

impl fmt::Display for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShowDatabases => f.write_str("SHOW DATABASES"),
            Self::CreateDatabase { database } => {
                write!(f, "CREATE DATABASE {}", Ident(database))
            }
            Self::ShowRetentionPolicies { database } => {
                write!(f, "SHOW RETENTION POLICIES ON {}", Ident(database))
            }
            Self::ShowContinuousQueries => f.write_str("SHOW CONTINUOUS QUERIES"),
            Self::CreateRetentionPolicy { database, policy } => {
                write!(
                    f,
                    "CREATE RETENTION POLICY {} ON {} DURATION {} REPLICATION 1",
                    Ident(&policy.name),
                    Ident(database),
                    format_duration_secs(policy.duration_secs),
                )?;
                if policy.default {
                    f.write_str(" DEFAULT")?;
                }
                Ok(())
            }
            Self::CreateContinuousQuery { database, rule } => write!(
                f,
                "CREATE CONTINUOUS QUERY {} ON {} BEGIN SELECT {}({}) AS {} INTO {} FROM {} GROUP BY time({}) END",
                Ident(&rule.name()),
                Ident(database),
                rule.aggregation.as_str(),
                Ident(FIELD),
                Ident(FIELD),
                Measurement::of(rule.target),
                Measurement::of(rule.source),
                format_duration_secs(rule.bucket_width_secs),
            ),
            Self::SelectSince { stream, since } => write!(
                f,
                "SELECT {} FROM {} WHERE time > now() - {since} ORDER BY time ASC",
                Ident(FIELD),
                Measurement::of(*stream),
            ),
        }
    }
}

/// Encodes a reading as one line of line protocol with millisecond precision.
#[must_use]
pub fn line_protocol(reading: &Reading) -> String {
    format!(
        "{RAW_MEASUREMENT} {FIELD}={} {}",
        reading.value,
        reading.timestamp.timestamp_millis()
    )
}
