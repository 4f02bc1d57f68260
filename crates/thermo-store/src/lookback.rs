//! Relative query windows such as `1d`, `30d` or `52w`.
//!
//! A [`Lookback`] is parsed once at the edge of the system and carried as a
//! typed value afterwards, so no query text is ever assembled from raw user
//! input.

use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Unit of a [`Lookback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookbackUnit {
    /// Seconds (`s`).
    Seconds,
    /// Minutes (`m`).
    Minutes,
    /// Hours (`h`).
    Hours,
    /// Days (`d`).
    Days,
    /// Weeks (`w`).
    Weeks,
}

impl LookbackUnit {
    /// Length of one unit in seconds.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3_600,
            Self::Days => 86_400,
            Self::Weeks => 604_800,
        }
    }

    /// The unit suffix.
    #[must_use]
    pub const fn suffix(self) -> char {
        match self {
            Self::Seconds => 's',
            Self::Minutes => 'm',
            Self::Hours => 'h',
            Self::Days => 'd',
            Self::Weeks => 'w',
        }
    }

    const fn from_suffix(c: char) -> Option<Self> {
        match c {
            's' => Some(Self::Seconds),
            'm' => Some(Self::Minutes),
            'h' => Some(Self::Hours),
            'd' => Some(Self::Days),
            'w' => Some(Self::Weeks),
            _ => None,
        }
    }
}

/// A validated, positive duration counted back from "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Lookback {
    amount: u32,
    unit: LookbackUnit,
}

impl Lookback {
    /// Longest accepted window, ten years.
    pub const MAX_SECS: i64 = 10 * 366 * 86_400;

    /// Creates a lookback from an amount and unit.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidLookback` for a zero amount or a window
    /// longer than [`Lookback::MAX_SECS`].
    pub fn new(amount: u32, unit: LookbackUnit) -> Result<Self> {
        let lookback = Self { amount, unit };
        if amount == 0 {
            return Err(lookback.invalid("amount must be greater than zero"));
        }
        if lookback.as_secs() > Self::MAX_SECS {
            return Err(lookback.invalid("window exceeds ten years"));
        }
        Ok(lookback)
    }

    /// One day, the dashboard's initial window.
    #[must_use]
    pub const fn one_day() -> Self {
        Self {
            amount: 1,
            unit: LookbackUnit::Days,
        }
    }

    /// The numeric part.
    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.amount
    }

    /// The unit part.
    #[must_use]
    pub const fn unit(&self) -> LookbackUnit {
        self.unit
    }

    /// Total length in seconds.
    #[must_use]
    pub const fn as_secs(&self) -> i64 {
        self.amount as i64 * self.unit.seconds()
    }

    /// Total length as a time delta.
    #[must_use]
    pub fn as_time_delta(&self) -> TimeDelta {
        TimeDelta::seconds(self.as_secs())
    }

    fn invalid(&self, reason: &str) -> StoreError {
        StoreError::InvalidLookback {
            value: self.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Self::one_day()
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl FromStr for Lookback {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| StoreError::InvalidLookback {
            value: s.to_string(),
            reason,
        };

        let mut chars = s.chars();
        let suffix = chars
            .next_back()
            .ok_or_else(|| invalid("lookback cannot be empty".to_string()))?;
        let unit = LookbackUnit::from_suffix(suffix)
            .ok_or_else(|| invalid(format!("unknown unit '{suffix}'")))?;

        let digits = chars.as_str();
        if digits.is_empty() {
            return Err(invalid("missing amount".to_string()));
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("amount must be a whole number".to_string()));
        }
        let amount: u32 = digits
            .parse()
            .map_err(|_| invalid("amount is too large".to_string()))?;

        Self::new(amount, unit)
    }
}

impl TryFrom<String> for Lookback {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Lookback> for String {
    fn from(value: Lookback) -> Self {
        value.to_string()
    }
}
