//! Temperature sources.
//!
//! [`W1Sensor`] reads a DS18B20-style probe through the kernel 1-Wire
//! `w1_slave` file. [`FakeSensor`] replays a fixed script for tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Result, SensorError};

/// Default device file of the probe.
pub const DEFAULT_W1_DEVICE: &str = "/sys/bus/w1/devices/28-000004e06f2c/w1_slave";

/// Something that yields one temperature value per read.
#[allow(async_fn_in_trait)]
pub trait SensorSource: Send + Sync {
    /// Reads one instantaneous value in degrees Celsius.
    ///
    /// Every failure, including a non-numeric value, is reported as
    /// `SensorError::Unavailable`.
    async fn read(&self) -> Result<f64>;
}

/// Parses the contents of a `w1_slave` file.
///
/// The first line must end with the CRC verdict `YES`; the second carries
/// `t=<millidegrees>`.
///
/// # Errors
///
/// Returns `SensorError::Unavailable` for a failed CRC, a missing `t=` field
/// or an unparsable value.
pub fn parse_w1_slave(contents: &str) -> Result<f64> {
    let mut lines = contents.lines();
    let crc_line = lines
        .next()
        .ok_or_else(|| SensorError::unavailable("empty w1_slave file"))?;
    if !crc_line.trim_end().ends_with("YES") {
        return Err(SensorError::unavailable("crc check failed"));
    }

    let data_line = lines
        .next()
        .ok_or_else(|| SensorError::unavailable("missing data line"))?;
    let (_, raw) = data_line
        .rsplit_once("t=")
        .ok_or_else(|| SensorError::unavailable("missing t= field"))?;
    let millidegrees: i64 = raw
        .trim()
        .parse()
        .map_err(|_| SensorError::unavailable(format!("unparsable value '{}'", raw.trim())))?;

    Ok(millidegrees as f64 / 1000.0)
}

/// A 1-Wire probe read through sysfs.
#[derive(Debug, Clone)]
pub struct W1Sensor {
    path: PathBuf,
}

impl W1Sensor {
    /// Creates a sensor reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The device file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for W1Sensor {
    fn default() -> Self {
        Self::new(DEFAULT_W1_DEVICE)
    }
}

impl SensorSource for W1Sensor {
    async fn read(&self) -> Result<f64> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SensorError::unavailable(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let value = parse_w1_slave(&contents)?;
        trace!(path = %self.path.display(), value, "read w1 sensor");
        Ok(value)
    }
}

/// A scripted sensor.
///
/// Each read pops the next entry; `None` entries and an exhausted script read
/// as unavailable. Clones share the script.
#[derive(Debug, Clone, Default)]
pub struct FakeSensor {
    script: Arc<Mutex<VecDeque<Option<f64>>>>,
}

impl FakeSensor {
    /// Creates a sensor that replays `script`.
    pub fn new(script: impl IntoIterator<Item = Option<f64>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
        }
    }

    /// Appends one entry to the script.
    pub fn push(&self, value: Option<f64>) {
        self.script.lock().push_back(value);
    }

    /// Number of entries left.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl SensorSource for FakeSensor {
    async fn read(&self) -> Result<f64> {
        match self.script.lock().pop_front() {
            Some(Some(value)) if value.is_finite() => Ok(value),
            Some(Some(value)) => Err(SensorError::unavailable(format!("non-finite value {value}"))),
            Some(None) => Err(SensorError::unavailable("scripted outage")),
            None => Err(SensorError::unavailable("script exhausted")),
        }
    }
}
