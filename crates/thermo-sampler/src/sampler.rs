//! The sampling loop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thermo_store::{Reading, Resolution, Store};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cadence::Cadence;
use crate::sensor::SensorSource;

/// Default tick interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Source of reading timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What happened on one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A reading was appended to the raw stream.
    Stored(Reading),
    /// The sensor had no value; nothing was written.
    SensorUnavailable,
    /// The store rejected or could not take the reading.
    StoreFailed,
}

/// One tick of a bounded run.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Monotonic time since the cadence anchor when the tick began.
    pub elapsed: Duration,
    /// What the tick did.
    pub outcome: TickOutcome,
}

/// Pulls from a sensor on a fixed cadence and appends to the raw stream.
pub struct Sampler<S, R> {
    store: S,
    sensor: R,
    interval: Duration,
    clock: Clock,
}

impl<S, R> fmt::Debug for Sampler<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl<S: Store, R: SensorSource> Sampler<S, R> {
    /// Creates a sampler with the default five second interval.
    pub fn new(store: S, sensor: R) -> Self {
        Self {
            store,
            sensor,
            interval: DEFAULT_INTERVAL,
            clock: Arc::new(Utc::now),
        }
    }

    /// Sets the tick interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Replaces the clock used to stamp readings.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// The store readings are written to.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Performs one read-and-append. Never fails; failures are logged and
    /// reported in the outcome.
    pub async fn tick(&self) -> TickOutcome {
        let value = match self.sensor.read().await {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "skipping tick");
                return TickOutcome::SensorUnavailable;
            }
        };

        let reading = Reading::new((self.clock)(), value);
        match self.store.append(Resolution::Raw, reading).await {
            Ok(()) => {
                debug!(value, timestamp = %reading.timestamp, "stored reading");
                TickOutcome::Stored(reading)
            }
            Err(e) => {
                warn!(error = %e, value, "failed to append reading");
                TickOutcome::StoreFailed
            }
        }
    }

    /// Runs `ticks` ticks on the cadence and returns what each one did.
    ///
    /// The first tick fires immediately at the anchor.
    pub async fn run_for(&self, ticks: usize) -> Vec<TickReport> {
        let cadence = Cadence::starting_now(self.interval);
        let mut reports = Vec::with_capacity(ticks);

        for k in 0..ticks {
            let elapsed = cadence.start().elapsed();
            let outcome = self.tick().await;
            reports.push(TickReport { elapsed, outcome });

            if k + 1 < ticks {
                tokio::time::sleep(cadence.next_delay()).await;
            }
        }
        reports
    }

    /// Runs until the task is dropped.
    pub async fn run(&self) {
        let cadence = Cadence::starting_now(self.interval);
        info!(
            database = %self.store.database(),
            interval_ms = self.interval.as_millis() as u64,
            "sampler started"
        );

        loop {
            self.tick().await;
            tokio::time::sleep(cadence.next_delay()).await;
        }
    }
}

/// Anchors a clock at `base` that advances with tokio's clock.
///
/// Under a paused runtime the readings then carry the virtual time.
pub fn runtime_clock(base: DateTime<Utc>) -> impl Fn() -> DateTime<Utc> + Send + Sync + 'static {
    let anchor = Instant::now();
    move || {
        let elapsed = chrono::TimeDelta::from_std(anchor.elapsed()).unwrap_or_default();
        base + elapsed
    }
}
