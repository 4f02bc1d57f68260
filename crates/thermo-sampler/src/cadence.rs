//! Drift-free tick scheduling.
//!
//! Every tick is anchored to a fixed start instant: the sleep before the next
//! tick is `interval - (elapsed % interval)`, so lateness in one tick is
//! absorbed by the next sleep instead of accumulating.

use std::time::Duration;

use tokio::time::Instant;

/// A fixed cadence anchored at its start instant.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    start: Instant,
    interval: Duration,
}

impl Cadence {
    /// Anchors a cadence at `start`. A zero interval is raised to one
    /// millisecond.
    #[must_use]
    pub fn new(start: Instant, interval: Duration) -> Self {
        Self {
            start,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Anchors a cadence at the current instant.
    #[must_use]
    pub fn starting_now(interval: Duration) -> Self {
        Self::new(Instant::now(), interval)
    }

    /// The anchor.
    #[must_use]
    pub const fn start(&self) -> Instant {
        self.start
    }

    /// The tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Time to sleep at `now` until the next tick boundary.
    ///
    /// Always in `(0, interval]`.
    #[must_use]
    pub fn delay_at(&self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.start);
        let interval = self.interval.as_nanos();
        let offset = elapsed.as_nanos() % interval;
        // offset < interval, which itself came from a Duration
        Duration::from_nanos((interval - offset) as u64)
    }

    /// Time to sleep from the current instant until the next tick boundary.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        self.delay_at(Instant::now())
    }

    /// Instant of the `k`-th tick boundary.
    #[must_use]
    pub fn tick_instant(&self, k: u32) -> Instant {
        self.start + self.interval * k
    }
}
