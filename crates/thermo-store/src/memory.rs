//! In-process store engine with retention and rollup evaluation.
//!
//! [`MemoryStore`] keeps databases, retention policies and rollup rules in
//! memory and evaluates the rollup chain itself, either on demand through
//! [`MemoryStore::evaluate_rollups`] or continuously through
//! [`MemoryStore::spawn_rollup_worker`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::lookback::Lookback;
use crate::rollup;
use crate::store::Store;
use crate::types::{Reading, Resolution, RetentionPolicy, RollupRule};

/// A registered rollup rule and the end of the last bucket it emitted.
#[derive(Debug, Clone)]
struct RollupState {
    rule: RollupRule,
    watermark: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Database {
    retention_policies: Vec<RetentionPolicy>,
    rollups: Vec<RollupState>,
    streams: HashMap<Resolution, Vec<Reading>>,
}

impl Database {
    /// Inserts keeping timestamp order.
    fn insert(&mut self, stream: Resolution, reading: Reading) {
        let points = self.streams.entry(stream).or_default();
        let insert_pos = points.partition_point(|p| p.timestamp <= reading.timestamp);
        points.insert(insert_pos, reading);
    }

    /// Drops readings past their stream's retention horizon.
    fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for policy in &self.retention_policies {
            if let Some(points) = self.streams.get_mut(&policy.stream) {
                let cutoff = policy.cutoff(now);
                let before = points.len();
                points.retain(|p| p.timestamp >= cutoff);
                removed += before - points.len();
            }
        }
        removed
    }

    /// Runs every rule in chain order and returns the number of points written.
    fn evaluate_rollups(&mut self, now: DateTime<Utc>) -> usize {
        let mut written = 0;

        for idx in 0..self.rollups.len() {
            let RollupState { rule, watermark } = self.rollups[idx].clone();
            let until = rollup::bucket_start(now, rule.bucket_width_secs);
            if watermark.is_some_and(|w| w >= until) {
                continue;
            }

            let source = self.streams.get(&rule.source).map_or(&[][..], Vec::as_slice);
            let output = rollup::evaluate(&rule, source, watermark, until);

            for reading in output {
                debug!(
                    rule = %rule.name(),
                    bucket = %reading.timestamp,
                    value = reading.value,
                    "rolled up bucket"
                );
                self.insert(rule.target, reading);
                written += 1;
            }
            self.rollups[idx].watermark = Some(until);
        }

        written
    }
}

#[derive(Debug, Default)]
struct Engine {
    databases: HashMap<String, Database>,
}

/// Thread-safe in-memory store.
///
/// Clones share the same engine, so a sampler and any number of query
/// engines can each hold their own handle.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    database: String,
    engine: Arc<RwLock<Engine>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Creates a handle on a fresh engine, bound to `database`.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            engine: Arc::new(RwLock::new(Engine::default())),
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a handle on the same engine bound to another database.
    #[must_use]
    pub fn open(&self, database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            engine: Arc::clone(&self.engine),
            offline: Arc::clone(&self.offline),
        }
    }

    /// Simulates the engine becoming unreachable.
    ///
    /// While offline every operation fails with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Names of all databases in the engine.
    #[must_use]
    pub fn databases(&self) -> Vec<String> {
        let engine = self.engine.read();
        let mut names: Vec<String> = engine.databases.keys().cloned().collect();
        names.sort();
        names
    }

    /// Retention policies registered on this handle's database.
    #[must_use]
    pub fn retention_policies(&self) -> Vec<RetentionPolicy> {
        let engine = self.engine.read();
        engine
            .databases
            .get(&self.database)
            .map(|db| db.retention_policies.clone())
            .unwrap_or_default()
    }

    /// Rollup rules registered on this handle's database.
    #[must_use]
    pub fn rollup_rules(&self) -> Vec<RollupRule> {
        let engine = self.engine.read();
        engine
            .databases
            .get(&self.database)
            .map(|db| db.rollups.iter().map(|r| r.rule).collect())
            .unwrap_or_default()
    }

    /// Number of readings currently held by `stream`.
    #[must_use]
    pub fn stream_len(&self, stream: Resolution) -> usize {
        let engine = self.engine.read();
        engine
            .databases
            .get(&self.database)
            .and_then(|db| db.streams.get(&stream))
            .map_or(0, Vec::len)
    }

    /// All readings of `stream`, regardless of age.
    #[must_use]
    pub fn stream(&self, stream: Resolution) -> Vec<Reading> {
        let engine = self.engine.read();
        engine
            .databases
            .get(&self.database)
            .and_then(|db| db.streams.get(&stream))
            .cloned()
            .unwrap_or_default()
    }

    /// Evaluates the rollup chain of every database for buckets completed
    /// before `now`, then applies retention.
    ///
    /// Returns the number of rollup points written.
    pub fn evaluate_rollups(&self, now: DateTime<Utc>) -> usize {
        let mut engine = self.engine.write();
        let mut written = 0;
        for (name, db) in &mut engine.databases {
            written += db.evaluate_rollups(now);
            let expired = db.expire(now);
            if expired > 0 {
                debug!(database = %name, expired, "expired readings past retention");
            }
        }
        written
    }

    /// Runs [`MemoryStore::evaluate_rollups`] every `every` on the tokio runtime.
    #[must_use]
    pub fn spawn_rollup_worker(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let written = store.evaluate_rollups(Utc::now());
                if written > 0 {
                    debug!(written, "rollup pass complete");
                }
            }
        })
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "memory engine is offline".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(&self) -> StoreError {
        StoreError::DatabaseNotFound {
            name: self.database.clone(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("sensor_data")
    }
}

impl Store for MemoryStore {
    fn database(&self) -> &str {
        &self.database
    }

    async fn ensure_initialized(&self) -> Result<bool> {
        self.check_online()?;

        let mut engine = self.engine.write();
        if engine.databases.contains_key(&self.database) {
            debug!(database = %self.database, "database already initialized");
            return Ok(false);
        }

        let db = Database {
            retention_policies: vec![RetentionPolicy::raw_one_hour()],
            rollups: RollupRule::chain()
                .into_iter()
                .map(|rule| RollupState {
                    rule,
                    watermark: None,
                })
                .collect(),
            streams: HashMap::new(),
        };
        engine.databases.insert(self.database.clone(), db);
        drop(engine);

        info!(database = %self.database, "created database with retention and rollups");
        Ok(true)
    }

    async fn append(&self, stream: Resolution, reading: Reading) -> Result<()> {
        self.check_online()?;
        if stream.is_derived() {
            return Err(StoreError::DerivedStreamWrite {
                stream: stream.to_string(),
            });
        }
        reading.validate()?;

        let mut engine = self.engine.write();
        let db = engine
            .databases
            .get_mut(&self.database)
            .ok_or_else(|| self.not_found())?;

        db.insert(stream, reading);
        db.expire(Utc::now());

        debug!(
            stream = %stream,
            value = reading.value,
            points = db.streams.get(&stream).map_or(0, Vec::len),
            "appended reading"
        );
        Ok(())
    }

    async fn query(&self, stream: Resolution, since: Lookback) -> Result<Vec<Reading>> {
        self.check_online()?;

        let cutoff = Utc::now() - since.as_time_delta();
        let engine = self.engine.read();
        let db = engine
            .databases
            .get(&self.database)
            .ok_or_else(|| self.not_found())?;

        Ok(db
            .streams
            .get(&stream)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.timestamp > cutoff)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn day() -> Lookback {
        Lookback::one_day()
    }

    async fn ready_store() -> MemoryStore {
        let store = MemoryStore::new("sensor_data");
        store.ensure_initialized().await.unwrap();
        store
    }

    /// Start of a minute bucket a few minutes in the past.
    fn recent_minute(minutes_ago: i64) -> DateTime<Utc> {
        rollup::bucket_start(Utc::now() - TimeDelta::minutes(minutes_ago), 60)
    }

    mod initialization_tests {
        use super::*;

        #[tokio::test]
        async fn first_call_creates_database() {
            let store = MemoryStore::new("sensor_data");
            assert!(store.ensure_initialized().await.unwrap());
            assert_eq!(store.databases(), vec!["sensor_data".to_string()]);
        }

        #[tokio::test]
        async fn second_call_is_a_noop() {
            let store = MemoryStore::new("sensor_data");
            assert!(store.ensure_initialized().await.unwrap());
            assert!(!store.ensure_initialized().await.unwrap());

            assert_eq!(store.databases().len(), 1);
            assert_eq!(store.retention_policies(), vec![RetentionPolicy::raw_one_hour()]);
            assert_eq!(store.rollup_rules(), RollupRule::chain());
        }

        #[tokio::test]
        async fn existence_check_matches_exact_name() {
            let archive = MemoryStore::new("sensor_data_archive");
            archive.ensure_initialized().await.unwrap();

            let store = archive.open("sensor_data");
            assert!(store.ensure_initialized().await.unwrap());
            assert_eq!(
                store.databases(),
                vec!["sensor_data".to_string(), "sensor_data_archive".to_string()]
            );
        }

        #[tokio::test]
        async fn offline_engine_fails_initialization() {
            let store = MemoryStore::new("sensor_data");
            store.set_offline(true);
            let err = store.ensure_initialized().await.unwrap_err();
            assert!(err.is_unavailable());
            assert!(store.databases().is_empty());
        }
    }

    mod append_tests {
        use super::*;

        #[tokio::test]
        async fn append_to_raw() {
            let store = ready_store().await;
            store.append(Resolution::Raw, Reading::now(21.5)).await.unwrap();
            assert_eq!(store.stream_len(Resolution::Raw), 1);
        }

        #[tokio::test]
        async fn append_to_derived_stream_is_rejected() {
            let store = ready_store().await;
            for stream in [Resolution::Mean60s, Resolution::Mean1h, Resolution::Mean1d] {
                let err = store.append(stream, Reading::now(1.0)).await.unwrap_err();
                assert!(matches!(err, StoreError::DerivedStreamWrite { .. }));
                assert_eq!(store.stream_len(stream), 0);
            }
        }

        #[tokio::test]
        async fn append_without_database_fails() {
            let store = MemoryStore::new("sensor_data");
            let err = store.append(Resolution::Raw, Reading::now(1.0)).await.unwrap_err();
            assert!(matches!(err, StoreError::DatabaseNotFound { .. }));
        }

        #[tokio::test]
        async fn append_rejects_nan() {
            let store = ready_store().await;
            let err = store.append(Resolution::Raw, Reading::now(f64::NAN)).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidReading { .. }));
        }

        #[tokio::test]
        async fn append_keeps_timestamp_order() {
            let store = ready_store().await;
            let now = Utc::now();
            let t1 = now - TimeDelta::seconds(15);
            let t2 = now - TimeDelta::seconds(10);
            let t3 = now - TimeDelta::seconds(5);

            store.append(Resolution::Raw, Reading::new(t3, 3.0)).await.unwrap();
            store.append(Resolution::Raw, Reading::new(t1, 1.0)).await.unwrap();
            store.append(Resolution::Raw, Reading::new(t2, 2.0)).await.unwrap();

            let stamps: Vec<_> = store
                .stream(Resolution::Raw)
                .iter()
                .map(|r| r.timestamp)
                .collect();
            assert_eq!(stamps, vec![t1, t2, t3]);
        }

        #[tokio::test]
        async fn raw_retention_drops_points_older_than_one_hour() {
            let store = ready_store().await;
            let now = Utc::now();

            store
                .append(Resolution::Raw, Reading::new(now - TimeDelta::minutes(61), 1.0))
                .await
                .unwrap();
            store
                .append(Resolution::Raw, Reading::new(now - TimeDelta::minutes(59), 2.0))
                .await
                .unwrap();

            let kept = store.stream(Resolution::Raw);
            assert_eq!(kept.len(), 1);
            assert!((kept[0].value - 2.0).abs() < f64::EPSILON);
        }

        #[tokio::test]
        async fn offline_append_fails_unavailable() {
            let store = ready_store().await;
            store.set_offline(true);
            let err = store.append(Resolution::Raw, Reading::now(1.0)).await.unwrap_err();
            assert!(err.is_unavailable());

            store.set_offline(false);
            assert!(store.append(Resolution::Raw, Reading::now(1.0)).await.is_ok());
        }
    }

    mod query_tests {
        use super::*;

        #[tokio::test]
        async fn query_empty_stream_returns_empty() {
            let store = ready_store().await;
            for stream in Resolution::ALL {
                assert!(store.query(stream, day()).await.unwrap().is_empty());
            }
        }

        #[tokio::test]
        async fn query_without_database_fails() {
            let store = MemoryStore::new("sensor_data");
            let err = store.query(Resolution::Raw, day()).await.unwrap_err();
            assert!(matches!(err, StoreError::DatabaseNotFound { .. }));
        }

        #[tokio::test]
        async fn query_filters_by_lookback() {
            let store = ready_store().await;
            let now = Utc::now();
            store
                .append(Resolution::Raw, Reading::new(now - TimeDelta::minutes(30), 1.0))
                .await
                .unwrap();
            store
                .append(Resolution::Raw, Reading::new(now - TimeDelta::minutes(5), 2.0))
                .await
                .unwrap();

            let last_ten = store
                .query(Resolution::Raw, "10m".parse().unwrap())
                .await
                .unwrap();
            assert_eq!(last_ten.len(), 1);
            assert!((last_ten[0].value - 2.0).abs() < f64::EPSILON);

            let last_hour = store
                .query(Resolution::Raw, "1h".parse().unwrap())
                .await
                .unwrap();
            assert_eq!(last_hour.len(), 2);
            assert!(last_hour[0].timestamp < last_hour[1].timestamp);
        }

        #[tokio::test]
        async fn offline_query_fails_unavailable() {
            let store = ready_store().await;
            store.set_offline(true);
            assert!(store.query(Resolution::Raw, day()).await.unwrap_err().is_unavailable());
        }

        #[tokio::test]
        async fn clones_share_data() {
            let writer = ready_store().await;
            let reader = writer.clone();
            writer.append(Resolution::Raw, Reading::now(20.0)).await.unwrap();
            assert_eq!(reader.query(Resolution::Raw, day()).await.unwrap().len(), 1);
        }
    }

    mod rollup_tests {
        use super::*;

        #[tokio::test]
        async fn minute_bucket_mean() {
            let store = ready_store().await;
            let bucket = recent_minute(5);
            store
                .append(Resolution::Raw, Reading::new(bucket + TimeDelta::seconds(10), 10.0))
                .await
                .unwrap();
            store
                .append(Resolution::Raw, Reading::new(bucket + TimeDelta::seconds(40), 20.0))
                .await
                .unwrap();

            store.evaluate_rollups(bucket + TimeDelta::seconds(60));

            assert_eq!(store.stream(Resolution::Mean60s), vec![Reading::new(bucket, 15.0)]);
        }

        #[tokio::test]
        async fn empty_minute_produces_no_point() {
            let store = ready_store().await;
            let bucket = recent_minute(10);
            store
                .append(Resolution::Raw, Reading::new(bucket + TimeDelta::seconds(5), 18.0))
                .await
                .unwrap();
            store
                .append(Resolution::Raw, Reading::new(bucket + TimeDelta::seconds(125), 19.0))
                .await
                .unwrap();

            store.evaluate_rollups(bucket + TimeDelta::seconds(180));

            let minutes: Vec<_> = store
                .stream(Resolution::Mean60s)
                .iter()
                .map(|r| r.timestamp)
                .collect();
            assert_eq!(minutes, vec![bucket, bucket + TimeDelta::seconds(120)]);
        }

        #[tokio::test]
        async fn repeated_evaluation_emits_each_bucket_once() {
            let store = ready_store().await;
            let bucket = recent_minute(5);
            store
                .append(Resolution::Raw, Reading::new(bucket + TimeDelta::seconds(1), 12.0))
                .await
                .unwrap();

            let at = bucket + TimeDelta::seconds(90);
            assert_eq!(store.evaluate_rollups(at), 1);
            assert_eq!(store.evaluate_rollups(at), 0);
            assert_eq!(store.evaluate_rollups(at + TimeDelta::seconds(60)), 0);
            assert_eq!(store.stream_len(Resolution::Mean60s), 1);
        }

        #[tokio::test]
        async fn chain_feeds_each_tier_from_the_previous_one() {
            let store = ready_store().await;
            let bucket = recent_minute(3);
            store
                .append(Resolution::Raw, Reading::new(bucket + TimeDelta::seconds(5), 20.0))
                .await
                .unwrap();
            store
                .append(Resolution::Raw, Reading::new(bucket + TimeDelta::seconds(35), 24.0))
                .await
                .unwrap();

            // far enough ahead that the minute, hour and day buckets are all closed
            store.evaluate_rollups(bucket + TimeDelta::days(2));

            let minute = store.stream(Resolution::Mean60s);
            let hour = store.stream(Resolution::Mean1h);
            let day = store.stream(Resolution::Mean1d);

            assert_eq!(minute, vec![Reading::new(bucket, 22.0)]);
            assert_eq!(hour.len(), 1);
            assert_eq!(hour[0].timestamp, rollup::bucket_start(bucket, 3_600));
            assert!((hour[0].value - 22.0).abs() < 1e-9);
            assert_eq!(day.len(), 1);
            assert_eq!(day[0].timestamp, rollup::bucket_start(bucket, 86_400));
            assert!((day[0].value - 22.0).abs() < 1e-9);

            // raw points are past the one-hour horizon by now
            assert_eq!(store.stream_len(Resolution::Raw), 0);
        }

        #[tokio::test]
        async fn rollup_output_is_time_ordered() {
            let store = ready_store().await;
            let bucket = recent_minute(30);
            for i in 0..20 {
                store
                    .append(
                        Resolution::Raw,
                        Reading::new(bucket + TimeDelta::seconds(i * 37), i as f64),
                    )
                    .await
                    .unwrap();
            }

            store.evaluate_rollups(bucket + TimeDelta::minutes(5));
            store.evaluate_rollups(bucket + TimeDelta::minutes(14));

            let minutes = store.stream(Resolution::Mean60s);
            assert!(minutes.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        }

        #[tokio::test(start_paused = true)]
        async fn worker_evaluates_in_background() {
            let store = ready_store().await;
            let bucket = recent_minute(5);
            store
                .append(Resolution::Raw, Reading::new(bucket + TimeDelta::seconds(1), 17.0))
                .await
                .unwrap();

            let handle = store.spawn_rollup_worker(Duration::from_secs(10));
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.abort();

            assert_eq!(store.stream(Resolution::Mean60s), vec![Reading::new(bucket, 17.0)]);
        }
    }
}
