//! Subcommand implementations, generic over the store so they can be driven
//! by the embedded engine in tests.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use thermo_query::{QueryEngine, QueryWindow};
use thermo_sampler::{Sampler, SensorSource};
use thermo_store::Store;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::error::Result;

/// Creates the database, retention policy and rollup chain if missing.
///
/// # Errors
///
/// Any store failure; callers treat it as fatal.
pub async fn initialize<S: Store>(store: &S) -> Result<bool> {
    let created = store.ensure_initialized().await?;
    if created {
        info!(database = %store.database(), "database initialized");
    } else {
        info!(database = %store.database(), "database already present");
    }
    Ok(created)
}

/// Initializes the store, then samples until `shutdown` resolves.
///
/// # Errors
///
/// Only initialization failures are returned; tick failures are logged by
/// the sampler.
pub async fn sample<S, R>(
    store: S,
    sensor: R,
    interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    S: Store,
    R: SensorSource,
{
    initialize(&store).await?;
    let sampler = Sampler::new(store, sensor).with_interval(interval);

    tokio::select! {
        () = sampler.run() => {}
        () = shutdown => info!("sampler stopping"),
    }
    Ok(())
}

/// Runs one query and writes the series as a JSON line.
///
/// # Errors
///
/// Query failures and write failures.
pub async fn query_once<S: Store>(
    engine: &QueryEngine<S>,
    window: &QueryWindow,
    out: &mut impl Write,
) -> Result<()> {
    let series = engine.series(window).await?;
    serde_json::to_writer(&mut *out, &series)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Samples and serves the dashboard from one process.
///
/// The sampler writes through a clone of the engine's store handle, so the
/// in-process engine can be queried while it is being fed. Runs until
/// `shutdown` resolves.
///
/// # Errors
///
/// Initialization failures and write failures on `out`.
pub async fn run<S, R>(
    engine: &QueryEngine<S>,
    sensor: R,
    interval: Duration,
    window: &QueryWindow,
    refresh: Duration,
    out: &mut impl Write,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    S: Store + Clone,
    R: SensorSource,
{
    initialize(engine.store()).await?;
    let sampler = Sampler::new(engine.store().clone(), sensor).with_interval(interval);

    tokio::select! {
        () = sampler.run() => {}
        result = watch(engine, window, refresh, None, out) => result?,
        () = shutdown => info!("stopping"),
    }
    Ok(())
}

/// Re-queries `window` every `refresh` and writes each series as a JSON line.
///
/// A failed refresh is logged and the next one is attempted on schedule.
/// Stops after `limit` refreshes when given, otherwise runs until dropped.
///
/// # Errors
///
/// Only write failures end the loop.
pub async fn watch<S: Store>(
    engine: &QueryEngine<S>,
    window: &QueryWindow,
    refresh: Duration,
    limit: Option<usize>,
    out: &mut impl Write,
) -> Result<()> {
    let mut interval = tokio::time::interval(refresh);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut done = 0;
    while limit.is_none_or(|n| done < n) {
        interval.tick().await;
        match engine.series(window).await {
            Ok(series) => {
                serde_json::to_writer(&mut *out, &series)?;
                writeln!(out)?;
                out.flush()?;
            }
            Err(e) => warn!(error = %e, "refresh failed"),
        }
        done += 1;
    }
    Ok(())
}
