//! thermod - temperature logger daemon
//!
//! Samples a 1-Wire probe into a time-series store with rollups, and serves
//! the dashboard's time-range queries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use thermo_query::{QueryEngine, QueryWindow};
use thermo_sampler::W1Sensor;
use thermod::Backend;
use thermod::commands;
use thermod::config::{LoggingConfig, ThermoConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_CONFIG: &str = "/etc/thermod/config.toml";

#[derive(Parser)]
#[command(name = "thermod")]
#[command(about = "Temperature logger daemon")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "THERMOD_CONFIG", default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database, retention policy and rollups if missing
    Init,

    /// Sample the sensor into the raw stream until interrupted
    Sample,

    /// Print one series as a JSON line
    Query {
        /// Stream to read (raw, mean_60s, mean_1h, mean_1d)
        #[arg(short, long)]
        resolution: Option<String>,

        /// Window to read, e.g. 1d, 30d, 52w
        #[arg(short, long)]
        lookback: Option<String>,
    },

    /// Print a series every refresh interval
    Watch {
        /// Stream to read (raw, mean_60s, mean_1h, mean_1d)
        #[arg(short, long)]
        resolution: Option<String>,

        /// Window to read, e.g. 1d, 30d, 52w
        #[arg(short, long)]
        lookback: Option<String>,

        /// Milliseconds between refreshes
        #[arg(long)]
        refresh_ms: Option<u64>,
    },

    /// Sample and print a series every refresh interval from one process
    ///
    /// Required for the memory backend, whose data lives in this process.
    Run {
        /// Stream to read (raw, mean_60s, mean_1h, mean_1d)
        #[arg(short, long)]
        resolution: Option<String>,

        /// Window to read, e.g. 1d, 30d, 52w
        #[arg(short, long)]
        lookback: Option<String>,

        /// Milliseconds between refreshes
        #[arg(long)]
        refresh_ms: Option<u64>,
    },

    /// Generate a default config file
    InitConfig {
        /// Path to write config
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::InitConfig { output } => {
            init_config(&output)?;
        }

        Commands::Init => {
            let (_, backend) = load(&cli.config)?;
            backend.require_shared("init")?;
            commands::initialize(&backend).await?;
        }

        Commands::Sample => {
            let (config, backend) = load(&cli.config)?;
            backend.require_shared("sample")?;
            let sensor = W1Sensor::new(config.sensor.device_path.clone());
            let interval = config.sampler.interval();
            commands::sample(backend, sensor, interval, shutdown_signal()).await?;
        }

        Commands::Query {
            resolution,
            lookback,
        } => {
            let (config, backend) = load(&cli.config)?;
            backend.require_shared("query")?;
            let window = window(&config, resolution, lookback)?;
            let engine = QueryEngine::new(backend).with_timezone(config.query.timezone()?);
            commands::query_once(&engine, &window, &mut std::io::stdout()).await?;
        }

        Commands::Watch {
            resolution,
            lookback,
            refresh_ms,
        } => {
            let (config, backend) = load(&cli.config)?;
            backend.require_shared("watch")?;
            let window = window(&config, resolution, lookback)?;
            let refresh = refresh(&config, refresh_ms)?;

            let engine = QueryEngine::new(backend).with_timezone(config.query.timezone()?);
            let mut out = std::io::stdout();
            tokio::select! {
                result = commands::watch(&engine, &window, refresh, None, &mut out) => result?,
                () = shutdown_signal() => info!("watch stopping"),
            }
        }

        Commands::Run {
            resolution,
            lookback,
            refresh_ms,
        } => {
            let (config, backend) = load(&cli.config)?;
            let window = window(&config, resolution, lookback)?;
            let refresh = refresh(&config, refresh_ms)?;
            let _rollups = backend.spawn_rollups();

            let sensor = W1Sensor::new(config.sensor.device_path.clone());
            let engine = QueryEngine::new(backend).with_timezone(config.query.timezone()?);
            commands::run(
                &engine,
                sensor,
                config.sampler.interval(),
                &window,
                refresh,
                &mut std::io::stdout(),
                shutdown_signal(),
            )
            .await?;
        }
    }

    Ok(())
}

/// Loads the config, installs logging and builds the store.
fn load(path: &Path) -> anyhow::Result<(ThermoConfig, Backend)> {
    let config = ThermoConfig::from_file(path)?;
    init_tracing(&config.logging)?;
    info!(config = %path.display(), backend = ?config.store.backend, "loaded config");

    let backend = Backend::from_config(&config.store)?;
    Ok((config, backend))
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let level = &logging.level;
            EnvFilter::try_new(format!(
                "thermod={level},thermo_store={level},thermo_sampler={level},thermo_query={level}"
            ))?
        }
    };

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
    Ok(())
}

fn window(
    config: &ThermoConfig,
    resolution: Option<String>,
    lookback: Option<String>,
) -> anyhow::Result<QueryWindow> {
    let resolution = resolution.unwrap_or_else(|| config.query.resolution.clone());
    let lookback = lookback.unwrap_or_else(|| config.query.lookback.clone());
    Ok(QueryWindow::parse(&resolution, &lookback)?)
}

fn refresh(config: &ThermoConfig, refresh_ms: Option<u64>) -> anyhow::Result<Duration> {
    let refresh = refresh_ms.map_or_else(|| config.query.refresh_interval(), Duration::from_millis);
    anyhow::ensure!(!refresh.is_zero(), "refresh interval must be greater than 0");
    Ok(refresh)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn init_config(output: &Path) -> anyhow::Result<()> {
    ThermoConfig::default().save(output)?;

    println!("Config written to {}", output.display());
    println!();
    println!("Edit the sensor path and store url, then run:");
    println!("  thermod --config {} init", output.display());
    println!("  thermod --config {} sample", output.display());

    Ok(())
}
