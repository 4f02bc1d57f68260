//! Daemon configuration.
//!
//! Loaded from a TOML file with one section per concern:
//! - `[store]`: backend selection and connection
//! - `[sensor]`: device file of the probe
//! - `[sampler]`: tick interval
//! - `[query]`: dashboard defaults and display timezone
//! - `[logging]`: level and output format

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thermo_query::QueryWindow;
use thermo_sampler::DEFAULT_W1_DEVICE;
use thermo_store::InfluxConfig;
use url::Url;

use crate::error::{Result, ThermodError};

/// Which store implementation to use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// InfluxDB 1.x over HTTP.
    #[default]
    Influx,
    /// The in-process engine. Data does not outlive the process, so only
    /// `thermod run` accepts it.
    Memory,
}

/// Store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend to use.
    pub backend: BackendKind,
    /// Server URL for the influx backend.
    pub url: String,
    /// Database name.
    pub database: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Influx,
            url: "http://localhost:8086".to_string(),
            database: "sensor_data".to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    /// Connection settings for the influx backend.
    #[must_use]
    pub fn influx(&self) -> InfluxConfig {
        InfluxConfig::new(&self.url, &self.database)
            .with_timeout(Duration::from_millis(self.timeout_ms))
    }
}

/// Sensor settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SensorConfig {
    /// The probe's `w1_slave` file.
    pub device_path: PathBuf,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(DEFAULT_W1_DEVICE),
        }
    }
}

/// Sampler settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SamplerConfig {
    /// Seconds between ticks.
    pub interval_seconds: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 5,
        }
    }
}

impl SamplerConfig {
    /// The tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Dashboard query defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueryConfig {
    /// Stream to show.
    pub resolution: String,
    /// Window to show.
    pub lookback: String,
    /// Milliseconds between refreshes in `watch`.
    pub refresh_interval_ms: u64,
    /// IANA name of the display timezone.
    pub timezone: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            resolution: "mean_60s".to_string(),
            lookback: "1d".to_string(),
            refresh_interval_ms: 60_000,
            timezone: "Europe/Berlin".to_string(),
        }
    }
}

impl QueryConfig {
    /// Parses the configured window.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown resolution or a malformed lookback.
    pub fn window(&self) -> Result<QueryWindow> {
        Ok(QueryWindow::parse(&self.resolution, &self.lookback)?)
    }

    /// Parses the configured timezone.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not in the IANA database.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| ThermodError::Config(format!("unknown timezone '{}'", self.timezone)))
    }

    /// Time between dashboard refreshes.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for the thermo crates when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Main daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ThermoConfig {
    /// Store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Sensor configuration.
    #[serde(default)]
    pub sensor: SensorConfig,
    /// Sampler configuration.
    #[serde(default)]
    pub sampler: SamplerConfig,
    /// Query configuration.
    #[serde(default)]
    pub query: QueryConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ThermoConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ThermodError::Config(format!(
                "failed to read config file '{}': {e}",
                path.as_ref().display()
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ThermodError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| ThermodError::Config(format!("failed to serialize config: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.store.database.is_empty() {
            return Err(ThermodError::Config(
                "store.database cannot be empty".to_string(),
            ));
        }

        if self.store.timeout_ms == 0 {
            return Err(ThermodError::Config(
                "store.timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.store.backend == BackendKind::Influx {
            let url = Url::parse(&self.store.url)
                .map_err(|e| ThermodError::Config(format!("invalid store.url: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ThermodError::Config(
                    "store.url must start with http:// or https://".to_string(),
                ));
            }
        }

        if self.sampler.interval_seconds == 0 {
            return Err(ThermodError::Config(
                "sampler.interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.query.refresh_interval_ms == 0 {
            return Err(ThermodError::Config(
                "query.refresh_interval_ms must be greater than 0".to_string(),
            ));
        }

        self.query.window()?;
        self.query.timezone()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("failed to write temp file");
        file
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ThermoConfig::from_toml("").expect("should parse empty config");

        assert_eq!(config, ThermoConfig::default());
        assert_eq!(config.store.backend, BackendKind::Influx);
        assert_eq!(config.store.database, "sensor_data");
        assert_eq!(config.sampler.interval(), Duration::from_secs(5));
        assert_eq!(config.query.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.query.timezone().unwrap(), chrono_tz::Europe::Berlin);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [store]
            backend = "memory"
            url = "http://influx.local:8086"
            database = "greenhouse"
            timeout_ms = 2000

            [sensor]
            device_path = "/tmp/w1_slave"

            [sampler]
            interval_seconds = 10

            [query]
            resolution = "mean_1h"
            lookback = "30d"
            refresh_interval_ms = 30000
            timezone = "Europe/Vienna"

            [logging]
            level = "debug"
            json = true
        "#;

        let config = ThermoConfig::from_toml(toml).expect("should parse full config");

        assert_eq!(config.store.backend, BackendKind::Memory);
        assert_eq!(config.store.database, "greenhouse");
        assert_eq!(config.sensor.device_path, PathBuf::from("/tmp/w1_slave"));
        assert_eq!(config.sampler.interval_seconds, 10);
        assert_eq!(config.query.window().unwrap().lookback.to_string(), "30d");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);

        let influx = config.store.influx();
        assert_eq!(influx.url, "http://influx.local:8086");
        assert_eq!(influx.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let toml = r#"
            [query]
            lookback = "52w"
        "#;

        let config = ThermoConfig::from_toml(toml).expect("should parse");
        assert_eq!(config.query.lookback, "52w");
        assert_eq!(config.query.resolution, "mean_60s");
        assert_eq!(config.query.refresh_interval_ms, 60_000);
    }

    #[test]
    fn test_load_from_file() {
        let temp_file = create_temp_config("[store]\ndatabase = \"file_db\"\n");
        let config = ThermoConfig::from_file(temp_file.path()).expect("should load from file");
        assert_eq!(config.store.database, "file_db");
    }

    #[test]
    fn test_file_not_found() {
        let result = ThermoConfig::from_file("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ThermodError::Config(_))));
    }

    #[test]
    fn test_empty_database_rejected() {
        let err = ThermoConfig::from_toml("[store]\ndatabase = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("store.database cannot be empty"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ThermoConfig::from_toml("[store]\ntimeout_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_ms must be greater than 0"));
    }

    #[test]
    fn test_bad_url_scheme_rejected() {
        let err = ThermoConfig::from_toml("[store]\nurl = \"ftp://localhost:8086\"\n").unwrap_err();
        assert!(err.to_string().contains("http:// or https://"));
    }

    #[test]
    fn test_url_ignored_for_memory_backend() {
        let toml = "[store]\nbackend = \"memory\"\nurl = \"\"\n";
        assert!(ThermoConfig::from_toml(toml).is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = ThermoConfig::from_toml("[sampler]\ninterval_seconds = 0\n").unwrap_err();
        assert!(err.to_string().contains("interval_seconds must be greater than 0"));
    }

    #[test]
    fn test_zero_refresh_rejected() {
        let err = ThermoConfig::from_toml("[query]\nrefresh_interval_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("refresh_interval_ms must be greater than 0"));
    }

    #[test]
    fn test_unknown_resolution_rejected() {
        let err = ThermoConfig::from_toml("[query]\nresolution = \"mean_5m\"\n").unwrap_err();
        assert!(err.to_string().contains("mean_5m"));
    }

    #[test]
    fn test_bad_lookback_rejected() {
        let err = ThermoConfig::from_toml("[query]\nlookback = \"1 day\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid lookback"));
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let err = ThermoConfig::from_toml("[query]\ntimezone = \"CEST\"\n").unwrap_err();
        assert!(err.to_string().contains("unknown timezone"));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = ThermoConfig::from_toml("[store]\nbackend = \"sqlite\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut original = ThermoConfig::default();
        original.store.backend = BackendKind::Memory;
        original.query.lookback = "30d".to_string();
        original.save(&path).expect("should save");

        let reloaded = ThermoConfig::from_file(&path).expect("should reload");
        assert_eq!(original, reloaded);
    }
}
