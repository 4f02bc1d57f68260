//! InfluxDB 1.x backend over the HTTP API.
//!
//! Statements go to `/query`, points to `/write`. The rollup chain is
//! registered as continuous queries so the server evaluates it, and the raw
//! retention horizon is the database's default retention policy.

mod response;
pub mod statement;

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Result, StoreError};
use crate::lookback::Lookback;
use crate::store::Store;
use crate::types::{Reading, Resolution, RetentionPolicy, RollupRule};

use response::QueryResponse;
use statement::{Statement, line_protocol};

/// Connection settings for [`InfluxStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluxConfig {
    /// Base URL of the server, e.g. `http://localhost:8086`.
    pub url: String,
    /// Database to bind the handle to.
    pub database: String,
    /// Upper bound for every request.
    pub timeout: Duration,
}

impl InfluxConfig {
    /// Creates a config with the default five second timeout.
    #[must_use]
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self::new("http://localhost:8086", "sensor_data")
    }
}

/// Store handle talking to an InfluxDB 1.x server.
#[derive(Debug, Clone)]
pub struct InfluxStore {
    client: Client,
    base_url: Url,
    database: String,
}

impl InfluxStore {
    /// Builds a handle. No request is made until the first operation.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidConfig` for an unparsable or non-HTTP URL,
    /// an empty database name or a zero timeout.
    pub fn new(config: &InfluxConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url).map_err(|e| StoreError::InvalidConfig {
            reason: format!("invalid url '{}': {e}", config.url),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(StoreError::InvalidConfig {
                reason: format!("unsupported url scheme '{}'", base_url.scheme()),
            });
        }
        if config.database.is_empty() {
            return Err(StoreError::InvalidConfig {
                reason: "database name cannot be empty".to_string(),
            });
        }
        if config.timeout.is_zero() {
            return Err(StoreError::InvalidConfig {
                reason: "timeout must be greater than zero".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::InvalidConfig {
                reason: format!("failed to build http client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            database: config.database.clone(),
        })
    }

    /// The server this handle talks to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| StoreError::InvalidConfig {
                reason: format!("cannot build {path} url: {e}"),
            })
    }

    /// Runs one statement against `/query`.
    async fn execute(&self, statement: &Statement<'_>) -> Result<QueryResponse> {
        let url = self.endpoint("query")?;
        let text = statement.to_string();
        debug!(statement = %text, "executing statement");

        let mut params = vec![("q", text.as_str()), ("epoch", "ms")];
        if !matches!(
            statement,
            Statement::ShowDatabases | Statement::CreateDatabase { .. }
        ) {
            params.push(("db", self.database.as_str()));
        }

        let request = if statement.is_mutating() {
            self.client.post(url).form(&params)
        } else {
            self.client.get(url).query(&params)
        };

        let body = send(request).await?;
        QueryResponse::parse(&body)
    }
}

/// Sends a request and returns the body of a successful response.
///
/// Transport failures, timeouts and server errors are reported as
/// `Unavailable`; client errors mean the server rejected the request.
async fn send(request: RequestBuilder) -> Result<String> {
    let response = request.send().await.map_err(|e| {
        warn!(error = %e, "influx request failed");
        StoreError::Unavailable {
            reason: if e.is_timeout() {
                format!("request timed out: {e}")
            } else {
                e.to_string()
            },
        }
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| StoreError::Unavailable {
        reason: format!("failed to read response body: {e}"),
    })?;

    classify(status, body)
}

fn classify(status: StatusCode, body: String) -> Result<String> {
    if status.is_success() {
        Ok(body)
    } else if status.is_server_error() {
        Err(StoreError::Unavailable {
            reason: format!("server returned {status}: {}", body.trim()),
        })
    } else {
        Err(StoreError::Backend {
            reason: format!("server returned {status}: {}", body.trim()),
        })
    }
}

impl Store for InfluxStore {
    fn database(&self) -> &str {
        &self.database
    }

    async fn ensure_initialized(&self) -> Result<bool> {
        let database = self.database.as_str();
        let mut created = false;

        let databases = self.execute(&Statement::ShowDatabases).await?.names();
        if !databases.iter().any(|n| n == database) {
            self.execute(&Statement::CreateDatabase { database }).await?;
            info!(database, "created database");
            created = true;
        }

        // Each object is checked on its own so a setup interrupted after
        // CREATE DATABASE is completed on the next start.
        let policy = RetentionPolicy::raw_one_hour();
        let policies = self
            .execute(&Statement::ShowRetentionPolicies { database })
            .await?
            .names();
        if !policies.contains(&policy.name) {
            self.execute(&Statement::CreateRetentionPolicy {
                database,
                policy: &policy,
            })
            .await?;
            info!(database, policy = %policy.name, "created retention policy");
            created = true;
        }

        let queries = self
            .execute(&Statement::ShowContinuousQueries)
            .await?
            .names_in(database);
        for rule in &RollupRule::chain() {
            let name = rule.name();
            if queries.contains(&name) {
                continue;
            }
            self.execute(&Statement::CreateContinuousQuery { database, rule })
                .await?;
            info!(database, query = %name, "created continuous query");
            created = true;
        }

        if !created {
            debug!(database, "database already initialized");
        }
        Ok(created)
    }

    async fn append(&self, stream: Resolution, reading: Reading) -> Result<()> {
        if stream.is_derived() {
            return Err(StoreError::DerivedStreamWrite {
                stream: stream.to_string(),
            });
        }
        reading.validate()?;

        let mut url = self.endpoint("write")?;
        url.query_pairs_mut()
            .append_pair("db", &self.database)
            .append_pair("precision", "ms");

        send(self.client.post(url).body(line_protocol(&reading))).await?;
        debug!(stream = %stream, value = reading.value, "appended reading");
        Ok(())
    }

    async fn query(&self, stream: Resolution, since: Lookback) -> Result<Vec<Reading>> {
        let response = self
            .execute(&Statement::SelectSince { stream, since })
            .await?;
        response.readings()
    }
}
