use std::net::SocketAddr;

use serde::Deserialize;
use memotrack_core::error::{MemoTrackError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub database: DatabaseSection,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MemoTrackError::UnsupportedVersion);
        }

        self.server.validate()?;
        self.metrics.validate()?;
        self.database.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            MemoTrackError::BadRequest(format!("server.listen must be a valid SocketAddr: {e}"))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,

    /// Upper bounds (seconds) for the request duration histogram.
    #[serde(default = "default_request_duration_buckets")]
    pub request_duration_buckets: Vec<f64>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            refresh_timeout_ms: default_refresh_timeout_ms(),
            request_duration_buckets: default_request_duration_buckets(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=3_600_000).contains(&self.refresh_interval_ms) {
            return Err(MemoTrackError::BadRequest(
                "metrics.refresh_interval_ms must be between 1000 and 3600000".into(),
            ));
        }
        if self.refresh_timeout_ms == 0 || self.refresh_timeout_ms >= self.refresh_interval_ms {
            return Err(MemoTrackError::BadRequest(
                "metrics.refresh_timeout_ms must be positive and less than refresh_interval_ms".into(),
            ));
        }
        let b = &self.request_duration_buckets;
        if b.is_empty() || b.iter().any(|v| !v.is_finite()) || b.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MemoTrackError::BadRequest(
                "metrics.request_duration_buckets must be non-empty, finite, and strictly ascending".into(),
            ));
        }
        Ok(())
    }
}

fn default_refresh_interval_ms() -> u64 {
    30_000
}
fn default_refresh_timeout_ms() -> u64 {
    5_000
}
fn default_request_duration_buckets() -> Vec<f64> {
    vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    /// Postgres URL. When absent the server runs on the in-memory store.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.max_connections) {
            return Err(MemoTrackError::BadRequest(
                "database.max_connections must be between 1 and 100".into(),
            ));
        }
        if matches!(&self.url, Some(u) if u.trim().is_empty()) {
            return Err(MemoTrackError::BadRequest("database.url must not be empty".into()));
        }
        Ok(())
    }
}

fn default_max_connections() -> u32 {
    5
}
