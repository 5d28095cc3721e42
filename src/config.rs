use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::probe::ProbeSettings;
use crate::worker::WorkerSettings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Shared secret expected in `Authorization: Bearer <secret>` on the cron trigger.
    pub cron_secret: Option<String>,
    pub listen_addr: String,
    pub queue_backend: QueueBackend,
    pub visibility_timeout_seconds: u64,
    pub receive_batch_size: usize,
    pub receive_wait_seconds: u64,
    pub http_timeout_seconds: u64,
    pub cron_freshness_seconds: u64,
    /// When set, the server also runs the scheduler on its own ticker.
    pub scheduler_interval_seconds: Option<u64>,
    pub redelivery_warn_threshold: u32,
    pub log_dir: String,
    pub db_max_connections: u32,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialAppConfig {
    database_url: Option<String>,
    cron_secret: Option<String>,
    listen_addr: Option<String>,
    queue_backend: Option<QueueBackend>,
    visibility_timeout_seconds: Option<u64>,
    receive_batch_size: Option<usize>,
    receive_wait_seconds: Option<u64>,
    http_timeout_seconds: Option<u64>,
    cron_freshness_seconds: Option<u64>,
    scheduler_interval_seconds: Option<u64>,
    redelivery_warn_threshold: Option<u32>,
    log_dir: Option<String>,
    db_max_connections: Option<u32>,
}

impl PartialAppConfig {
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let display = path.display().to_string();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    /// Fields set in `self` win over `fallback`.
    fn or(self, fallback: Self) -> Self {
        Self {
            database_url: self.database_url.or(fallback.database_url),
            cron_secret: self.cron_secret.or(fallback.cron_secret),
            listen_addr: self.listen_addr.or(fallback.listen_addr),
            queue_backend: self.queue_backend.or(fallback.queue_backend),
            visibility_timeout_seconds: self
                .visibility_timeout_seconds
                .or(fallback.visibility_timeout_seconds),
            receive_batch_size: self.receive_batch_size.or(fallback.receive_batch_size),
            receive_wait_seconds: self.receive_wait_seconds.or(fallback.receive_wait_seconds),
            http_timeout_seconds: self.http_timeout_seconds.or(fallback.http_timeout_seconds),
            cron_freshness_seconds: self
                .cron_freshness_seconds
                .or(fallback.cron_freshness_seconds),
            scheduler_interval_seconds: self
                .scheduler_interval_seconds
                .or(fallback.scheduler_interval_seconds),
            redelivery_warn_threshold: self
                .redelivery_warn_threshold
                .or(fallback.redelivery_warn_threshold),
            log_dir: self.log_dir.or(fallback.log_dir),
            db_max_connections: self.db_max_connections.or(fallback.db_max_connections),
        }
    }
}

impl AppConfig {
    /// Loads the config file (if any), then lets environment variables override it.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path) => PartialAppConfig::from_file(Path::new(path))?,
            None => PartialAppConfig::default(),
        };
        let env_config = envy::from_env::<PartialAppConfig>()?;

        Self::resolve(env_config.or(file_config))
    }

    fn resolve(partial: PartialAppConfig) -> Result<Self, ConfigError> {
        let config = AppConfig {
            database_url: partial
                .database_url
                .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            cron_secret: partial.cron_secret.filter(|s| !s.is_empty()),
            listen_addr: partial
                .listen_addr
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            queue_backend: partial.queue_backend.unwrap_or(QueueBackend::Postgres),
            visibility_timeout_seconds: partial.visibility_timeout_seconds.unwrap_or(60),
            receive_batch_size: partial.receive_batch_size.unwrap_or(10),
            receive_wait_seconds: partial.receive_wait_seconds.unwrap_or(20),
            http_timeout_seconds: partial.http_timeout_seconds.unwrap_or(10),
            cron_freshness_seconds: partial.cron_freshness_seconds.unwrap_or(120),
            scheduler_interval_seconds: partial.scheduler_interval_seconds,
            redelivery_warn_threshold: partial.redelivery_warn_threshold.unwrap_or(5),
            log_dir: partial.log_dir.unwrap_or_else(|| "logs".to_string()),
            db_max_connections: partial.db_max_connections.unwrap_or(10),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.receive_batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "RECEIVE_BATCH_SIZE",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.http_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "HTTP_TIMEOUT_SECONDS",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scheduler_interval_seconds == Some(0) {
            return Err(ConfigError::Invalid {
                field: "SCHEDULER_INTERVAL_SECONDS",
                reason: "must be at least 1".to_string(),
            });
        }
        // A job still being processed must not become visible to another
        // worker: one probe plus one round of notification deliveries.
        let job_budget = self.http_timeout_seconds.saturating_mul(2);
        if self.visibility_timeout_seconds <= job_budget {
            return Err(ConfigError::Invalid {
                field: "VISIBILITY_TIMEOUT_SECONDS",
                reason: format!(
                    "must exceed twice HTTP_TIMEOUT_SECONDS ({job_budget})"
                ),
            });
        }
        Ok(())
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }

    /// Bound on each notification delivery; webhooks share the probe timeout.
    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            http_timeout: Duration::from_secs(self.http_timeout_seconds),
            cron_freshness: Duration::from_secs(self.cron_freshness_seconds),
        }
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            batch_size: self.receive_batch_size,
            receive_wait: Duration::from_secs(self.receive_wait_seconds),
            redelivery_warn_threshold: self.redelivery_warn_threshold,
        }
    }
}
