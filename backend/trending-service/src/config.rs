use crate::error::AppError;
use crate::services::event_queue::DEFAULT_QUEUE_CAPACITY;
use crate::services::leaderboard::DEFAULT_LEADERBOARD_KEY;
use crate::services::ranking_updater::DEFAULT_TOP_N;
use crate::websocket::pubsub::DEFAULT_NOTIFY_CHANNEL;
use crate::websocket::DEFAULT_OUTBOUND_BUFFER;
use dotenvy::dotenv;
use serde::Deserialize;
use std::time::Duration;

/// Upper bound for `TOP_N` and the `limit` query parameter
pub const MAX_TOP_N: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardBackend {
    Redis,
    Memory,
}

/// How ranking snapshots reach the websocket hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyTransport {
    /// PUBLISH on a Redis channel; every instance's bridge rebroadcasts it
    Redis,
    /// Direct call into this process's hub
    Local,
}

/// Service configuration read from the environment (`PORT`, `REDIS_URL`, ...)
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Postgres URL of the video store; counters stay in memory when unset
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_leaderboard_backend")]
    pub leaderboard_backend: LeaderboardBackend,
    #[serde(default = "default_notify_transport")]
    pub notify_transport: NotifyTransport,
    #[serde(default = "default_leaderboard_key")]
    pub leaderboard_key: String,
    #[serde(default = "default_notify_channel")]
    pub notify_channel: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_port() -> u16 {
    8081
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_leaderboard_backend() -> LeaderboardBackend {
    LeaderboardBackend::Redis
}

fn default_notify_transport() -> NotifyTransport {
    NotifyTransport::Redis
}

fn default_leaderboard_key() -> String {
    DEFAULT_LEADERBOARD_KEY.to_string()
}

fn default_notify_channel() -> String {
    DEFAULT_NOTIFY_CHANNEL.to_string()
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_outbound_buffer() -> usize {
    DEFAULT_OUTBOUND_BUFFER
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        let config: Config =
            envy::from_env().map_err(|e| AppError::Config(format!("environment: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Build from explicit key/value pairs, keys named like the env vars
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let config: Config = envy::from_iter(pairs.into_iter().map(|(k, v)| (k.into(), v.into())))
            .map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.top_n == 0 || self.top_n > MAX_TOP_N {
            return Err(AppError::Config(format!(
                "TOP_N must be between 1 and {MAX_TOP_N}"
            )));
        }
        if self.queue_capacity == 0 {
            return Err(AppError::Config("QUEUE_CAPACITY must be positive".into()));
        }
        if self.outbound_buffer == 0 {
            return Err(AppError::Config("OUTBOUND_BUFFER must be positive".into()));
        }
        if self.leaderboard_key.trim().is_empty() || self.notify_channel.trim().is_empty() {
            return Err(AppError::Config(
                "LEADERBOARD_KEY and NOTIFY_CHANNEL must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn needs_redis(&self) -> bool {
        self.leaderboard_backend == LeaderboardBackend::Redis
            || self.notify_transport == NotifyTransport::Redis
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
