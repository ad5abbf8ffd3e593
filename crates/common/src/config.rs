//! Application configuration.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Task queue configuration.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Hot list configuration.
    #[serde(default)]
    pub ranking: RankingConfig,
    /// Comment cache configuration.
    #[serde(default)]
    pub comment_cache: CommentCacheConfig,
    /// Push dispatch configuration.
    #[serde(default)]
    pub push: PushConfig,
    /// Outbound email configuration.
    #[serde(default)]
    pub email: EmailConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all Redis keys.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Task queue configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// How often the delayed set is polled for due tasks, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Pause after a failed blocking pop, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

/// Hot list configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    /// Cold start is skipped when the 1-minute load average is above this.
    #[serde(default = "default_load_threshold")]
    pub load_threshold: f64,
    /// Number of posts loaded into the hot list on cold start.
    #[serde(default = "default_cold_start_limit")]
    pub cold_start_limit: u64,
}

/// Comment cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentCacheConfig {
    /// Lifetime of a cached comment list, in seconds.
    #[serde(default = "default_comment_ttl_secs")]
    pub ttl_secs: u64,
    /// Posts older than this many days are never cached.
    #[serde(default = "default_eligible_days")]
    pub eligible_days: i64,
}

/// Push dispatch configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushConfig {
    /// Base URL of the push service, e.g. `http://127.0.0.1:3009`.
    /// Push dispatch is disabled when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Outbound email configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host. Emails are only logged when unset.
    #[serde(default)]
    pub smtp_host: Option<String>,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Sender mailbox.
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

const fn default_max_connections() -> u32 {
    150
}

const fn default_min_connections() -> u32 {
    5
}

fn default_redis_prefix() -> String {
    "hollow".to_string()
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

const fn default_retry_delay_secs() -> u64 {
    5
}

const fn default_load_threshold() -> f64 {
    2.0
}

const fn default_cold_start_limit() -> u64 {
    200
}

const fn default_comment_ttl_secs() -> u64 {
    5 * 60 * 60
}

const fn default_eligible_days() -> i64 {
    365
}

const fn default_smtp_port() -> u16 {
    465
}

fn default_from_address() -> String {
    "Hollow <noreply@localhost>".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl QueueConfig {
    /// Delayed set poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Worker back-off after a store error.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            load_threshold: default_load_threshold(),
            cold_start_limit: default_cold_start_limit(),
        }
    }
}

impl Default for CommentCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_comment_ttl_secs(),
            eligible_days: default_eligible_days(),
        }
    }
}

impl CommentCacheConfig {
    /// Lifetime of a cached comment list.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from_address: default_from_address(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `HOLLOW_ENV`)
    /// 4. Environment variables with `HOLLOW__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("HOLLOW_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("HOLLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("HOLLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
