//! Application configuration management.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Account lock configuration.
    #[serde(default)]
    pub lock: LockConfig,
    /// Ledger policy configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Apply pending migrations when the server starts.
    #[serde(default)]
    pub auto_migrate: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Where account locks live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockBackend {
    /// Lease rows in the shared database; safe across service instances.
    #[default]
    Database,
    /// Process-local locks; a single service instance only.
    Memory,
}

/// Account lock configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LockConfig {
    /// Lock backend.
    #[serde(default)]
    pub backend: LockBackend,
    /// How long a caller waits for a busy account before giving up.
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
    /// How long an acquired lock lives without an explicit release.
    #[serde(default = "default_lease_timeout_ms")]
    pub lease_timeout_ms: u64,
    /// Polling interval of the database backend while waiting.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            backend: LockBackend::default(),
            wait_timeout_ms: default_wait_timeout_ms(),
            lease_timeout_ms: default_lease_timeout_ms(),
            retry_interval_ms: default_retry_interval_ms(),
        }
    }
}

impl LockConfig {
    /// Wait timeout as a `Duration`.
    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Lease timeout as a `Duration`.
    #[must_use]
    pub const fn lease_timeout(&self) -> Duration {
        Duration::from_millis(self.lease_timeout_ms)
    }

    /// Retry interval as a `Duration`.
    #[must_use]
    pub const fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

fn default_wait_timeout_ms() -> u64 {
    1_000
}

fn default_lease_timeout_ms() -> u64 {
    5_000
}

fn default_retry_interval_ms() -> u64 {
    25
}

/// Ledger policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Maximum number of in-use accounts a single user may hold.
    #[serde(default = "default_max_accounts_per_user")]
    pub max_accounts_per_user: u64,
    /// Age in years after which a transaction can no longer be canceled.
    #[serde(default = "default_cancel_window_years")]
    pub cancel_window_years: u32,
    /// Attempts at generating an unused account number before giving up.
    #[serde(default = "default_account_number_attempts")]
    pub account_number_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_accounts_per_user: default_max_accounts_per_user(),
            cancel_window_years: default_cancel_window_years(),
            account_number_attempts: default_account_number_attempts(),
        }
    }
}

fn default_max_accounts_per_user() -> u64 {
    10
}

fn default_cancel_window_years() -> u32 {
    1
}

fn default_account_number_attempts() -> u32 {
    16
}

impl AppConfig {
    /// Loads configuration from `.env`, environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
