//! Engine configuration.

use std::time::Duration;

use thiserror::Error;

use crate::storage::PoolSettings;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:tesouro.db";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid number: {value}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("database url must not be empty")]
    EmptyDatabaseUrl,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// SQLite connection url.
    pub database_url: String,
    /// Pool size; bounds how many units can be in flight at once.
    pub max_connections: u32,
    /// How long a unit waits on another unit's row lock.
    pub busy_timeout: Duration,
    /// Deadline for a whole operation, lock wait included.
    pub operation_timeout: Duration,
    /// Candidates tried before giving up on a colliding transfer key.
    pub key_generation_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 8,
            busy_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(10),
            key_generation_attempts: 5,
        }
    }
}

impl LedgerConfig {
    /// Build from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("TESOURO_DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(n) = parse_var(&lookup, "TESOURO_MAX_CONNECTIONS")? {
            config.max_connections = n as u32;
        }
        if let Some(ms) = parse_var(&lookup, "TESOURO_BUSY_TIMEOUT_MS")? {
            config.busy_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "TESOURO_OPERATION_TIMEOUT_MS")? {
            config.operation_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var(&lookup, "TESOURO_KEY_ATTEMPTS")? {
            config.key_generation_attempts = n as u32;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Zero("max_connections"));
        }
        if self.operation_timeout.is_zero() {
            return Err(ConfigError::Zero("operation_timeout"));
        }
        if self.key_generation_attempts == 0 {
            return Err(ConfigError::Zero("key_generation_attempts"));
        }
        Ok(())
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            busy_timeout: self.busy_timeout,
        }
    }
}

fn parse_var(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u32>()
            .map(|n| Some(u64::from(n)))
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}
