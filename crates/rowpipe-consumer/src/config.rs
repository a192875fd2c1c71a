//! Configuration management

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConsumerError, ConsumerResult},
    worker::CONCURRENCY_LIMIT,
};

// ============================================================================
// Consumer Configuration Constants
// ============================================================================

/// Default maximum database connections in the per-invocation pool.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Default time to wait for a pooled connection, in seconds.
pub const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Default MySQL port when the host parameter carries none.
pub const DEFAULT_DB_PORT: u16 = 3306;

/// Consumer function configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Queue the consumed messages are deleted from
    pub queue_url: String,
    pub region: Option<String>,
    pub database: PoolConfig,
    /// Prepended to `/{env}/MYSQL_*` parameter names
    pub parameter_prefix: String,
}

/// Per-invocation pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub port: u16,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
            port: DEFAULT_DB_PORT,
        }
    }
}

impl ConsumerConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> ConsumerResult<Self> {
        dotenvy::dotenv().ok();

        let queue_url = std::env::var("QUEUE_URL")
            .map_err(|_| ConsumerError::Config("QUEUE_URL not set".to_string()))?;

        let config = Self {
            queue_url,
            region: std::env::var("AWS_REGION").ok(),
            database: PoolConfig {
                max_connections: std::env::var("DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
                acquire_timeout_secs: std::env::var("DB_ACQUIRE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS),
                port: std::env::var("DB_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DB_PORT),
            },
            parameter_prefix: std::env::var("PARAMETER_PREFIX")
                .map(|p| p.trim_end_matches('/').to_string())
                .unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConsumerResult<()> {
        if self.queue_url.trim().is_empty() {
            return Err(ConsumerError::Config("QUEUE_URL cannot be empty".to_string()));
        }

        // A window waits on every one of its records, so a smaller pool stalls.
        if (self.database.max_connections as usize) < CONCURRENCY_LIMIT {
            return Err(ConsumerError::Config(format!(
                "DB_MAX_CONNECTIONS ({}) must be at least the concurrency limit ({})",
                self.database.max_connections, CONCURRENCY_LIMIT
            )));
        }

        if self.database.acquire_timeout_secs == 0 {
            return Err(ConsumerError::Config(
                "DB_ACQUIRE_TIMEOUT must be greater than 0".to_string(),
            ));
        }

        if !self.parameter_prefix.is_empty() && !self.parameter_prefix.starts_with('/') {
            return Err(ConsumerError::Config(format!(
                "PARAMETER_PREFIX must start with '/', got '{}'",
                self.parameter_prefix
            )));
        }

        Ok(())
    }
}
