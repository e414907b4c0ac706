//! Ledger database settings.
//!
//! One pool serves the webhook handlers and both reconciliation loops.

use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use super::error::ValidationError;

const MAX_POOL_SIZE: u32 = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` or `postgresql://` connection string
    pub url: String,

    #[serde(default)]
    pub pool: PoolConfig,

    /// Apply the embedded migrations before serving
    #[serde(default = "migrate_by_default")]
    pub migrate_on_start: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PoolConfig {
    pub max_size: u32,
    pub min_idle: u32,
    /// A webhook waiting longer than this for a connection fails and is redelivered
    pub acquire_timeout_secs: u64,
    /// `None` keeps idle connections open
    pub idle_timeout_secs: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            min_idle: 1,
            acquire_timeout_secs: 3,
            idle_timeout_secs: Some(300),
        }
    }
}

fn migrate_by_default() -> bool {
    true
}

impl DatabaseConfig {
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.pool.max_size)
            .min_connections(self.pool.min_idle)
            .acquire_timeout(Duration::from_secs(self.pool.acquire_timeout_secs))
            .idle_timeout(self.pool.idle_timeout_secs.map(Duration::from_secs))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.url.split_once("://") {
            _ if self.url.trim().is_empty() => {
                return Err(ValidationError::MissingRequired("database.url"))
            }
            Some(("postgres" | "postgresql", rest)) if !rest.is_empty() => {}
            _ => return Err(ValidationError::InvalidDatabaseUrl),
        }

        let pool = &self.pool;
        if pool.max_size == 0 || pool.min_idle > pool.max_size {
            return Err(ValidationError::InvalidPoolSize);
        }
        if pool.max_size > MAX_POOL_SIZE {
            return Err(ValidationError::PoolSizeTooLarge(MAX_POOL_SIZE));
        }
        if pool.acquire_timeout_secs == 0 {
            return Err(ValidationError::InvalidInterval("database.pool.acquire_timeout_secs"));
        }
        Ok(())
    }
}
