//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

/// Kernel configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// MySQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// TTL for the in-process filter-state cache, in seconds (default: 60).
    pub filter_cache_ttl_secs: u64,

    /// Default page size for catalog listings (default: 20).
    pub default_page_size: u64,

    /// ISO currency code used when formatting prices (default: EUR).
    pub currency_iso: String,

    /// Decimal precision for computed final prices (default: 2).
    pub price_precision: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let filter_cache_ttl_secs = env::var("FILTER_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("FILTER_CACHE_TTL_SECS must be a valid u64")?;

        let default_page_size = env::var("DEFAULT_PAGE_SIZE")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .context("DEFAULT_PAGE_SIZE must be a valid u64")?;

        let currency_iso = env::var("CURRENCY_ISO").unwrap_or_else(|_| "EUR".to_string());

        let price_precision = env::var("PRICE_PRECISION")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .context("PRICE_PRECISION must be a valid u32")?;

        Ok(Self {
            database_url,
            database_max_connections,
            filter_cache_ttl_secs,
            default_page_size,
            currency_iso,
            price_precision,
        })
    }
}

/// Config usable in tests without touching the environment.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "mysql://localhost/vetrina_test".to_string(),
        database_max_connections: 2,
        filter_cache_ttl_secs: 60,
        default_page_size: 20,
        currency_iso: "EUR".to_string(),
        price_precision: 2,
    }
}
