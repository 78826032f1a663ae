//! Storage configuration parsing from environment variables.
//!
//! This module selects the price storage backend and its connection URL.

use anyhow::Result;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Where ingested prices are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "sqlite" => Ok(StorageBackend::Sqlite),
            _ => anyhow::bail!(
                "Invalid STORAGE_BACKEND: {}. Must be 'memory' or 'sqlite'",
                s
            ),
        }
    }
}

impl StorageBackend {
    /// Whether stored prices survive the process
    pub fn is_persistent(self) -> bool {
        matches!(self, StorageBackend::Sqlite)
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Storage environment configuration
#[derive(Debug, Clone)]
pub struct StorageEnvConfig {
    pub backend: StorageBackend,
    pub database_url: String,
}

impl Default for StorageEnvConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database_url: "sqlite://crypto_prices.db".to_string(),
        }
    }
}

impl StorageEnvConfig {
    pub fn from_env() -> Result<Self> {
        let backend_str = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "memory".to_string());
        let backend = StorageBackend::from_str(&backend_str)?;

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://crypto_prices.db".to_string());

        Ok(Self {
            backend,
            database_url,
        })
    }
}
