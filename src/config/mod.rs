//! Configuration module.
//!
//! Structured configuration loading from environment variables (a `.env`
//! file is honoured by the binary through `dotenvy`), organized by concern:
//! ingestion and storage.

mod storage_config;

pub use storage_config::{StorageBackend, StorageEnvConfig};

use anyhow::Result;
use std::env;
use std::path::PathBuf;

/// Default directory scanned for `SYMBOL_values.csv` files
pub const DEFAULT_PRICES_DIR: &str = "./prices";

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Ingestion
    pub prices_dir: PathBuf,

    // Storage (from StorageEnvConfig)
    pub storage_backend: StorageBackend,
    pub database_url: String,
}

impl Default for Config {
    fn default() -> Self {
        let storage = StorageEnvConfig::default();
        Self {
            prices_dir: PathBuf::from(DEFAULT_PRICES_DIR),
            storage_backend: storage.backend,
            database_url: storage.database_url,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let prices_dir =
            PathBuf::from(env::var("PRICES_DIR").unwrap_or_else(|_| DEFAULT_PRICES_DIR.to_string()));
        let storage = StorageEnvConfig::from_env()?;

        Ok(Self {
            prices_dir,
            storage_backend: storage.backend,
            database_url: storage.database_url,
        })
    }
}
