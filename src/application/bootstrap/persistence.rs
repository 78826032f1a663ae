use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, StorageBackend};
use crate::domain::repositories::PriceRepository;
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::repositories::SqlitePriceRepository;
use crate::infrastructure::repositories::InMemoryPriceRepository;

pub struct PersistenceHandle {
    /// Present only for the SQLite backend
    pub db: Option<Database>,
    pub price_repository: Arc<dyn PriceRepository>,
}

pub struct PersistenceBootstrap;

impl PersistenceBootstrap {
    pub async fn init(config: &Config) -> Result<PersistenceHandle> {
        match config.storage_backend {
            StorageBackend::Memory => {
                info!("Using in-memory price storage");
                Ok(PersistenceHandle {
                    db: None,
                    price_repository: Arc::new(InMemoryPriceRepository::new()),
                })
            }
            StorageBackend::Sqlite => {
                info!("Initializing Database at {}", config.database_url);

                let db = Database::new(&config.database_url)
                    .await
                    .context("Failed to initialize database")?;
                let price_repository = Arc::new(SqlitePriceRepository::new(db.pool.clone()));

                Ok(PersistenceHandle {
                    db: Some(db),
                    price_repository,
                })
            }
        }
    }
}
