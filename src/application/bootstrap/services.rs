use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::analytics::PriceAnalytics;
use crate::application::bootstrap::persistence::PersistenceBootstrap;
use crate::application::ingestion::IngestionReport;
use crate::config::Config;
use crate::infrastructure::persistence::database::Database;
use crate::interfaces::api::CryptoQueryService;

pub struct ServicesHandle {
    pub engine: Arc<PriceAnalytics>,
    pub query_service: CryptoQueryService,
    /// `None` when startup ingestion was skipped
    pub startup_ingestion: Option<IngestionReport>,
    db: Option<Database>,
}

impl ServicesHandle {
    /// Close the database pool, if any.
    pub async fn shutdown(self) {
        if let Some(db) = self.db {
            db.pool.close().await;
            info!("Database connections closed");
        }
    }
}

pub struct ServicesBootstrap;

impl ServicesBootstrap {
    /// Open storage and build the engine. With `ingest`, feed it the
    /// configured prices directory.
    pub async fn init(config: &Config, ingest: bool) -> Result<ServicesHandle> {
        let persistence = PersistenceBootstrap::init(config).await?;
        let engine = Arc::new(PriceAnalytics::new(persistence.price_repository).await?);

        let startup_ingestion = if ingest {
            info!("Reading price files from {}", config.prices_dir.display());
            let report = engine.ingest(&config.prices_dir).await;
            if let Some(e) = &report.directory_error {
                warn!("Startup ingestion skipped: {}", e);
            }
            Some(report)
        } else {
            info!("Startup ingestion disabled, serving stored prices");
            None
        };

        Ok(ServicesHandle {
            query_service: CryptoQueryService::new(engine.clone()),
            engine,
            startup_ingestion,
            db: persistence.db,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use crate::domain::repositories::PriceRepository;
    use crate::infrastructure::SqlitePriceRepository;

    #[tokio::test]
    async fn test_init_with_missing_prices_dir_is_not_fatal() {
        let config = Config {
            prices_dir: "/no/such/prices/dir".into(),
            storage_backend: StorageBackend::Memory,
            database_url: String::new(),
        };

        let handle = ServicesBootstrap::init(&config, true).await.unwrap();

        let report = handle.startup_ingestion.as_ref().unwrap();
        assert!(report.directory_error.is_some());
        assert!(handle.engine.known_symbols().is_empty());
    }

    #[tokio::test]
    async fn test_init_with_sqlite_backend() {
        let dir = tempfile::tempdir().unwrap();
        let prices = dir.path().join("prices");
        std::fs::create_dir(&prices).unwrap();
        std::fs::write(prices.join("BTC_values.csv"), "1641009600000,BTC,46813.21\n").unwrap();

        let config = Config {
            prices_dir: prices,
            storage_backend: StorageBackend::Sqlite,
            database_url: format!("sqlite://{}", dir.path().join("db/prices.db").display()),
        };

        let handle = ServicesBootstrap::init(&config, true).await.unwrap();

        assert_eq!(handle.startup_ingestion.as_ref().unwrap().records_stored, 1);
        assert!(handle.engine.is_supported("BTC"));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sqlite_restart_without_ingestion_keeps_record_count() {
        let dir = tempfile::tempdir().unwrap();
        let prices = dir.path().join("prices");
        std::fs::create_dir(&prices).unwrap();
        std::fs::write(prices.join("BTC_values.csv"), "1641009600000,BTC,46813.21\n").unwrap();

        let config = Config {
            prices_dir: prices,
            storage_backend: StorageBackend::Sqlite,
            database_url: format!("sqlite://{}", dir.path().join("prices.db").display()),
        };

        ServicesBootstrap::init(&config, true).await.unwrap().shutdown().await;

        let handle = ServicesBootstrap::init(&config, false).await.unwrap();
        assert!(handle.startup_ingestion.is_none());
        assert!(handle.engine.is_supported("BTC"));

        let pool = handle.db.as_ref().unwrap().pool.clone();
        let repo = SqlitePriceRepository::new(pool.clone());
        assert_eq!(repo.count().await.unwrap(), 1);

        handle.shutdown().await;
        assert!(pool.is_closed());
    }
}
