//! Price analytics engine.
//!
//! `PriceAnalytics` owns the symbol registry, the aggregate cache and the
//! ranking engine for one storage backend. Build it once at startup and share
//! it (`Arc<PriceAnalytics>`) with every caller; there is no global instance.
//!
//! Aggregates and the global ranking are memoized for the engine's lifetime
//! and are not refreshed when more data is ingested afterwards.

pub mod aggregates;
pub mod ranking;
pub mod registry;

use crate::application::ingestion::{IngestionReport, PriceFileIngestor};
use crate::domain::normalized::NormalizedValue;
use crate::domain::price::PricePoint;
use crate::domain::repositories::PriceRepository;
use aggregates::{AggregateCache, AggregateKind};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use ranking::RankingEngine;
use registry::SymbolRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Oldest, newest, min and max records of one symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceStats {
    pub oldest: Option<PricePoint>,
    pub newest: Option<PricePoint>,
    pub min: Option<PricePoint>,
    pub max: Option<PricePoint>,
}

pub struct PriceAnalytics {
    registry: Arc<SymbolRegistry>,
    aggregates: Arc<AggregateCache>,
    ranking: RankingEngine,
    ingestor: PriceFileIngestor,
}

impl PriceAnalytics {
    /// Build the engine, seeding the registry from the symbols already stored.
    pub async fn new(repository: Arc<dyn PriceRepository>) -> Result<Self> {
        let seed = repository
            .find_known_symbols()
            .await
            .context("Failed to load known symbols")?;
        info!("PriceAnalytics: Seeded with {} known symbols", seed.len());

        let registry = Arc::new(SymbolRegistry::new(seed));
        let aggregates = Arc::new(AggregateCache::new(repository.clone()));
        let ranking = RankingEngine::new(repository.clone(), registry.clone(), aggregates.clone());
        let ingestor = PriceFileIngestor::new(repository, registry.clone());

        Ok(Self {
            registry,
            aggregates,
            ranking,
            ingestor,
        })
    }

    pub async fn ingest(&self, dir: impl AsRef<Path>) -> IngestionReport {
        self.ingestor.ingest(dir.as_ref()).await
    }

    pub fn is_supported(&self, symbol: &str) -> bool {
        self.registry.contains(symbol)
    }

    pub fn known_symbols(&self) -> Vec<String> {
        self.registry.snapshot()
    }

    pub async fn aggregate(&self, symbol: &str, kind: AggregateKind) -> Result<Option<PricePoint>> {
        self.aggregates.get(symbol, kind).await
    }

    pub async fn oldest(&self, symbol: &str) -> Result<Option<PricePoint>> {
        self.aggregate(symbol, AggregateKind::Oldest).await
    }

    pub async fn newest(&self, symbol: &str) -> Result<Option<PricePoint>> {
        self.aggregate(symbol, AggregateKind::Newest).await
    }

    pub async fn min(&self, symbol: &str) -> Result<Option<PricePoint>> {
        self.aggregate(symbol, AggregateKind::Min).await
    }

    pub async fn max(&self, symbol: &str) -> Result<Option<PricePoint>> {
        self.aggregate(symbol, AggregateKind::Max).await
    }

    pub async fn stats(&self, symbol: &str) -> Result<PriceStats> {
        Ok(PriceStats {
            oldest: self.oldest(symbol).await?,
            newest: self.newest(symbol).await?,
            min: self.min(symbol).await?,
            max: self.max(symbol).await?,
        })
    }

    pub async fn ranked_by_symbol(&self) -> Result<Vec<NormalizedValue>> {
        self.ranking.ranked_by_symbol().await
    }

    pub async fn highest_normalized_range_on_day(&self, day: NaiveDate) -> Result<Option<String>> {
        self.ranking.highest_normalized_range_on_day(day).await
    }

    /// Force the next `ranked_by_symbol` call to recompute. Aggregates stay cached.
    pub fn invalidate_ranking(&self) {
        self.ranking.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryPriceRepository;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_registry_seeded_from_storage() {
        let repo = Arc::new(InMemoryPriceRepository::with_prices(vec![
            PricePoint::from_csv_line("1641009600000,BTC,46813.21").unwrap(),
        ]));

        let engine = PriceAnalytics::new(repo).await.unwrap();

        assert!(engine.is_supported("BTC"));
        assert!(!engine.is_supported("SMT"));
        assert_eq!(engine.known_symbols(), vec!["BTC"]);
    }

    #[tokio::test]
    async fn test_stats_collects_all_aggregates() {
        let repo = Arc::new(InMemoryPriceRepository::with_prices(
            [
                "1641009600000,BTC,46813.21",
                "1641020400000,BTC,46979.61",
                "1643626800000,BTC,37300.31",
                "1643659200000,BTC,38415.79",
            ]
            .iter()
            .map(|line| PricePoint::from_csv_line(line).unwrap())
            .collect(),
        ));
        let engine = PriceAnalytics::new(repo).await.unwrap();

        let stats = engine.stats("BTC").await.unwrap();

        assert_eq!(stats.oldest.unwrap().price, dec!(46813.21));
        assert_eq!(stats.newest.unwrap().price, dec!(38415.79));
        assert_eq!(stats.min.unwrap().price, dec!(37300.31));
        assert_eq!(stats.max.unwrap().price, dec!(46979.61));

        let empty = engine.stats("ETH").await.unwrap();
        assert!(empty.oldest.is_none() && empty.max.is_none());
    }
}
