//! In-Memory Repository Implementation
//!
//! Thread-safe, in-memory implementation of `PriceRepository`.
//!
//! # Features
//!
//! - **Thread-safe**: Uses `Arc<RwLock>` for concurrent access
//! - **Append-only**: Records keep insertion order; duplicates are kept
//! - **Testing**: Ideal for unit tests and single-run CLI sessions
//!
//! # Limitations
//!
//! - Data is lost on process exit
//! - Every query is a linear scan
//!
//! For persistence across runs, use `SqlitePriceRepository`.

use crate::domain::price::PricePoint;
use crate::domain::repositories::PriceRepository;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of PriceRepository
pub struct InMemoryPriceRepository {
    prices: Arc<RwLock<Vec<PricePoint>>>,
}

impl InMemoryPriceRepository {
    pub fn new() -> Self {
        Self {
            prices: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Pre-populated repository, mostly for tests
    pub fn with_prices(prices: Vec<PricePoint>) -> Self {
        Self {
            prices: Arc::new(RwLock::new(prices)),
        }
    }
}

impl Default for InMemoryPriceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceRepository for InMemoryPriceRepository {
    async fn find_by_symbol(&self, symbol: &str) -> Result<Vec<PricePoint>> {
        let prices = self.prices.read().await;
        Ok(prices
            .iter()
            .filter(|p| p.symbol == symbol)
            .cloned()
            .collect())
    }

    async fn find_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        let prices = self.prices.read().await;
        Ok(prices
            .iter()
            .filter(|p| p.timestamp >= start && p.timestamp <= end)
            .cloned()
            .collect())
    }

    async fn find_known_symbols(&self) -> Result<BTreeSet<String>> {
        let prices = self.prices.read().await;
        Ok(prices.iter().map(|p| p.symbol.clone()).collect())
    }

    async fn save_batch(&self, prices: &[PricePoint]) -> Result<()> {
        self.prices.write().await.extend_from_slice(prices);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.prices.read().await.len())
    }
}
