//! Repository Pattern Abstractions
//!
//! This module defines the storage port the analytics engine reads from and
//! the ingestion pipeline writes to.
//!
//! # Implementations
//!
//! - `InMemoryPriceRepository`: thread-safe `Arc<RwLock>` storage, used by
//!   default and in tests
//! - `SqlitePriceRepository`: `sqlx` backed persistence
//!
//! # Example
//!
//! ```rust,no_run
//! use crypto_stats::domain::repositories::PriceRepository;
//! use crypto_stats::infrastructure::InMemoryPriceRepository;
//!
//! # async {
//! let repo = InMemoryPriceRepository::new();
//! let prices = repo.find_by_symbol("BTC").await?;
//! # anyhow::Ok(())
//! # };
//! ```

use crate::domain::price::PricePoint;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Storage collaborator for price records
#[async_trait]
pub trait PriceRepository: Send + Sync {
    /// All records for a symbol, in storage order
    async fn find_by_symbol(&self, symbol: &str) -> Result<Vec<PricePoint>>;

    /// All records with `start <= timestamp <= end`
    async fn find_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>>;

    /// Distinct symbols with at least one stored record
    async fn find_known_symbols(&self) -> Result<BTreeSet<String>>;

    /// Append a batch of records
    async fn save_batch(&self, prices: &[PricePoint]) -> Result<()>;

    /// Count total number of stored records
    async fn count(&self) -> Result<usize>;
}
