//! Per-symbol aggregate cache (oldest / newest / min / max).
//!
//! Every (symbol, kind) pair owns one compute-once cell. The first caller
//! scans storage and fills the cell; concurrent first callers wait on the
//! same initialization and later callers read the cell without touching
//! storage. Cells are never cleared, so records ingested after a cell was
//! filled are not reflected in it.

use crate::domain::price::PricePoint;
use crate::domain::repositories::PriceRepository;
use anyhow::Result;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tokio::sync::OnceCell;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Oldest,
    Newest,
    Min,
    Max,
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateKind::Oldest => write!(f, "oldest"),
            AggregateKind::Newest => write!(f, "newest"),
            AggregateKind::Min => write!(f, "min"),
            AggregateKind::Max => write!(f, "max"),
        }
    }
}

impl AggregateKind {
    pub const ALL: [AggregateKind; 4] = [
        AggregateKind::Oldest,
        AggregateKind::Newest,
        AggregateKind::Min,
        AggregateKind::Max,
    ];

    fn compare(self, a: &PricePoint, b: &PricePoint) -> Ordering {
        match self {
            AggregateKind::Oldest | AggregateKind::Newest => a.timestamp.cmp(&b.timestamp),
            AggregateKind::Min | AggregateKind::Max => a.price.cmp(&b.price),
        }
    }

    /// Extremum of `prices` for this kind.
    ///
    /// Ties go to the first record for `Oldest`/`Min` and to the last one
    /// for `Newest`/`Max`.
    pub fn select(self, prices: &[PricePoint]) -> Option<&PricePoint> {
        match self {
            AggregateKind::Oldest | AggregateKind::Min => {
                prices.iter().min_by(|a, b| self.compare(a, b))
            }
            AggregateKind::Newest | AggregateKind::Max => {
                prices.iter().max_by(|a, b| self.compare(a, b))
            }
        }
    }
}

type AggregateCell = Arc<OnceCell<PricePoint>>;

enum Miss {
    NoData,
    Storage(anyhow::Error),
}

/// Lifetime-memoized aggregates per (symbol, kind)
pub struct AggregateCache {
    repository: Arc<dyn PriceRepository>,
    cells: RwLock<HashMap<(String, AggregateKind), AggregateCell>>,
}

impl fmt::Debug for AggregateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateCache")
            .field("cells", &"<RwLock>")
            .finish()
    }
}

impl AggregateCache {
    pub fn new(repository: Arc<dyn PriceRepository>) -> Self {
        Self {
            repository,
            cells: RwLock::new(HashMap::new()),
        }
    }

    /// Aggregate for a symbol, or `None` if it has no stored records.
    ///
    /// "No data" is not memoized: once records arrive, the next call fills
    /// the cell.
    pub async fn get(&self, symbol: &str, kind: AggregateKind) -> Result<Option<PricePoint>> {
        let cell = self.cell(symbol, kind);
        if let Some(point) = cell.get() {
            return Ok(Some(point.clone()));
        }

        let computed = cell
            .get_or_try_init(|| async {
                let prices = self
                    .repository
                    .find_by_symbol(symbol)
                    .await
                    .map_err(Miss::Storage)?;
                let winner = kind.select(&prices).cloned().ok_or(Miss::NoData)?;
                debug!(
                    "AggregateCache: Computed {} for {} over {} records",
                    kind,
                    symbol,
                    prices.len()
                );
                Ok(winner)
            })
            .await;

        match computed {
            Ok(point) => Ok(Some(point.clone())),
            Err(Miss::NoData) => Ok(None),
            Err(Miss::Storage(e)) => Err(e),
        }
    }

    pub fn is_cached(&self, symbol: &str, kind: AggregateKind) -> bool {
        let key = (symbol.to_string(), kind);
        let cells = match self.cells.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cells.get(&key).is_some_and(|cell| cell.initialized())
    }

    fn cell(&self, symbol: &str, kind: AggregateKind) -> AggregateCell {
        let key = (symbol.to_string(), kind);

        {
            let cells = match self.cells.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(cell) = cells.get(&key) {
                return cell.clone();
            }
        }

        let mut cells = match self.cells.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("AggregateCache: Lock poisoned during write, recovering");
                poisoned.into_inner()
            }
        };
        cells.entry(key).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryPriceRepository;
    use rust_decimal_macros::dec;

    fn btc_prices() -> Vec<PricePoint> {
        [
            "1641009600000,BTC,46813.21",
            "1641020400000,BTC,46979.61",
            "1643626800000,BTC,37300.31",
            "1643659200000,BTC,38415.79",
        ]
        .iter()
        .map(|line| PricePoint::from_csv_line(line).unwrap())
        .collect()
    }

    fn cache_over(prices: Vec<PricePoint>) -> (Arc<InMemoryPriceRepository>, AggregateCache) {
        let repo = Arc::new(InMemoryPriceRepository::with_prices(prices));
        let cache = AggregateCache::new(repo.clone());
        (repo, cache)
    }

    #[test]
    fn test_select_extremes() {
        let prices = btc_prices();

        assert_eq!(
            AggregateKind::Oldest.select(&prices).unwrap().price,
            dec!(46813.21)
        );
        assert_eq!(
            AggregateKind::Newest.select(&prices).unwrap().price,
            dec!(38415.79)
        );
        assert_eq!(AggregateKind::Min.select(&prices).unwrap().price, dec!(37300.31));
        assert_eq!(AggregateKind::Max.select(&prices).unwrap().price, dec!(46979.61));
        assert!(AggregateKind::Max.select(&[]).is_none());
    }

    #[test]
    fn test_select_ties_are_stable() {
        let prices: Vec<PricePoint> = ["1000,BTC,5", "1000,BTC,7", "2000,BTC,7", "3000,BTC,5"]
            .iter()
            .map(|line| PricePoint::from_csv_line(line).unwrap())
            .collect();

        let oldest = AggregateKind::Oldest.select(&prices).unwrap();
        assert_eq!(oldest.price, dec!(5));
        let min = AggregateKind::Min.select(&prices).unwrap();
        assert_eq!(min.timestamp_millis(), 1000);
        let max = AggregateKind::Max.select(&prices).unwrap();
        assert_eq!(max.timestamp_millis(), 2000);
    }

    #[tokio::test]
    async fn test_decimal_ordering_is_exact() {
        let prices: Vec<PricePoint> = ["1,X,0.30000000000000000001", "2,X,0.3", "3,X,0.1"]
            .iter()
            .map(|line| PricePoint::from_csv_line(line).unwrap())
            .collect();
        let (_, cache) = cache_over(prices);

        let max = cache.get("X", AggregateKind::Max).await.unwrap().unwrap();
        assert_eq!(max.timestamp_millis(), 1);
    }

    #[tokio::test]
    async fn test_unknown_symbol_has_no_data() {
        let (_, cache) = cache_over(btc_prices());

        for kind in AggregateKind::ALL {
            assert!(cache.get("ETH", kind).await.unwrap().is_none());
            assert!(!cache.is_cached("ETH", kind));
        }
    }

    #[tokio::test]
    async fn test_cached_value_ignores_later_ingestion() {
        let (repo, cache) = cache_over(btc_prices());

        let first = cache.get("BTC", AggregateKind::Max).await.unwrap().unwrap();
        assert!(cache.is_cached("BTC", AggregateKind::Max));
        assert!(!cache.is_cached("BTC", AggregateKind::Min));

        repo.save_batch(&[PricePoint::from_csv_line("1643700000000,BTC,99999").unwrap()])
            .await
            .unwrap();

        let second = cache.get("BTC", AggregateKind::Max).await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(second.price, dec!(46979.61));

        // Not yet cached, so it sees the new record
        let newest = cache.get("BTC", AggregateKind::Newest).await.unwrap().unwrap();
        assert_eq!(newest.price, dec!(99999));
    }

    #[tokio::test]
    async fn test_no_data_is_not_memoized() {
        let (repo, cache) = cache_over(Vec::new());

        assert!(cache.get("BTC", AggregateKind::Min).await.unwrap().is_none());

        repo.save_batch(&btc_prices()).await.unwrap();

        let min = cache.get("BTC", AggregateKind::Min).await.unwrap().unwrap();
        assert_eq!(min.price, dec!(37300.31));
    }

    #[tokio::test]
    async fn test_concurrent_first_callers_agree() {
        let (_, cache) = cache_over(btc_prices());
        let cache = Arc::new(cache);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.get("BTC", AggregateKind::Oldest).await.unwrap()
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert!(results.iter().all(|r| r == &results[0]));
        assert_eq!(results[0].as_ref().unwrap().timestamp_millis(), 1641009600000);
    }
}
