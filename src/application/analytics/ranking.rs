use crate::application::analytics::aggregates::{AggregateCache, AggregateKind};
use crate::application::analytics::registry::SymbolRegistry;
use crate::domain::normalized::{NormalizedValue, normalized_range};
use crate::domain::price::PricePoint;
use crate::domain::repositories::PriceRepository;
use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::OnceCell;
use tracing::{debug, info};

type RankingCell = Arc<OnceCell<Vec<NormalizedValue>>>;

/// Inclusive UTC window `[00:00:00, 23:59:59]` of a calendar day.
pub fn day_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::hours(23) + Duration::minutes(59) + Duration::seconds(59);
    (start, end)
}

/// Orders ascending by value (stable), then reverses.
///
/// Equal values therefore end up in reverse input order.
fn sort_descending(values: &mut [NormalizedValue]) {
    values.sort_by(|a, b| a.value.cmp(&b.value));
    values.reverse();
}

/// Cross-symbol normalized range queries
pub struct RankingEngine {
    repository: Arc<dyn PriceRepository>,
    registry: Arc<SymbolRegistry>,
    aggregates: Arc<AggregateCache>,
    ranking: RwLock<RankingCell>,
}

impl RankingEngine {
    pub fn new(
        repository: Arc<dyn PriceRepository>,
        registry: Arc<SymbolRegistry>,
        aggregates: Arc<AggregateCache>,
    ) -> Self {
        Self {
            repository,
            registry,
            aggregates,
            ranking: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    /// Every known symbol with its lifetime normalized range, highest first.
    ///
    /// Computed on the first call and reused for the engine's lifetime unless
    /// [`invalidate`](Self::invalidate) is called. Symbols without data carry
    /// the `-1` sentinel and sort last.
    pub async fn ranked_by_symbol(&self) -> Result<Vec<NormalizedValue>> {
        let cell = self.cell();
        let ranking = cell
            .get_or_try_init(|| async {
                let mut ranking = Vec::with_capacity(self.registry.len());
                for symbol in self.registry.snapshot() {
                    let min = self.aggregates.get(&symbol, AggregateKind::Min).await?;
                    let max = self.aggregates.get(&symbol, AggregateKind::Max).await?;
                    let value = normalized_range(min.map(|p| p.price), max.map(|p| p.price));
                    ranking.push(NormalizedValue::new(symbol, value));
                }
                sort_descending(&mut ranking);

                info!(
                    "RankingEngine: Ranked {} symbols by normalized range",
                    ranking.len()
                );
                Ok::<_, anyhow::Error>(ranking)
            })
            .await?;

        Ok(ranking.clone())
    }

    /// Drop the cached ranking so the next call recomputes it.
    pub fn invalidate(&self) {
        let fresh = Arc::new(OnceCell::new());
        match self.ranking.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => {
                tracing::error!("RankingEngine: Lock poisoned during write, recovering");
                *poisoned.into_inner() = fresh;
            }
        }
    }

    /// Symbol with the highest normalized range among the records of `day`.
    ///
    /// Always recomputed from that day's records only; ties go to the
    /// lexicographically last symbol. `None` when the day has no records.
    pub async fn highest_normalized_range_on_day(&self, day: NaiveDate) -> Result<Option<String>> {
        let (start, end) = day_window(day);
        let prices = self.repository.find_by_time_range(start, end).await?;

        let mut by_symbol: BTreeMap<String, Vec<PricePoint>> = BTreeMap::new();
        for price in prices {
            by_symbol.entry(price.symbol.clone()).or_default().push(price);
        }

        let mut ranked: Vec<NormalizedValue> = by_symbol
            .into_iter()
            .map(|(symbol, group)| {
                let min = AggregateKind::Min.select(&group).map(|p| p.price);
                let max = AggregateKind::Max.select(&group).map(|p| p.price);
                NormalizedValue::new(symbol, normalized_range(min, max))
            })
            .collect();
        sort_descending(&mut ranked);

        let winner = ranked.into_iter().next().map(|v| v.symbol);
        debug!("RankingEngine: Highest normalized range on {}: {:?}", day, winner);
        Ok(winner)
    }

    fn cell(&self) -> RankingCell {
        match self.ranking.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
