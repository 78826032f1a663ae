//! Query boundary.
//!
//! Validates caller input, invokes the analytics engine and turns "absent"
//! results into typed errors that map onto HTTP-style status codes. Any
//! transport (CLI, HTTP) sits on top of this service.

use crate::application::analytics::{PriceAnalytics, PriceStats};
use crate::domain::normalized::NormalizedValue;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

/// Day parameter format: basic ISO date
pub const DAY_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unsupported crypto symbol: {symbol}")]
    UnsupportedSymbol { symbol: String },

    #[error("{day} is not in YYYYMMDD format")]
    InvalidDay { day: String },

    #[error("The given day {day} is in the future")]
    FutureDay { day: NaiveDate },

    #[error("No crypto value found for {day}")]
    NoDataForDay { day: NaiveDate },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidDay { .. } | ApiError::FutureDay { .. } => 400,
            ApiError::UnsupportedSymbol { .. } | ApiError::NoDataForDay { .. } => 404,
            ApiError::Internal(_) => 500,
        }
    }
}

/// Parse a `YYYYMMDD` day, rejecting anything after `today`.
pub fn parse_day(day: &str, today: NaiveDate) -> Result<NaiveDate, ApiError> {
    let invalid = || ApiError::InvalidDay {
        day: day.to_string(),
    };

    if day.len() != 8 || !day.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let parsed = NaiveDate::parse_from_str(day, DAY_FORMAT).map_err(|_| invalid())?;

    if parsed > today {
        return Err(ApiError::FutureDay { day: parsed });
    }
    Ok(parsed)
}

#[derive(Clone)]
pub struct CryptoQueryService {
    engine: Arc<PriceAnalytics>,
}

impl CryptoQueryService {
    pub fn new(engine: Arc<PriceAnalytics>) -> Self {
        Self { engine }
    }

    /// Oldest/newest/min/max for a supported symbol
    pub async fn stats(&self, symbol: &str) -> Result<PriceStats, ApiError> {
        if !self.engine.is_supported(symbol) {
            return Err(ApiError::UnsupportedSymbol {
                symbol: symbol.to_string(),
            });
        }
        Ok(self.engine.stats(symbol).await?)
    }

    /// All known symbols, highest normalized range first
    pub async fn normalized_list(&self) -> Result<Vec<NormalizedValue>, ApiError> {
        Ok(self.engine.ranked_by_symbol().await?)
    }

    /// Symbol with the highest normalized range on `day` (`YYYYMMDD`, UTC)
    pub async fn normalized_highest(&self, day: &str) -> Result<String, ApiError> {
        self.normalized_highest_at(day, Utc::now().date_naive()).await
    }

    pub async fn normalized_highest_at(
        &self,
        day: &str,
        today: NaiveDate,
    ) -> Result<String, ApiError> {
        let parsed = parse_day(day, today).inspect_err(|e| error!("{}", e))?;

        self.engine
            .highest_normalized_range_on_day(parsed)
            .await?
            .ok_or(ApiError::NoDataForDay { day: parsed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PricePoint;
    use crate::infrastructure::InMemoryPriceRepository;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    async fn service() -> CryptoQueryService {
        let prices = [
            "1641009600000,BTC,46813.21",
            "1641020400000,BTC,46979.61",
            "1641024000000,ETH,3715.32",
            "1641031200000,ETH,3918.67",
        ]
        .iter()
        .map(|line| PricePoint::from_csv_line(line).unwrap())
        .collect();
        let repo = Arc::new(InMemoryPriceRepository::with_prices(prices));
        CryptoQueryService::new(Arc::new(PriceAnalytics::new(repo).await.unwrap()))
    }

    #[test]
    fn test_parse_day_formats() {
        assert_eq!(
            parse_day("20220101", today()).unwrap(),
            NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
        );
        for bad in ["2022-01-01", "2022011", "202201011", "20221301", "abcdefgh", ""] {
            let err = parse_day(bad, today()).unwrap_err();
            assert_eq!(err.status_code(), 400, "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_future_day_rejected() {
        assert!(parse_day("20240601", today()).is_ok());
        assert!(matches!(
            parse_day("20240602", today()),
            Err(ApiError::FutureDay { .. })
        ));
    }

    #[tokio::test]
    async fn test_stats_for_unsupported_symbol_is_not_found() {
        let service = service().await;

        let err = service.stats("SMT").await.unwrap_err();
        assert_eq!(err.status_code(), 404);

        let stats = service.stats("BTC").await.unwrap();
        assert!(stats.max.is_some());
    }

    #[tokio::test]
    async fn test_normalized_highest_outcomes() {
        let service = service().await;

        assert_eq!(
            service.normalized_highest_at("20220101", today()).await.unwrap(),
            "ETH"
        );

        let err = service
            .normalized_highest_at("20230101", today())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NoDataForDay { .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_normalized_list_returns_all_symbols() {
        let service = service().await;

        let list = service.normalized_list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].value >= list[1].value);
    }
}
