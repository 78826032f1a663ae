use crate::domain::price::PricePoint;
use crate::domain::repositories::PriceRepository;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::debug;

pub struct SqlitePriceRepository {
    pool: SqlitePool,
}

impl SqlitePriceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceRepository for SqlitePriceRepository {
    async fn find_by_symbol(&self, symbol: &str) -> Result<Vec<PricePoint>> {
        let rows = sqlx::query("SELECT * FROM crypto_prices WHERE symbol = ? ORDER BY id ASC")
            .bind(symbol)
            .fetch_all(&self.pool)
            .await
            .context("Failed to load prices by symbol")?;
        map_rows_to_prices(rows)
    }

    async fn find_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        let rows = sqlx::query(
            "SELECT * FROM crypto_prices WHERE timestamp >= ? AND timestamp <= ? ORDER BY id ASC",
        )
        .bind(start.timestamp_millis())
        .bind(end.timestamp_millis())
        .fetch_all(&self.pool)
        .await
        .context("Failed to load prices by time range")?;
        map_rows_to_prices(rows)
    }

    async fn find_known_symbols(&self) -> Result<BTreeSet<String>> {
        let rows = sqlx::query("SELECT DISTINCT symbol FROM crypto_prices")
            .fetch_all(&self.pool)
            .await
            .context("Failed to load known symbols")?;

        let mut symbols = BTreeSet::new();
        for row in rows {
            symbols.insert(row.try_get::<String, _>("symbol")?);
        }
        Ok(symbols)
    }

    async fn save_batch(&self, prices: &[PricePoint]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to open price batch transaction")?;

        for price in prices {
            sqlx::query("INSERT INTO crypto_prices (symbol, timestamp, price) VALUES (?, ?, ?)")
                .bind(&price.symbol)
                .bind(price.timestamp_millis())
                .bind(price.price.to_string())
                .execute(&mut *tx)
                .await
                .context("Failed to save price")?;
        }

        tx.commit()
            .await
            .context("Failed to commit price batch")?;

        debug!("Persisted {} prices", prices.len());
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM crypto_prices")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count as usize)
    }
}

fn map_rows_to_prices(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<PricePoint>> {
    let mut prices = Vec::with_capacity(rows.len());
    for row in rows {
        let millis: i64 = row.try_get("timestamp")?;
        let raw_price: String = row.try_get("price")?;

        let timestamp = Utc
            .timestamp_millis_opt(millis)
            .single()
            .with_context(|| format!("Stored timestamp {} out of range", millis))?;
        let price = Decimal::from_str(&raw_price)
            .with_context(|| format!("Stored price '{}' is not a decimal", raw_price))?;

        prices.push(PricePoint {
            timestamp,
            symbol: row.try_get("symbol")?,
            price,
        });
    }
    Ok(prices)
}
