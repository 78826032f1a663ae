use crate::domain::errors::IngestionError;
use chrono::{DateTime, TimeZone, Utc};
use csv::{Reader, ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// One observed USD price for a crypto symbol.
///
/// Equality is structural over all three fields. Decimal equality ignores
/// trailing zeros, so `100.10` and `100.1` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            price,
        }
    }

    /// Parse one `epochMillis,SYMBOL,price` line.
    ///
    /// Header lines are not recognised here; the ingestion pipeline skips them.
    pub fn from_csv_line(line: &str) -> Result<Self, IngestionError> {
        let mut reader = price_csv_reader(line.as_bytes());
        let mut record = StringRecord::new();
        let found = reader
            .read_record(&mut record)
            .map_err(|e| IngestionError::format(line, e.to_string()))?;
        if !found {
            return Err(IngestionError::format(
                line,
                "expected format TIMESTAMP,SYMBOL,PRICE (3 fields), found 0",
            ));
        }
        Self::from_record(&record)
    }

    /// Build a price from one CSV record of exactly three fields.
    pub fn from_record(record: &StringRecord) -> Result<Self, IngestionError> {
        let line = record.iter().collect::<Vec<_>>().join(",");
        if record.len() != 3 {
            return Err(IngestionError::format(
                &line,
                format!(
                    "expected format TIMESTAMP,SYMBOL,PRICE (3 fields), found {}",
                    record.len()
                ),
            ));
        }

        let millis = record[0]
            .parse::<i64>()
            .map_err(|e| IngestionError::format(&line, format!("invalid timestamp: {}", e)))?;
        let timestamp = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| IngestionError::format(&line, "timestamp out of range"))?;

        let symbol = &record[1];
        if symbol.is_empty() {
            return Err(IngestionError::format(&line, "empty symbol"));
        }

        let price = parse_price(&record[2])
            .ok_or_else(|| IngestionError::format(&line, "price is not an exact decimal number"))?;
        if price.is_sign_negative() && !price.is_zero() {
            return Err(IngestionError::format(&line, "negative price"));
        }

        Ok(Self::new(timestamp, symbol, price))
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// CSV reader for headerless `epochMillis,SYMBOL,price` content.
///
/// Quotes carry no meaning in price files and records may have any field
/// count, so the record length check stays with the parser. Blank lines are
/// skipped.
pub fn price_csv_reader<R: Read>(input: R) -> Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(input)
}

/// Exact decimal parsing: `[+-]digits[.digits][(e|E)[+-]digits]`.
///
/// Anything else (separators, blanks, more digits than a `Decimal` holds)
/// is rejected rather than rounded.
fn parse_price(raw: &str) -> Option<Decimal> {
    let (mantissa, exponent) = match raw.find(['e', 'E']) {
        Some(at) => (&raw[..at], Some(&raw[at + 1..])),
        None => (raw, None),
    };

    let unsigned = mantissa.strip_prefix(['+', '-']).unwrap_or(mantissa);
    let mut parts = unsigned.splitn(2, '.');
    let int_part = parts.next().unwrap_or_default();
    let frac_part = parts.next().unwrap_or_default();
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.len() + frac_part.len() == 0 || !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }

    match exponent {
        None => Decimal::from_str_exact(mantissa).ok(),
        Some(exp) => {
            let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            if digits.is_empty() || !all_digits(digits) {
                return None;
            }
            Decimal::from_scientific(raw).ok()
        }
    }
}
