//! Normalized range: a scale-free volatility proxy, `(max - min) / min`.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Fractional digits kept in every normalized range.
pub const NORMALIZED_RANGE_SCALE: u32 = 10;

/// Marker for "range undefined" (no min/max, or zero min). Prices are never
/// negative, so a negative range cannot be legitimate.
pub const UNDEFINED_RANGE: Decimal = Decimal::NEGATIVE_ONE;

/// A symbol paired with its normalized range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedValue {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
}

impl NormalizedValue {
    pub fn new(symbol: impl Into<String>, value: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            value,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.value != UNDEFINED_RANGE
    }
}

/// `(max - min) / min`, rounded to 10 places away from zero.
///
/// Returns [`UNDEFINED_RANGE`] when either price is missing or `min` is zero.
pub fn normalized_range(min: Option<Decimal>, max: Option<Decimal>) -> Decimal {
    let (Some(min), Some(max)) = (min, max) else {
        return UNDEFINED_RANGE;
    };

    match (max - min).checked_div(min) {
        Some(ratio) => {
            ratio.round_dp_with_strategy(NORMALIZED_RANGE_SCALE, RoundingStrategy::AwayFromZero)
        }
        None => UNDEFINED_RANGE,
    }
}
