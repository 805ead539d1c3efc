//! Price splitting into display segments and per-segment highlights

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A price split into visually grouped blocks.
///
/// Prices with more than three integer digits use three blocks
/// (`"115" "055" ".31"`); smaller prices leave `left` empty and render as
/// two blocks (`"999" ".99"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSegments {
    pub left: String,
    pub middle: String,
    pub right: String,
}

impl Default for PriceSegments {
    fn default() -> Self {
        Self::fallback()
    }
}

impl PriceSegments {
    /// Shown for missing or invalid prices
    pub fn fallback() -> Self {
        Self {
            left: String::new(),
            middle: "0".to_string(),
            right: ".00".to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }

    pub fn is_two_block(&self) -> bool {
        self.left.is_empty()
    }

    /// The most significant visible block
    pub fn leading(&self) -> &str {
        if self.left.is_empty() {
            &self.middle
        } else {
            &self.left
        }
    }

    /// Reassemble the segments into the rounded price
    pub fn to_decimal(&self) -> Option<Decimal> {
        Decimal::from_str(&format!("{}{}{}", self.left, self.middle, self.right)).ok()
    }
}

/// Split a price into display segments.
///
/// Rounds half away from zero at the second decimal. `None`, zero and
/// negative prices yield [`PriceSegments::fallback`].
pub fn split_price(price: Option<Decimal>) -> PriceSegments {
    let Some(price) = price.filter(|p| *p > Decimal::ZERO) else {
        return PriceSegments::fallback();
    };

    let rounded = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded);
    let (int_part, dec_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    if int_part.len() > 3 {
        let (left, middle) = int_part.split_at(int_part.len() - 3);
        PriceSegments {
            left: left.to_string(),
            middle: middle.to_string(),
            right: format!(".{}", dec_part),
        }
    } else {
        PriceSegments {
            left: String::new(),
            middle: int_part.to_string(),
            right: format!(".{}", dec_part),
        }
    }
}

/// Float entry point; NaN, infinities and non-positive values fall back
pub fn split_price_f64(value: f64) -> PriceSegments {
    if !value.is_finite() {
        return PriceSegments::fallback();
    }
    split_price(Decimal::from_f64(value))
}

/// Per-segment change signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Highlight {
    Up,
    Down,
    #[default]
    None,
}

impl Highlight {
    /// Compare two displayed strings of the same block.
    ///
    /// Only a change of the string itself produces a signal; the direction
    /// comes from the digits it contains.
    pub fn between(old: &str, new: &str) -> Self {
        if old == new || old.is_empty() || new.is_empty() {
            return Highlight::None;
        }
        match (digits_value(old), digits_value(new)) {
            (Some(o), Some(n)) if n > o => Highlight::Up,
            (Some(o), Some(n)) if n < o => Highlight::Down,
            _ => Highlight::None,
        }
    }

    pub fn is_active(&self) -> bool {
        *self != Highlight::None
    }
}

fn digits_value(s: &str) -> Option<u128> {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Highlights for all three blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SegmentHighlights {
    pub left: Highlight,
    pub middle: Highlight,
    pub right: Highlight,
}

impl SegmentHighlights {
    /// Per-block highlights between two displayed prices.
    ///
    /// Both sides must be real prices; the caller skips the first tick after
    /// loading. A sub-cent price renders like the fallback but still counts.
    pub fn between(old: &PriceSegments, new: &PriceSegments) -> Self {
        Self {
            left: Highlight::between(&old.left, &new.left),
            middle: Highlight::between(&old.middle, &new.middle),
            right: Highlight::between(&old.right, &new.right),
        }
    }

    pub fn any(&self) -> bool {
        self.left.is_active() || self.middle.is_active() || self.right.is_active()
    }
}
