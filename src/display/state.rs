//! Derived display state consumed by renderers

use super::{split_price, PriceSegments};
use crate::feed::Instrument;
use crate::supervisor::ConnectionStatus;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;

/// Everything a renderer needs, recomputed on every accepted tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    pub instrument: Instrument,
    /// `None` while loading (startup or switch)
    pub current_price: Option<Decimal>,
    pub previous_price: Option<Decimal>,
    pub segments: PriceSegments,
    pub rolling_change_percent: Decimal,
    pub volume: Decimal,
    pub previous_volume: Decimal,
    pub connection_status: ConnectionStatus,
    /// An instrument switch is in progress
    pub switching: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl DisplayState {
    /// Empty state for a freshly selected instrument
    pub fn loading(instrument: Instrument) -> Self {
        Self {
            instrument,
            current_price: None,
            previous_price: None,
            segments: split_price(None),
            rolling_change_percent: Decimal::ZERO,
            volume: Decimal::ZERO,
            previous_volume: Decimal::ZERO,
            connection_status: ConnectionStatus::Connecting,
            switching: false,
            last_updated: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.current_price.is_none()
    }

    /// Price change since the previous tick
    pub fn price_delta(&self) -> Option<Decimal> {
        Some(self.current_price? - self.previous_price?)
    }

    pub fn formatted_volume(&self) -> String {
        format_volume(self.volume)
    }

    pub fn formatted_change(&self) -> String {
        format_percent(self.rolling_change_percent)
    }
}

/// Compact volume: `1.23M`, `4.56K`, or four decimals below a thousand
pub fn format_volume(volume: Decimal) -> String {
    let round =
        |v: Decimal, dp: u32| v.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    if volume >= dec!(1000000) {
        format!("{:.2}M", round(volume / dec!(1000000), 2))
    } else if volume >= dec!(1000) {
        format!("{:.2}K", round(volume / dec!(1000), 2))
    } else {
        format!("{:.4}", round(volume, 4))
    }
}

/// Signed percentage with two decimals, e.g. `+0.02%`
pub fn format_percent(change: Decimal) -> String {
    let rounded = change.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded > Decimal::ZERO {
        format!("+{:.2}%", rounded)
    } else if rounded < Decimal::ZERO {
        format!("{:.2}%", rounded)
    } else {
        "0.00%".to_string()
    }
}
