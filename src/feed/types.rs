//! Price feed types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A tracked instrument, always paired against the configured quote currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum Instrument {
    Btc,
    Eth,
    Sol,
}

impl Instrument {
    /// The closed set of supported instruments
    pub const ALL: [Instrument; 3] = [Instrument::Btc, Instrument::Eth, Instrument::Sol];

    /// Display symbol (e.g., "BTC")
    pub fn symbol(&self) -> &'static str {
        match self {
            Instrument::Btc => "BTC",
            Instrument::Eth => "ETH",
            Instrument::Sol => "SOL",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Instrument {
    type Err = InstrumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Instrument::ALL
            .into_iter()
            .find(|i| i.symbol().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| InstrumentError::Unsupported(trimmed.to_string()))
    }
}

impl TryFrom<String> for Instrument {
    type Error = InstrumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Rejection of a switch target outside the supported set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstrumentError {
    #[error("unsupported instrument: {0:?} (supported: BTC, ETH, SOL)")]
    Unsupported(String),
}

/// One validated price observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Last trade price, always > 0
    pub price: Decimal,
    /// Base-asset volume, always >= 0
    pub volume: Decimal,
    /// Local timestamp when the message was decoded
    pub received_at: DateTime<Utc>,
}
