//! Tick decoding from raw stream messages
//!
//! Upstream shapes differ between stream types (ticker vs. trade vs.
//! aggregate trade), so price and volume are looked up through ordered
//! candidate lists instead of a fixed schema.

use super::Tick;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Parses one JSON field value into a decimal
pub type FieldParser = fn(&Value) -> Option<Decimal>;

/// A named field tried in priority order
#[derive(Debug, Clone, Copy)]
pub struct FieldCandidate {
    pub name: &'static str,
    pub parse: FieldParser,
}

impl FieldCandidate {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            parse: parse_decimal,
        }
    }
}

/// Last-price keys before generic price keys
pub const PRICE_FIELDS: &[FieldCandidate] = &[
    FieldCandidate::new("c"),
    FieldCandidate::new("lastPrice"),
    FieldCandidate::new("p"),
    FieldCandidate::new("price"),
];

/// Base-volume keys before quote/quantity keys
pub const VOLUME_FIELDS: &[FieldCandidate] = &[
    FieldCandidate::new("v"),
    FieldCandidate::new("volume"),
    FieldCandidate::new("q"),
];

/// Accepts JSON numbers and numeric strings
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        _ => None,
    }
}

/// Why a message did not produce a tick
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("no positive price field")]
    MissingPrice,
}

/// Turns raw text frames into validated ticks
#[derive(Debug, Clone)]
pub struct TickDecoder {
    price_fields: Vec<FieldCandidate>,
    volume_fields: Vec<FieldCandidate>,
}

impl Default for TickDecoder {
    fn default() -> Self {
        Self {
            price_fields: PRICE_FIELDS.to_vec(),
            volume_fields: VOLUME_FIELDS.to_vec(),
        }
    }
}

impl TickDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lowest-priority price candidate
    pub fn with_price_field(mut self, candidate: FieldCandidate) -> Self {
        self.price_fields.push(candidate);
        self
    }

    /// Append a lowest-priority volume candidate
    pub fn with_volume_field(mut self, candidate: FieldCandidate) -> Self {
        self.volume_fields.push(candidate);
        self
    }

    /// Decode a text frame into a tick stamped with `received_at`
    pub fn decode(&self, payload: &str, received_at: DateTime<Utc>) -> Result<Tick, DecodeError> {
        let root: Value =
            serde_json::from_str(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        // Combined streams wrap the event as {"stream": ..., "data": {...}}
        let body = match root.get("data") {
            Some(inner) if inner.is_object() => inner,
            _ => &root,
        };
        let object = body
            .as_object()
            .ok_or_else(|| DecodeError::Malformed("expected a JSON object".into()))?;

        let price = self
            .price_fields
            .iter()
            .filter_map(|c| object.get(c.name).and_then(c.parse))
            .find(|p| *p > Decimal::ZERO)
            .ok_or(DecodeError::MissingPrice)?;

        let volume = self
            .volume_fields
            .iter()
            .filter_map(|c| object.get(c.name).and_then(c.parse))
            .find(|v| *v >= Decimal::ZERO)
            .unwrap_or(Decimal::ZERO);

        Ok(Tick {
            price,
            volume,
            received_at,
        })
    }
}
