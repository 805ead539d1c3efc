//! Binance public stream addressing

use super::Instrument;
use serde::{Deserialize, Serialize};

/// Binance WebSocket base URL
pub const BINANCE_WS_URL: &str = "wss://stream.binance.com:9443/ws";

/// Stream type; the decoder accepts all three shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StreamKind {
    /// 24h rolling ticker (`c` last price, `v` base volume)
    #[default]
    #[serde(rename = "ticker")]
    Ticker,
    /// Raw trades (`p` price, `q` quantity)
    #[serde(rename = "trade")]
    Trade,
    /// Aggregate trades (`p` price, `q` quantity)
    #[serde(rename = "aggTrade")]
    AggTrade,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Ticker => "ticker",
            StreamKind::Trade => "trade",
            StreamKind::AggTrade => "aggTrade",
        }
    }
}

/// Builds one stream URL per instrument
#[derive(Debug, Clone)]
pub struct BinanceStream {
    endpoint: String,
    quote: String,
    kind: StreamKind,
}

impl BinanceStream {
    pub fn new(endpoint: impl Into<String>, quote: impl Into<String>, kind: StreamKind) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            quote: quote.into().to_lowercase(),
            kind,
        }
    }

    /// Lowercased stream symbol (e.g., "btcusdt")
    pub fn stream_symbol(&self, instrument: Instrument) -> String {
        format!("{}{}", instrument.symbol().to_lowercase(), self.quote)
    }

    /// Full WebSocket URL for the instrument's stream
    pub fn url_for(&self, instrument: Instrument) -> String {
        format!(
            "{}/{}@{}",
            self.endpoint,
            self.stream_symbol(instrument),
            self.kind.as_str()
        )
    }
}

impl Default for BinanceStream {
    fn default() -> Self {
        Self::new(BINANCE_WS_URL, "usdt", StreamKind::Ticker)
    }
}
