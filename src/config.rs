//! Configuration types for live-ticker

use crate::display::ThresholdSettings;
use crate::feed::{BinanceStream, Instrument, StreamKind};
use crate::supervisor::BackoffPolicy;
use crate::telemetry::LogFormat;
use crate::ws::WsConfig;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest rolling window accepted (one week)
const MAX_WINDOW_MINUTES: u64 = 7 * 24 * 60;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub ws: WsSettings,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Upstream feed configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// WebSocket endpoint without the stream path
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Instrument tracked on startup
    #[serde(default = "default_instrument")]
    pub instrument: Instrument,

    /// Quote currency every instrument is paired against
    #[serde(default = "default_quote")]
    pub quote: String,

    /// Stream type to subscribe to
    #[serde(default)]
    pub stream: StreamKind,
}

fn default_endpoint() -> String {
    "wss://stream.binance.com:9443/ws".to_string()
}
fn default_instrument() -> Instrument {
    Instrument::Btc
}
fn default_quote() -> String {
    "usdt".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            instrument: default_instrument(),
            quote: default_quote(),
            stream: StreamKind::default(),
        }
    }
}

impl FeedConfig {
    /// Stream URL builder for this feed
    pub fn stream(&self) -> BinanceStream {
        BinanceStream::new(&self.endpoint, &self.quote, self.stream)
    }
}

/// Reconnect backoff configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackoffConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Multiplier applied per attempt, must be >= 1
    #[serde(default = "default_growth_rate")]
    pub growth_rate: f64,

    /// Upper bound on the multiplier
    #[serde(default = "default_cap_factor")]
    pub cap_factor: f64,

    /// Hard ceiling on any single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Attempts before giving up (0 = unbounded)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_base_delay_ms() -> u64 {
    2_000
}
fn default_growth_rate() -> f64 {
    1.8
}
fn default_cap_factor() -> f64 {
    10.0
}
fn default_max_delay_ms() -> u64 {
    60_000
}
fn default_max_attempts() -> u32 {
    5
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            growth_rate: default_growth_rate(),
            cap_factor: default_cap_factor(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl BackoffConfig {
    pub fn policy(&self) -> BackoffPolicy {
        let max_attempts = match self.max_attempts {
            0 => None,
            n => Some(n),
        };
        BackoffPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms),
            growth_rate: self.growth_rate,
            cap_factor: self.cap_factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts,
        }
    }
}

/// Presentation timing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Rolling change horizon
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u64,

    /// How long a segment stays highlighted after it changes
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,

    /// Minimum spacing between significant-move alerts
    #[serde(default = "default_alert_cooldown_ms")]
    pub alert_cooldown_ms: u64,

    /// Safety net that ends a switch even if no tick arrives
    #[serde(default = "default_switch_guard_ms")]
    pub switch_guard_ms: u64,

    /// Rolling change (percent, either sign) that triggers a threshold alert
    #[serde(default = "default_rolling_alert_pct")]
    pub rolling_alert_pct: f64,

    /// Single tick move (percent, either sign) that triggers a threshold alert
    #[serde(default = "default_tick_alert_pct")]
    pub tick_alert_pct: f64,

    /// Per-direction spacing between threshold alerts
    #[serde(default = "default_threshold_cooldown_ms")]
    pub threshold_cooldown_ms: u64,
}

fn default_window_minutes() -> u64 {
    10
}
fn default_highlight_ms() -> u64 {
    900
}
fn default_alert_cooldown_ms() -> u64 {
    1_500
}
fn default_switch_guard_ms() -> u64 {
    2_000
}
fn default_rolling_alert_pct() -> f64 {
    2.0
}
fn default_tick_alert_pct() -> f64 {
    5.0
}
fn default_threshold_cooldown_ms() -> u64 {
    30_000
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
            highlight_ms: default_highlight_ms(),
            alert_cooldown_ms: default_alert_cooldown_ms(),
            switch_guard_ms: default_switch_guard_ms(),
            rolling_alert_pct: default_rolling_alert_pct(),
            tick_alert_pct: default_tick_alert_pct(),
            threshold_cooldown_ms: default_threshold_cooldown_ms(),
        }
    }
}

impl DisplayConfig {
    pub fn window(&self) -> chrono::Duration {
        let minutes = self.window_minutes.min(MAX_WINDOW_MINUTES) as i64;
        chrono::Duration::try_minutes(minutes)
            .unwrap_or_else(|| chrono::Duration::minutes(default_window_minutes() as i64))
    }

    pub fn highlight(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_millis(self.alert_cooldown_ms)
    }

    pub fn switch_guard(&self) -> Duration {
        Duration::from_millis(self.switch_guard_ms)
    }

    pub fn thresholds(&self) -> ThresholdSettings {
        let defaults = ThresholdSettings::default();
        ThresholdSettings {
            rolling_pct: Decimal::from_f64(self.rolling_alert_pct).unwrap_or(defaults.rolling_pct),
            tick_pct: Decimal::from_f64(self.tick_alert_pct).unwrap_or(defaults.tick_pct),
            cooldown: Duration::from_millis(self.threshold_cooldown_ms),
        }
    }
}

/// WebSocket keepalive configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WsSettings {
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    #[serde(default = "default_pong_timeout_secs")]
    pub pong_timeout_secs: u64,
}

fn default_ping_interval_secs() -> u64 {
    30
}
fn default_pong_timeout_secs() -> u64 {
    10
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval_secs(),
            pong_timeout_secs: default_pong_timeout_secs(),
        }
    }
}

impl WsSettings {
    pub fn client_config(&self) -> WsConfig {
        WsConfig::default()
            .ping_interval(Duration::from_secs(self.ping_interval_secs))
            .pong_timeout(Duration::from_secs(self.pong_timeout_secs))
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Serve Prometheus metrics on this port when set
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would break backoff or window invariants
    pub fn validate(&self) -> anyhow::Result<()> {
        let b = &self.backoff;
        anyhow::ensure!(
            b.growth_rate.is_finite() && b.growth_rate >= 1.0,
            "backoff.growth_rate must be >= 1.0, got {}",
            b.growth_rate
        );
        anyhow::ensure!(
            b.cap_factor.is_finite() && b.cap_factor >= 1.0,
            "backoff.cap_factor must be >= 1.0, got {}",
            b.cap_factor
        );
        anyhow::ensure!(b.base_delay_ms > 0, "backoff.base_delay_ms must be positive");
        anyhow::ensure!(
            b.max_delay_ms >= b.base_delay_ms,
            "backoff.max_delay_ms must be >= base_delay_ms"
        );
        let d = &self.display;
        anyhow::ensure!(d.window_minutes > 0, "display.window_minutes must be positive");
        anyhow::ensure!(
            d.window_minutes <= MAX_WINDOW_MINUTES,
            "display.window_minutes must be at most {MAX_WINDOW_MINUTES}, got {}",
            d.window_minutes
        );
        for (name, pct) in [
            ("rolling_alert_pct", d.rolling_alert_pct),
            ("tick_alert_pct", d.tick_alert_pct),
        ] {
            anyhow::ensure!(
                pct.is_finite() && pct > 0.0,
                "display.{name} must be a positive percentage, got {pct}"
            );
        }
        anyhow::ensure!(!self.feed.quote.is_empty(), "feed.quote must not be empty");
        anyhow::ensure!(
            self.feed.endpoint.starts_with("ws://") || self.feed.endpoint.starts_with("wss://"),
            "feed.endpoint must be a ws:// or wss:// URL"
        );
        Ok(())
    }
}
