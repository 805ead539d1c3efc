//! Prometheus metrics

use std::net::SocketAddr;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Ticks applied to the display
    TicksAccepted,
    /// Messages that did not decode into a tick
    TicksDiscarded,
    /// Events dropped because their connection was superseded
    StaleEvents,
    /// Connection attempts started
    ConnectionsOpened,
    /// Reconnects armed after a close
    ReconnectsScheduled,
    /// Percentage threshold alerts fired
    ThresholdAlerts,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Last applied price
    LastPrice,
    /// Rolling percentage change over the window
    RollingChangePct,
}

impl CounterMetric {
    pub fn name(&self) -> &'static str {
        match self {
            CounterMetric::TicksAccepted => "ticker_ticks_accepted_total",
            CounterMetric::TicksDiscarded => "ticker_ticks_discarded_total",
            CounterMetric::StaleEvents => "ticker_stale_events_total",
            CounterMetric::ConnectionsOpened => "ticker_connections_opened_total",
            CounterMetric::ReconnectsScheduled => "ticker_reconnects_scheduled_total",
            CounterMetric::ThresholdAlerts => "ticker_threshold_alerts_total",
        }
    }
}

impl GaugeMetric {
    pub fn name(&self) -> &'static str {
        match self {
            GaugeMetric::LastPrice => "ticker_last_price",
            GaugeMetric::RollingChangePct => "ticker_rolling_change_pct",
        }
    }
}

/// Bump a counter by one
pub fn increment(metric: CounterMetric) {
    ::metrics::counter!(metric.name()).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    ::metrics::gauge!(metric.name()).set(value);
}

/// Serve metrics over HTTP; must run inside a tokio runtime
pub fn install_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter on {}: {}", addr, e))?;
    tracing::info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}
