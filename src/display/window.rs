//! Time-bounded rolling window for percentage change

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;

/// Recent `(timestamp, price)` pairs covering the configured horizon.
///
/// Entries older than the horizon (relative to the newest entry) are evicted
/// before every computation.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    horizon: Duration,
    prices: VecDeque<(DateTime<Utc>, Decimal)>,
}

impl RollingWindow {
    pub fn new(horizon: Duration) -> Self {
        Self {
            horizon,
            prices: VecDeque::new(),
        }
    }

    /// Ten-minute window
    pub fn with_defaults() -> Self {
        Self::new(Duration::minutes(10))
    }

    /// Record a price and return the change over the window in percent
    pub fn update(&mut self, timestamp: DateTime<Utc>, price: Decimal) -> Decimal {
        self.prices.push_back((timestamp, price));
        self.evict(timestamp);
        self.change_percent()
    }

    /// Drop entries older than `now - horizon`
    pub fn evict(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.horizon;
        while let Some((ts, _)) = self.prices.front() {
            if *ts < cutoff {
                self.prices.pop_front();
            } else {
                break;
            }
        }
    }

    /// `(current - oldest) / oldest * 100`, zero when undefined
    pub fn change_percent(&self) -> Decimal {
        let (Some((_, oldest)), Some((_, current))) = (self.prices.front(), self.prices.back())
        else {
            return Decimal::ZERO;
        };
        if oldest.is_zero() {
            return Decimal::ZERO;
        }
        (*current - *oldest) / *oldest * dec!(100)
    }

    pub fn oldest(&self) -> Option<(DateTime<Utc>, Decimal)> {
        self.prices.front().copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn clear(&mut self) {
        self.prices.clear();
    }
}
