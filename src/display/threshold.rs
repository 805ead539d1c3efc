//! Percentage threshold alerts
//!
//! Fires when the rolling change crosses a band (default ±2%) or a single
//! tick moves sharply (default ±5%). Each direction has its own cooldown,
//! shared by both triggers.

use super::MoveDirection;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// What crossed the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdTrigger {
    /// Change from the previous tick
    TickMove,
    /// Change over the rolling window
    RollingChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThresholdAlert {
    pub direction: MoveDirection,
    pub trigger: ThresholdTrigger,
    /// Percent change that crossed the threshold
    pub change: Decimal,
}

/// Band limits and cooldown
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSettings {
    pub rolling_pct: Decimal,
    pub tick_pct: Decimal,
    pub cooldown: Duration,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            rolling_pct: dec!(2),
            tick_pct: dec!(5),
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdAlerter {
    settings: ThresholdSettings,
    last_up: Option<Instant>,
    last_down: Option<Instant>,
}

impl ThresholdAlerter {
    pub fn new(settings: ThresholdSettings) -> Self {
        Self {
            settings,
            last_up: None,
            last_down: None,
        }
    }

    /// Forget cooldowns, e.g. after switching instrument
    pub fn reset(&mut self) {
        self.last_up = None;
        self.last_down = None;
    }

    /// Check one applied tick.
    ///
    /// The tick move is checked first; a direction that fired on it stays
    /// quiet for the rolling check of the same tick.
    pub fn observe(
        &mut self,
        previous: Decimal,
        current: Decimal,
        rolling_change: Decimal,
        now: Instant,
    ) -> Vec<ThresholdAlert> {
        let mut alerts = Vec::new();

        if previous > Decimal::ZERO && current > Decimal::ZERO {
            let tick_change = (current - previous) / previous * dec!(100);
            let limit = self.settings.tick_pct;
            alerts.extend(self.crossing(tick_change, limit, ThresholdTrigger::TickMove, now));
        }

        let limit = self.settings.rolling_pct;
        alerts.extend(self.crossing(rolling_change, limit, ThresholdTrigger::RollingChange, now));
        alerts
    }

    fn crossing(
        &mut self,
        change: Decimal,
        limit: Decimal,
        trigger: ThresholdTrigger,
        now: Instant,
    ) -> Option<ThresholdAlert> {
        let direction = if change >= limit {
            MoveDirection::Up
        } else if change <= -limit {
            MoveDirection::Down
        } else {
            return None;
        };

        let cooldown = self.settings.cooldown;
        let last = match direction {
            MoveDirection::Up => &mut self.last_up,
            MoveDirection::Down => &mut self.last_down,
        };
        if last.is_some_and(|at| now.saturating_duration_since(at) <= cooldown) {
            return None;
        }
        *last = Some(now);

        Some(ThresholdAlert {
            direction,
            trigger,
            change,
        })
    }
}

impl Default for ThresholdAlerter {
    fn default() -> Self {
        Self::new(ThresholdSettings::default())
    }
}
