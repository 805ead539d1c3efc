//! Significant-move alerts on the leading display block

use super::PriceSegments;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const UP_HEADLINES: [&str; 3] = ["BULL RUN", "DELICIOUS", "TO THE MOON"];
const DOWN_HEADLINES: [&str; 3] = ["DIP ALERT", "TASTY DISCOUNT", "COOL DOWN"];

/// Direction of a significant move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

/// Emitted when the leading block changes value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveAlert {
    pub direction: MoveDirection,
    pub headline: &'static str,
    /// Leading block before the move
    pub from: String,
    /// Leading block after the move
    pub to: String,
}

impl MoveAlert {
    pub fn is_up(&self) -> bool {
        self.direction == MoveDirection::Up
    }
}

/// Rate-limited detector for leading-block changes
#[derive(Debug, Clone)]
pub struct MoveAlerter {
    cooldown: Duration,
    last_alert: Option<Instant>,
    up_rotation: usize,
    down_rotation: usize,
}

impl MoveAlerter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alert: None,
            up_rotation: 0,
            down_rotation: 0,
        }
    }

    /// 1.5 second cooldown
    pub fn with_defaults() -> Self {
        Self::new(Duration::from_millis(1_500))
    }

    /// Compare the leading blocks and emit an alert outside the cooldown.
    ///
    /// The leading block only triggers; direction comes from the whole
    /// displayed price, since the leading block changes magnitude when the
    /// layout moves between two and three blocks.
    pub fn observe(
        &mut self,
        previous: &PriceSegments,
        current: &PriceSegments,
        now: Instant,
    ) -> Option<MoveAlert> {
        let (from, to) = (previous.leading(), current.leading());
        if from == to {
            return None;
        }
        if let Some(last) = self.last_alert {
            if now.saturating_duration_since(last) < self.cooldown {
                return None;
            }
        }

        let direction = match (previous.to_decimal(), current.to_decimal()) {
            (Some(p), Some(c)) if c > p => MoveDirection::Up,
            (Some(p), Some(c)) if c < p => MoveDirection::Down,
            _ => return None,
        };

        self.last_alert = Some(now);
        let headline = match direction {
            MoveDirection::Up => {
                let h = UP_HEADLINES[self.up_rotation % UP_HEADLINES.len()];
                self.up_rotation += 1;
                h
            }
            MoveDirection::Down => {
                let h = DOWN_HEADLINES[self.down_rotation % DOWN_HEADLINES.len()];
                self.down_rotation += 1;
                h
            }
        };

        Some(MoveAlert {
            direction,
            headline,
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// Forget the cooldown clock (used on instrument switch)
    pub fn reset(&mut self) {
        self.last_alert = None;
    }
}
