//! Time source passed into every time-dependent operation

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// A point in time on both the monotonic and the wall clock.
///
/// Timers (reconnect, switch guard, alert cooldown) use `instant`; tick
/// timestamps and the rolling window use `wall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    pub instant: Instant,
    pub wall: DateTime<Utc>,
}

impl Moment {
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }

    /// The same moment shifted forward on both clocks
    pub fn advance(self, by: Duration) -> Self {
        let wall_delta = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
        Self {
            instant: self.instant + by,
            wall: self
                .wall
                .checked_add_signed(wall_delta)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}
