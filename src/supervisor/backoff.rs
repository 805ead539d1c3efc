//! Reconnect backoff policy

use std::time::Duration;

/// One policy shared by every instrument.
///
/// `delay(n) = min(max_delay, base_delay * min(cap_factor, growth_rate^n))`
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    /// Must be >= 1 for delays to be non-decreasing
    pub growth_rate: f64,
    pub cap_factor: f64,
    pub max_delay: Duration,
    /// `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            growth_rate: 1.8,
            cap_factor: 10.0,
            max_delay: Duration::from_secs(60),
            max_attempts: Some(5),
        }
    }
}

impl BackoffPolicy {
    /// Delay before reconnect attempt `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let factor = self.growth_rate.powi(exponent).min(self.cap_factor).max(0.0);
        let millis = self.base_delay.as_millis() as f64 * factor;
        if !millis.is_finite() || millis >= self.max_delay.as_millis() as f64 {
            return self.max_delay;
        }
        Duration::from_millis(millis.round() as u64).min(self.max_delay)
    }

    /// Whether `attempt` is past the retry budget
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        matches!(self.max_attempts, Some(max) if attempt > max)
    }
}
