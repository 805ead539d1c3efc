//! Presentation formatting
//!
//! Turns validated ticks into display segments, per-segment highlights,
//! a rolling percentage change, significant-move alerts and percentage
//! threshold alerts.

mod alert;
mod segments;
mod state;
mod threshold;
mod window;

pub use alert::{MoveAlert, MoveAlerter, MoveDirection};
pub use segments::{
    split_price, split_price_f64, Highlight, PriceSegments, SegmentHighlights,
};
pub use state::{format_percent, format_volume, DisplayState};
pub use threshold::{ThresholdAlert, ThresholdAlerter, ThresholdSettings, ThresholdTrigger};
pub use window::RollingWindow;
