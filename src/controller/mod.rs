//! Feed controller
//!
//! Coordinates instrument switches across the supervisor, decoder and
//! display pipeline, and drives it all from a single async task.

mod coordinator;
mod service;

pub use coordinator::{ControllerSettings, FeedController, FeedEvent, SwitchPhase};
pub use service::{FeedError, FeedHandle, FeedService};
