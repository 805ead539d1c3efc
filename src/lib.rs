//! live-ticker: live crypto price feed with a segmented terminal display
//!
//! This library provides the core components for:
//! - Decoding Binance ticker/trade streams into validated ticks
//! - Supervising a single stream connection with bounded reconnect backoff
//! - Switching instruments without mixing data from superseded connections
//! - Price segments, digit highlights, rolling change and move alerts
//! - Logging and metrics

pub mod cli;
pub mod clock;
pub mod config;
pub mod controller;
pub mod display;
pub mod feed;
pub mod supervisor;
pub mod telemetry;
pub mod ws;
