//! WebSocket transport
//!
//! Implements the supervisor's transport seam over tokio-tungstenite,
//! with ping/pong keepalive and handler detachment on close.

mod client;
mod types;

pub use client::WsTransport;
pub use types::{WsConfig, WsError};
