//! Connection identity and lifecycle

use crate::feed::Instrument;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically increasing id of one connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a single connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl LifecycleState {
    /// Connecting or open, i.e. still worth tearing down
    pub fn is_live(&self) -> bool {
        matches!(self, LifecycleState::Connecting | LifecycleState::Open)
    }
}

/// Connectivity as reported to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// One logical streaming session, owned by the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub instrument: Instrument,
    pub state: LifecycleState,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, instrument: Instrument) -> Self {
        Self {
            id,
            instrument,
            state: LifecycleState::Connecting,
        }
    }
}
