//! Connection supervision
//!
//! Keeps exactly one live stream connection per selected instrument and
//! recovers from drops with a bounded backoff. All staleness checks reduce
//! to comparing an event's [`ConnectionId`] with the current one.

mod backoff;
mod connection;
#[allow(clippy::module_inception)]
mod supervisor;
mod transport;

pub use backoff::BackoffPolicy;
pub use connection::{ConnectionHandle, ConnectionId, ConnectionStatus, LifecycleState};
pub use supervisor::{CloseOutcome, ConnectionSupervisor, PendingReconnect};
pub use transport::{Transport, TransportEvent, TransportEventKind};
