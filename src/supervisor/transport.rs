//! Transport seam between the supervisor and a concrete socket

use super::ConnectionId;

/// Something that can open and close streaming connections.
///
/// Implementations report outcomes asynchronously as [`TransportEvent`]s
/// tagged with the id passed to `open`. After `close(id)` returns, no more
/// events for `id` should be emitted; the supervisor drops them anyway.
pub trait Transport {
    /// Start connecting; must not block on the handshake
    fn open(&mut self, id: ConnectionId, url: &str);

    /// Detach and close the connection
    fn close(&mut self, id: ConnectionId);
}

/// An outcome reported by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub id: ConnectionId,
    pub kind: TransportEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// Handshake completed
    Opened,
    /// Text frame
    Message(String),
    /// Peer or network closed the stream
    Closed { reason: Option<String> },
    /// Transport or protocol failure
    Error(String),
}

impl TransportEvent {
    pub fn opened(id: ConnectionId) -> Self {
        Self {
            id,
            kind: TransportEventKind::Opened,
        }
    }

    pub fn message(id: ConnectionId, text: impl Into<String>) -> Self {
        Self {
            id,
            kind: TransportEventKind::Message(text.into()),
        }
    }

    pub fn closed(id: ConnectionId, reason: Option<String>) -> Self {
        Self {
            id,
            kind: TransportEventKind::Closed { reason },
        }
    }

    pub fn error(id: ConnectionId, error: impl Into<String>) -> Self {
        Self {
            id,
            kind: TransportEventKind::Error(error.into()),
        }
    }
}
