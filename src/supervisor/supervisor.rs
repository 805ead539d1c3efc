//! Connection supervisor: at most one live connection, reconnect with backoff

use super::{
    BackoffPolicy, ConnectionHandle, ConnectionId, ConnectionStatus, LifecycleState, Transport,
};
use crate::feed::{BinanceStream, Instrument};
use crate::telemetry::{increment, CounterMetric};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A reconnect waiting for its deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReconnect {
    pub instrument: Instrument,
    pub attempt: u32,
    pub due: Instant,
}

/// What the supervisor did with a close/error report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Event belonged to a superseded or already-closed connection
    Ignored,
    /// Reconnect armed
    Reconnecting { attempt: u32, delay: Duration },
    /// Retry budget spent; status stays disconnected
    GaveUp { attempts: u32 },
}

/// Owns the single current connection and its reconnect timer.
///
/// Every event handler first checks the event's id against the current
/// handle. Events from superseded connections are dropped, never applied.
pub struct ConnectionSupervisor<T: Transport> {
    transport: T,
    stream: BinanceStream,
    policy: BackoffPolicy,
    last_id: u64,
    current: Option<ConnectionHandle>,
    attempts: HashMap<Instrument, u32>,
    pending: Option<PendingReconnect>,
    status: ConnectionStatus,
}

impl<T: Transport> ConnectionSupervisor<T> {
    pub fn new(transport: T, stream: BinanceStream, policy: BackoffPolicy) -> Self {
        Self {
            transport,
            stream,
            policy,
            last_id: 0,
            current: None,
            attempts: HashMap::new(),
            pending: None,
            status: ConnectionStatus::Disconnected,
        }
    }

    /// Replace whatever is current with a fresh connection to `instrument`
    pub fn connect(&mut self, instrument: Instrument) -> ConnectionId {
        self.cancel_reconnect();
        self.teardown_current();

        self.last_id += 1;
        let id = ConnectionId(self.last_id);
        let url = self.stream.url_for(instrument);

        tracing::info!(%id, %instrument, %url, "Opening stream connection");
        self.transport.open(id, &url);
        self.current = Some(ConnectionHandle::new(id, instrument));
        self.status = ConnectionStatus::Connecting;
        increment(CounterMetric::ConnectionsOpened);
        id
    }

    /// Transport handshake finished
    pub fn on_open(&mut self, id: ConnectionId) -> bool {
        let Some(handle) = self.current.as_mut().filter(|h| h.id == id) else {
            Self::log_stale(id, "open");
            return false;
        };
        if handle.state != LifecycleState::Connecting {
            return false;
        }

        handle.state = LifecycleState::Open;
        self.attempts.insert(handle.instrument, 0);
        self.status = ConnectionStatus::Connected;
        tracing::info!(%id, instrument = %handle.instrument, "Stream connected");
        true
    }

    /// Whether a message from `id` may be applied
    pub fn accepts_message(&self, id: ConnectionId) -> bool {
        let accepted = self.is_current(id);
        if !accepted {
            Self::log_stale(id, "message");
        }
        accepted
    }

    /// Transport closed or failed; both take the same path
    pub fn on_closed(&mut self, id: ConnectionId, reason: &str, now: Instant) -> CloseOutcome {
        if !self.is_current(id) {
            Self::log_stale(id, "close");
            return CloseOutcome::Ignored;
        }
        let Some(handle) = self.current.as_mut() else {
            return CloseOutcome::Ignored;
        };

        handle.state = LifecycleState::Closed;
        let instrument = handle.instrument;
        self.transport.close(id);
        self.status = ConnectionStatus::Disconnected;

        let attempt = self.attempts.entry(instrument).or_insert(0);
        *attempt = attempt.saturating_add(1);
        let attempt = *attempt;

        if self.policy.is_exhausted(attempt) {
            tracing::error!(
                %id,
                %instrument,
                attempts = attempt - 1,
                reason,
                "Max reconnection attempts reached"
            );
            return CloseOutcome::GaveUp {
                attempts: attempt - 1,
            };
        }

        let delay = self.policy.delay(attempt);
        tracing::warn!(
            %id,
            %instrument,
            attempt,
            delay_ms = delay.as_millis() as u64,
            reason,
            "Stream closed, reconnecting..."
        );
        self.pending = Some(PendingReconnect {
            instrument,
            attempt,
            due: now + delay,
        });
        increment(CounterMetric::ReconnectsScheduled);
        CloseOutcome::Reconnecting { attempt, delay }
    }

    /// Fire the pending reconnect if its deadline has passed
    pub fn poll_reconnect(&mut self, now: Instant) -> Option<ConnectionId> {
        let due = self.pending.as_ref().is_some_and(|p| p.due <= now);
        if !due {
            return None;
        }
        let pending = self.pending.take()?;
        tracing::info!(
            instrument = %pending.instrument,
            attempt = pending.attempt,
            "Reconnecting"
        );
        Some(self.connect(pending.instrument))
    }

    /// Explicit teardown: cancel timers and close the current connection
    pub fn close(&mut self) {
        self.cancel_reconnect();
        self.teardown_current();
        self.status = ConnectionStatus::Disconnected;
    }

    /// Forget the retry history of `instrument`
    pub fn reset_attempts(&mut self, instrument: Instrument) {
        self.attempts.remove(&instrument);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    pub fn current(&self) -> Option<&ConnectionHandle> {
        self.current.as_ref()
    }

    pub fn current_id(&self) -> Option<ConnectionId> {
        self.current.as_ref().map(|h| h.id)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn pending_reconnect(&self) -> Option<&PendingReconnect> {
        self.pending.as_ref()
    }

    pub fn attempts(&self, instrument: Instrument) -> u32 {
        self.attempts.get(&instrument).copied().unwrap_or(0)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn is_current(&self, id: ConnectionId) -> bool {
        self.current
            .as_ref()
            .is_some_and(|h| h.id == id && h.state.is_live())
    }

    fn cancel_reconnect(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(
                instrument = %pending.instrument,
                attempt = pending.attempt,
                "Cancelled pending reconnect"
            );
        }
    }

    fn teardown_current(&mut self) {
        if let Some(handle) = self.current.as_mut() {
            if handle.state.is_live() {
                handle.state = LifecycleState::Closing;
                tracing::debug!(id = %handle.id, instrument = %handle.instrument, "Closing connection");
                self.transport.close(handle.id);
                handle.state = LifecycleState::Closed;
            }
        }
    }

    fn log_stale(id: ConnectionId, event: &'static str) {
        tracing::trace!(%id, event, "Dropping event from superseded connection");
        increment(CounterMetric::StaleEvents);
    }
}
