//! WebSocket transport: one tokio task per connection

use super::types::{StreamEnd, WsConfig, WsError};
use crate::supervisor::{ConnectionId, Transport, TransportEvent};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Opens WebSocket connections and reports their events tagged by id.
///
/// Reconnection is not handled here; a failed connection reports one
/// `Error` or `Closed` event and its task ends.
pub struct WsTransport {
    config: WsConfig,
    events: mpsc::Sender<TransportEvent>,
    links: HashMap<ConnectionId, oneshot::Sender<()>>,
}

impl WsTransport {
    /// Create a transport that reports into `events`
    pub fn new(config: WsConfig, events: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            config,
            events,
            links: HashMap::new(),
        }
    }

    /// Number of connections not yet closed through [`Transport::close`]
    pub fn active_links(&self) -> usize {
        self.links.len()
    }

    /// Drive one connection until it fails, the peer closes, or we are stopped
    async fn run_connection(
        id: ConnectionId,
        url: String,
        config: WsConfig,
        events: mpsc::Sender<TransportEvent>,
        mut stop: oneshot::Receiver<()>,
    ) {
        match Self::connect_and_stream(id, &url, &config, &events, &mut stop).await {
            Ok(StreamEnd::Stopped) => {
                tracing::debug!(%id, "Connection detached");
            }
            Ok(StreamEnd::ClosedByPeer) => {
                let _ = events
                    .send(TransportEvent::closed(id, Some("close frame".into())))
                    .await;
            }
            Err(e) => {
                tracing::debug!(%id, error = %e, "Connection ended with error");
                let _ = events.send(TransportEvent::error(id, e.to_string())).await;
            }
        }
    }

    /// Connect to WebSocket and stream messages
    async fn connect_and_stream(
        id: ConnectionId,
        url: &str,
        config: &WsConfig,
        events: &mpsc::Sender<TransportEvent>,
        stop: &mut oneshot::Receiver<()>,
    ) -> Result<StreamEnd, WsError> {
        tracing::debug!(%id, %url, "Connecting to WebSocket");

        let ws_stream = tokio::select! {
            _ = &mut *stop => return Ok(StreamEnd::Stopped),
            result = connect_async(url) => {
                let (stream, _response) =
                    result.map_err(|e| WsError::ConnectionFailed(e.to_string()))?;
                stream
            }
        };

        let (mut write, mut read) = ws_stream.split();

        if events.send(TransportEvent::opened(id)).await.is_err() {
            return Ok(StreamEnd::Stopped);
        }

        // Setup ping interval; the first tick fires immediately, skip it
        let mut ping_interval = tokio::time::interval(config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ping_interval.tick().await;

        let mut pong_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = &mut *stop => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(StreamEnd::Stopped);
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if events.send(TransportEvent::message(id, text)).await.is_err() {
                                return Ok(StreamEnd::Stopped);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            pong_deadline = None;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!(%id, "Received close frame");
                            return Ok(StreamEnd::ClosedByPeer);
                        }
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(WsError::ConnectionFailed("Stream ended unexpectedly".into()));
                        }
                        // Binary and raw frames carry nothing for a ticker stream
                        Some(Ok(_)) => {}
                    }
                }

                _ = ping_interval.tick() => {
                    if pong_deadline.is_none() {
                        write.send(Message::Ping(Vec::new())).await
                            .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        pong_deadline = Some(Instant::now() + config.pong_timeout);
                    }
                }

                _ = wait_until(pong_deadline) => {
                    return Err(WsError::PongTimeout);
                }
            }
        }
    }
}

impl Transport for WsTransport {
    fn open(&mut self, id: ConnectionId, url: &str) {
        let (stop_tx, stop_rx) = oneshot::channel();
        self.links.insert(id, stop_tx);

        let url = url.to_string();
        let config = self.config.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            Self::run_connection(id, url, config, events, stop_rx).await;
        });
    }

    fn close(&mut self, id: ConnectionId) {
        if let Some(stop) = self.links.remove(&id) {
            // Task may already be gone; nothing to detach then
            let _ = stop.send(());
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
