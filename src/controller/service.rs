//! Async driver for the feed controller
//!
//! One task owns the [`FeedController`] and multiplexes transport events,
//! user commands and timer deadlines. Renderers observe it through a
//! [`FeedHandle`].

use super::{FeedController, FeedEvent};
use crate::clock::Moment;
use crate::config::Config;
use crate::display::DisplayState;
use crate::feed::{Instrument, InstrumentError};
use crate::supervisor::{Transport, TransportEvent};
use crate::ws::WsTransport;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

const TRANSPORT_CHANNEL_CAPACITY: usize = 1024;
const COMMAND_CHANNEL_CAPACITY: usize = 32;
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Errors surfaced to callers of [`FeedHandle`]
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Instrument(#[from] InstrumentError),
    #[error("Feed service has stopped")]
    Stopped,
    #[error("Feed task failed: {0}")]
    Task(String),
}

#[derive(Debug)]
enum FeedCommand {
    Switch(Instrument),
    Shutdown,
}

/// Client side of a running feed
pub struct FeedHandle {
    commands: mpsc::Sender<FeedCommand>,
    display: watch::Receiver<DisplayState>,
    events: broadcast::Sender<FeedEvent>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// Validate `symbol` and ask the feed to switch to it.
    ///
    /// Unsupported symbols are rejected here and never reach the feed.
    pub async fn switch_instrument(&self, symbol: &str) -> Result<Instrument, FeedError> {
        let instrument: Instrument = symbol.parse()?;
        self.commands
            .send(FeedCommand::Switch(instrument))
            .await
            .map_err(|_| FeedError::Stopped)?;
        Ok(instrument)
    }

    /// Snapshot of the latest display state
    pub fn display(&self) -> DisplayState {
        self.display.borrow().clone()
    }

    /// Receiver notified whenever the display state changes
    pub fn watch_display(&self) -> watch::Receiver<DisplayState> {
        self.display.clone()
    }

    /// Subscribe to feed events (highlights, alerts, status changes)
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    /// Stop the feed, close the connection and wait for the task to end
    pub async fn shutdown(self) -> Result<(), FeedError> {
        // Task may already have ended; the join below reports that
        let _ = self.commands.send(FeedCommand::Shutdown).await;
        self.task
            .await
            .map_err(|e| FeedError::Task(e.to_string()))
    }
}

/// Spawns feed tasks
pub struct FeedService;

impl FeedService {
    /// Start a feed over real WebSocket connections
    pub fn spawn(config: &Config) -> FeedHandle {
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_CHANNEL_CAPACITY);
        let transport = WsTransport::new(config.ws.client_config(), transport_tx);
        let controller = FeedController::from_config(transport, config);
        Self::spawn_with(controller, transport_rx)
    }

    /// Start a feed around an existing controller.
    ///
    /// `transport_events` must be the receiving end of whatever channel the
    /// controller's transport reports into.
    pub fn spawn_with<T>(
        controller: FeedController<T>,
        transport_events: mpsc::Receiver<TransportEvent>,
    ) -> FeedHandle
    where
        T: Transport + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (display_tx, display_rx) = watch::channel(controller.display().clone());
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let task = tokio::spawn(run(
            controller,
            transport_events,
            command_rx,
            display_tx,
            event_tx.clone(),
        ));

        FeedHandle {
            commands: command_tx,
            display: display_rx,
            events: event_tx,
            task,
        }
    }
}

async fn run<T: Transport>(
    mut controller: FeedController<T>,
    mut transport_events: mpsc::Receiver<TransportEvent>,
    mut commands: mpsc::Receiver<FeedCommand>,
    display: watch::Sender<DisplayState>,
    events: broadcast::Sender<FeedEvent>,
) {
    let started = controller.start();
    publish(&controller, &display, &events, started);

    loop {
        let deadline = controller.next_deadline();

        let emitted = tokio::select! {
            Some(event) = transport_events.recv() => {
                controller.handle_transport_event(event, Moment::now())
            }

            command = commands.recv() => match command {
                Some(FeedCommand::Switch(instrument)) => {
                    controller.switch_instrument(instrument, Moment::now())
                }
                Some(FeedCommand::Shutdown) | None => {
                    controller.shutdown();
                    publish(&controller, &display, &events, Vec::new());
                    break;
                }
            },

            _ = sleep_until(deadline) => {
                controller.poll_timers(Moment::now())
            }
        };

        publish(&controller, &display, &events, emitted);
    }

    tracing::info!("Feed task stopped");
}

fn publish<T: Transport>(
    controller: &FeedController<T>,
    display: &watch::Sender<DisplayState>,
    events: &broadcast::Sender<FeedEvent>,
    emitted: Vec<FeedEvent>,
) {
    let latest = controller.display();
    display.send_if_modified(|current| {
        if current == latest {
            return false;
        }
        *current = latest.clone();
        true
    });
    for event in emitted {
        // No subscribers is fine
        let _ = events.send(event);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
