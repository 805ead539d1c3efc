//! Feed controller: instrument switching on top of the supervisor
//!
//! Owns the whole pipeline for one display (supervisor, decoder, rolling
//! window, alerter, display state) and applies transport events to it.
//! All methods take the current [`Moment`] so behaviour is deterministic
//! under test.

use crate::clock::Moment;
use crate::config::Config;
use crate::display::{
    split_price, DisplayState, MoveAlert, MoveAlerter, RollingWindow, SegmentHighlights,
    ThresholdAlert, ThresholdAlerter, ThresholdSettings,
};
use crate::feed::{Instrument, InstrumentError, Tick, TickDecoder};
use crate::supervisor::{
    CloseOutcome, ConnectionId, ConnectionStatus, ConnectionSupervisor, Transport,
    TransportEvent, TransportEventKind,
};
use crate::telemetry::{increment, set_gauge, CounterMetric, GaugeMetric};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Coordinator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchPhase {
    /// Showing the selected instrument
    Idle,
    /// Waiting for the new instrument's first tick; alerts suppressed
    Switching { guard_until: Instant },
}

/// Something a renderer may want to react to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedEvent {
    StatusChanged { status: ConnectionStatus },
    TickApplied { highlights: SegmentHighlights },
    Alert { alert: MoveAlert },
    ThresholdCrossed { alert: ThresholdAlert },
    SwitchStarted { instrument: Instrument },
    SwitchSettled { instrument: Instrument },
    ReconnectScheduled { attempt: u32, delay_ms: u64 },
    GaveUp { attempts: u32 },
}

/// Timing knobs for the controller
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub window: chrono::Duration,
    pub alert_cooldown: Duration,
    pub switch_guard: Duration,
    pub thresholds: ThresholdSettings,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            window: chrono::Duration::minutes(10),
            alert_cooldown: Duration::from_millis(1_500),
            switch_guard: Duration::from_millis(2_000),
            thresholds: ThresholdSettings::default(),
        }
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            window: config.display.window(),
            alert_cooldown: config.display.alert_cooldown(),
            switch_guard: config.display.switch_guard(),
            thresholds: config.display.thresholds(),
        }
    }
}

pub struct FeedController<T: Transport> {
    supervisor: ConnectionSupervisor<T>,
    decoder: TickDecoder,
    window: RollingWindow,
    alerter: MoveAlerter,
    thresholds: ThresholdAlerter,
    display: DisplayState,
    phase: SwitchPhase,
    switch_guard: Duration,
}

impl<T: Transport> FeedController<T> {
    pub fn new(
        supervisor: ConnectionSupervisor<T>,
        instrument: Instrument,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            supervisor,
            decoder: TickDecoder::new(),
            window: RollingWindow::new(settings.window),
            alerter: MoveAlerter::new(settings.alert_cooldown),
            thresholds: ThresholdAlerter::new(settings.thresholds),
            display: DisplayState::loading(instrument),
            phase: SwitchPhase::Idle,
            switch_guard: settings.switch_guard,
        }
    }

    /// Build the whole pipeline from loaded configuration
    pub fn from_config(transport: T, config: &Config) -> Self {
        let supervisor =
            ConnectionSupervisor::new(transport, config.feed.stream(), config.backoff.policy());
        Self::new(supervisor, config.feed.instrument, ControllerSettings::from(config))
    }

    /// Replace the default decoder
    pub fn with_decoder(mut self, decoder: TickDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Open the first connection for the initially selected instrument
    pub fn start(&mut self) -> Vec<FeedEvent> {
        let instrument = self.display.instrument;
        tracing::info!(%instrument, "Starting feed");
        self.supervisor.connect(instrument);
        self.sync_status().into_iter().collect()
    }

    /// Validate a user-supplied symbol, then switch
    pub fn switch_to_symbol(
        &mut self,
        symbol: &str,
        now: Moment,
    ) -> Result<Vec<FeedEvent>, InstrumentError> {
        let instrument = symbol.parse()?;
        Ok(self.switch_instrument(instrument, now))
    }

    /// Migrate the pipeline to `instrument`.
    ///
    /// Allocating a new connection id invalidates everything still in flight
    /// for the old one. Display, window, and alert references are cleared
    /// so nothing from the old instrument is compared against the new one.
    pub fn switch_instrument(&mut self, instrument: Instrument, now: Moment) -> Vec<FeedEvent> {
        let already_live = self.display.instrument == instrument
            && self.phase == SwitchPhase::Idle
            && self.supervisor.status() == ConnectionStatus::Connected;
        if already_live {
            tracing::debug!(%instrument, "Already streaming instrument, ignoring switch");
            return Vec::new();
        }

        tracing::info!(from = %self.display.instrument, to = %instrument, "Switching instrument");
        self.phase = SwitchPhase::Switching {
            guard_until: now.instant + self.switch_guard,
        };
        self.display = DisplayState::loading(instrument);
        self.display.switching = true;
        self.window.clear();
        self.alerter.reset();
        self.thresholds.reset();

        self.supervisor.reset_attempts(instrument);
        self.supervisor.connect(instrument);

        let mut events = vec![FeedEvent::SwitchStarted { instrument }];
        events.extend(self.sync_status());
        events
    }

    /// Apply one transport event
    pub fn handle_transport_event(&mut self, event: TransportEvent, now: Moment) -> Vec<FeedEvent> {
        let TransportEvent { id, kind } = event;
        match kind {
            TransportEventKind::Opened => {
                self.supervisor.on_open(id);
                self.sync_status().into_iter().collect()
            }
            TransportEventKind::Message(text) => self.handle_message(id, &text, now),
            TransportEventKind::Closed { reason } => {
                let reason = reason.unwrap_or_else(|| "closed".to_string());
                self.handle_closed(id, &reason, now)
            }
            TransportEventKind::Error(error) => self.handle_closed(id, &error, now),
        }
    }

    /// Fire due timers: pending reconnect and the switch guard
    pub fn poll_timers(&mut self, now: Moment) -> Vec<FeedEvent> {
        let mut events = Vec::new();

        if let SwitchPhase::Switching { guard_until } = self.phase {
            if guard_until <= now.instant {
                tracing::debug!(instrument = %self.display.instrument, "Switch guard elapsed without a tick");
                self.settle_switch();
            }
        }

        if self.supervisor.poll_reconnect(now.instant).is_some() {
            events.extend(self.sync_status());
        }
        events
    }

    /// Earliest instant at which [`poll_timers`](Self::poll_timers) has work
    pub fn next_deadline(&self) -> Option<Instant> {
        let guard = match self.phase {
            SwitchPhase::Switching { guard_until } => Some(guard_until),
            SwitchPhase::Idle => None,
        };
        match (guard, self.supervisor.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Tear down the connection and cancel timers
    pub fn shutdown(&mut self) {
        tracing::info!(instrument = %self.display.instrument, "Shutting down feed");
        self.supervisor.close();
        self.display.connection_status = self.supervisor.status();
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn phase(&self) -> SwitchPhase {
        self.phase
    }

    pub fn is_switching(&self) -> bool {
        matches!(self.phase, SwitchPhase::Switching { .. })
    }

    pub fn supervisor(&self) -> &ConnectionSupervisor<T> {
        &self.supervisor
    }

    pub fn current_connection(&self) -> Option<ConnectionId> {
        self.supervisor.current_id()
    }

    fn handle_message(&mut self, id: ConnectionId, text: &str, now: Moment) -> Vec<FeedEvent> {
        if !self.supervisor.accepts_message(id) {
            return Vec::new();
        }
        match self.decoder.decode(text, now.wall) {
            Ok(tick) => self.apply_tick(tick, now),
            Err(e) => {
                tracing::debug!(%id, error = %e, "Discarding message");
                increment(CounterMetric::TicksDiscarded);
                Vec::new()
            }
        }
    }

    fn handle_closed(&mut self, id: ConnectionId, reason: &str, now: Moment) -> Vec<FeedEvent> {
        let outcome = self.supervisor.on_closed(id, reason, now.instant);
        let mut events: Vec<FeedEvent> = self.sync_status().into_iter().collect();
        match outcome {
            CloseOutcome::Ignored => {}
            CloseOutcome::Reconnecting { attempt, delay } => {
                events.push(FeedEvent::ReconnectScheduled {
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                });
            }
            CloseOutcome::GaveUp { attempts } => {
                events.push(FeedEvent::GaveUp { attempts });
            }
        }
        events
    }

    fn apply_tick(&mut self, tick: Tick, now: Moment) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        let old_segments = std::mem::take(&mut self.display.segments);
        let old_price = self.display.current_price;
        let first_tick = self.display.current_price.is_none();

        // The first tick of an instrument is its own reference point
        self.display.previous_price = if first_tick {
            Some(tick.price)
        } else {
            self.display.current_price
        };
        self.display.current_price = Some(tick.price);
        self.display.previous_volume = if first_tick {
            tick.volume
        } else {
            self.display.volume
        };
        self.display.volume = tick.volume;
        self.display.segments = split_price(Some(tick.price));
        self.display.rolling_change_percent = self.window.update(tick.received_at, tick.price);
        self.display.last_updated = Some(tick.received_at);

        increment(CounterMetric::TicksAccepted);
        if let Some(price) = tick.price.to_f64() {
            set_gauge(GaugeMetric::LastPrice, price);
        }
        if let Some(change) = self.display.rolling_change_percent.to_f64() {
            set_gauge(GaugeMetric::RollingChangePct, change);
        }

        let highlights = if first_tick {
            SegmentHighlights::default()
        } else {
            SegmentHighlights::between(&old_segments, &self.display.segments)
        };
        events.push(FeedEvent::TickApplied { highlights });

        if self.is_switching() {
            self.settle_switch();
            events.push(FeedEvent::SwitchSettled {
                instrument: self.display.instrument,
            });
        } else if !first_tick {
            if let Some(alert) =
                self.alerter
                    .observe(&old_segments, &self.display.segments, now.instant)
            {
                tracing::info!(
                    direction = ?alert.direction,
                    headline = alert.headline,
                    from = %alert.from,
                    to = %alert.to,
                    "Significant move"
                );
                events.push(FeedEvent::Alert { alert });
            }

            if let Some(previous) = old_price {
                let rolling = self.display.rolling_change_percent;
                for alert in self.thresholds.observe(previous, tick.price, rolling, now.instant) {
                    tracing::info!(
                        direction = ?alert.direction,
                        trigger = ?alert.trigger,
                        change = %alert.change.round_dp(2),
                        "Threshold crossed"
                    );
                    increment(CounterMetric::ThresholdAlerts);
                    events.push(FeedEvent::ThresholdCrossed { alert });
                }
            }
        }

        events
    }

    fn settle_switch(&mut self) {
        self.phase = SwitchPhase::Idle;
        self.display.switching = false;
    }

    /// Mirror the supervisor's status into the display, reporting changes
    fn sync_status(&mut self) -> Option<FeedEvent> {
        let status = self.supervisor.status();
        if self.display.connection_status == status {
            return None;
        }
        self.display.connection_status = status;
        Some(FeedEvent::StatusChanged { status })
    }
}
