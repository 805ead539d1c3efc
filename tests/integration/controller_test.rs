//! Integration tests for the feed controller, driven by a fake transport

use live_ticker::clock::Moment;
use live_ticker::config::Config;
use live_ticker::controller::{FeedController, FeedEvent};
use live_ticker::display::{Highlight, MoveDirection, PriceSegments, ThresholdTrigger};
use live_ticker::feed::Instrument;
use live_ticker::supervisor::{ConnectionId, ConnectionStatus, Transport, TransportEvent};
use rust_decimal_macros::dec;
use std::time::Duration;

/// Records what the supervisor asked of the network
#[derive(Default)]
struct FakeTransport {
    opened: Vec<(ConnectionId, String)>,
    closed: Vec<ConnectionId>,
}

impl Transport for FakeTransport {
    fn open(&mut self, id: ConnectionId, url: &str) {
        self.opened.push((id, url.to_string()));
    }

    fn close(&mut self, id: ConnectionId) {
        self.closed.push(id);
    }
}

fn controller() -> FeedController<FakeTransport> {
    FeedController::from_config(FakeTransport::default(), &Config::default())
}

fn ticker(price: &str) -> String {
    format!(r#"{{"e":"24hrTicker","s":"BTCUSDT","c":"{}","v":"18234.11"}}"#, price)
}

fn tick(
    ctl: &mut FeedController<FakeTransport>,
    id: u64,
    price: &str,
    now: Moment,
) -> Vec<FeedEvent> {
    ctl.handle_transport_event(TransportEvent::message(ConnectionId(id), ticker(price)), now)
}

fn segs(left: &str, middle: &str, right: &str) -> PriceSegments {
    PriceSegments {
        left: left.to_string(),
        middle: middle.to_string(),
        right: right.to_string(),
    }
}

fn alerts(events: &[FeedEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, FeedEvent::Alert { .. }))
        .count()
}

fn thresholds(events: &[FeedEvent]) -> Vec<(MoveDirection, ThresholdTrigger)> {
    events
        .iter()
        .filter_map(|e| match e {
            FeedEvent::ThresholdCrossed { alert } => Some((alert.direction, alert.trigger)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_end_to_end_btc_ticks() {
    let mut ctl = controller();
    let t0 = Moment::now();
    ctl.start();
    assert_eq!(
        ctl.supervisor().transport().opened,
        vec![(
            ConnectionId(1),
            "wss://stream.binance.com:9443/ws/btcusdt@ticker".to_string()
        )]
    );

    ctl.handle_transport_event(TransportEvent::opened(ConnectionId(1)), t0);
    let first = tick(&mut ctl, 1, "65000.00", t0);
    assert_eq!(ctl.display().segments, segs("65", "000", ".00"));
    assert_eq!(
        first,
        vec![FeedEvent::TickApplied {
            highlights: Default::default()
        }]
    );

    let t1 = t0.advance(Duration::from_secs(1));
    let second = tick(&mut ctl, 1, "65010.50", t1);

    let display = ctl.display();
    assert_eq!(display.segments, segs("65", "010", ".50"));
    assert_eq!(display.current_price, Some(dec!(65010.50)));
    assert_eq!(display.previous_price, Some(dec!(65000.00)));
    assert_eq!(display.rolling_change_percent.round_dp(6), dec!(0.016154));
    assert_eq!(display.last_updated, Some(t1.wall));

    let FeedEvent::TickApplied { highlights } = &second[0] else {
        panic!("expected TickApplied, got {second:?}");
    };
    assert_eq!(highlights.left, Highlight::None);
    assert_eq!(highlights.middle, Highlight::Up);
    assert_eq!(highlights.right, Highlight::Up);
    // Leading block "65" did not change
    assert_eq!(alerts(&second), 0);
}

#[test]
fn test_messages_from_previous_instrument_are_dropped() {
    let mut ctl = controller();
    let t0 = Moment::now();
    ctl.start();
    ctl.handle_transport_event(TransportEvent::opened(ConnectionId(1)), t0);
    tick(&mut ctl, 1, "65000.00", t0);

    let events = ctl.switch_instrument(Instrument::Eth, t0);
    assert!(events.contains(&FeedEvent::SwitchStarted {
        instrument: Instrument::Eth
    }));
    assert_eq!(ctl.supervisor().transport().closed, vec![ConnectionId(1)]);
    assert!(ctl.display().is_loading());

    // A BTC tick still in flight on the old connection
    let stale = tick(&mut ctl, 1, "65020.00", t0);
    assert!(stale.is_empty());
    assert!(ctl.display().is_loading());
    assert_eq!(ctl.display().instrument, Instrument::Eth);

    ctl.handle_transport_event(TransportEvent::opened(ConnectionId(2)), t0);
    tick(&mut ctl, 2, "3500.00", t0);
    assert_eq!(ctl.display().current_price, Some(dec!(3500.00)));
    assert_eq!(ctl.display().previous_price, Some(dec!(3500.00)));
}

#[test]
fn test_late_message_after_new_instrument_first_tick() {
    let mut ctl = controller();
    let t0 = Moment::now();
    ctl.start();
    ctl.handle_transport_event(TransportEvent::opened(ConnectionId(1)), t0);
    tick(&mut ctl, 1, "65000.00", t0);

    ctl.switch_instrument(Instrument::Eth, t0);
    ctl.handle_transport_event(TransportEvent::opened(ConnectionId(2)), t0);
    tick(&mut ctl, 2, "3500.00", t0);
    let before = ctl.display().clone();

    // The old connection delivers once more after ETH went live
    let late = tick(&mut ctl, 1, "65020.00", t0.advance(Duration::from_millis(50)));
    assert!(late.is_empty());
    assert_eq!(ctl.display(), &before);
}

#[test]
fn test_switch_suppresses_alert_on_first_tick() {
    let mut ctl = controller();
    let t0 = Moment::now();
    ctl.start();
    ctl.handle_transport_event(TransportEvent::opened(ConnectionId(1)), t0);
    tick(&mut ctl, 1, "65000.00", t0);

    ctl.switch_instrument(Instrument::Eth, t0);
    assert!(ctl.is_switching());
    ctl.handle_transport_event(TransportEvent::opened(ConnectionId(2)), t0);

    // Wildly different from the last BTC price
    let first = tick(&mut ctl, 2, "3500.00", t0);
    assert_eq!(alerts(&first), 0);
    assert!(first.contains(&FeedEvent::SwitchSettled {
        instrument: Instrument::Eth
    }));
    assert!(!ctl.is_switching());
    assert!(!ctl.display().switching);

    // Alerts resume for moves within the new instrument
    let later = t0.advance(Duration::from_secs(2));
    let moved = tick(&mut ctl, 2, "4600.00", later);
    let alert = moved
        .iter()
        .find_map(|e| match e {
            FeedEvent::Alert { alert } => Some(alert.clone()),
            _ => None,
        })
        .expect("leading block changed");
    assert_eq!(alert.direction, MoveDirection::Up);
    assert_eq!(alert.from, "3");
    assert_eq!(alert.to, "4");
}

#[test]
fn test_alert_cooldown() {
    let mut ctl = controller();
    let t0 = Moment::now();
    ctl.start();
    ctl.handle_transport_event(TransportEvent::opened(ConnectionId(1)), t0);
    tick(&mut ctl, 1, "65000.00", t0);

    let up = tick(&mut ctl, 1, "66000.00", t0.advance(Duration::from_millis(100)));
    assert_eq!(alerts(&up), 1);

    let too_soon = tick(&mut ctl, 1, "65000.00", t0.advance(Duration::from_millis(600)));
    assert_eq!(alerts(&too_soon), 0);

    let after = tick(&mut ctl, 1, "64000.00", t0.advance(Duration::from_millis(1700)));
    assert_eq!(alerts(&after), 1);
}

#[test]
fn test_threshold_alerts_follow_rolling_change() {
    let mut ctl = controller();
    let t0 = Moment::now();
    ctl.start();
    ctl.handle_transport_event(TransportEvent::opened(ConnectionId(1)), t0);
    tick(&mut ctl, 1, "65000.00", t0);

    // +1% stays inside the band
    let quiet = tick(&mut ctl, 1, "65650.00", t0.advance(Duration::from_secs(1)));
    assert!(thresholds(&quiet).is_empty());

    // +2.5% over the window
    let up = tick(&mut ctl, 1, "66625.00", t0.advance(Duration::from_secs(2)));
    assert_eq!(
        thresholds(&up),
        vec![(MoveDirection::Up, ThresholdTrigger::RollingChange)]
    );

    // Still above the band, but inside the 30s cooldown
    let cooling = tick(&mut ctl, 1, "66700.00", t0.advance(Duration::from_secs(20)));
    assert!(thresholds(&cooling).is_empty());

    // A sharp drop fires downwards on the tick move alone
    let down = tick(&mut ctl, 1, "62000.00", t0.advance(Duration::from_secs(21)));
    assert_eq!(
        thresholds(&down),
        vec![(MoveDirection::Down, ThresholdTrigger::TickMove)]
    );
}

#[test]
fn test_threshold_alerts_suppressed_while_switching() {
    let mut ctl = controller();
    let t0 = Moment::now();
    ctl.start();
    ctl.handle_transport_event(TransportEvent::opened(ConnectionId(1)), t0);
    tick(&mut ctl, 1, "65000.00", t0);

    ctl.switch_instrument(Instrument::Eth, t0);
    ctl.handle_transport_event(TransportEvent::opened(ConnectionId(2)), t0);
    let first = tick(&mut ctl, 2, "3500.00", t0);
    assert!(thresholds(&first).is_empty());

    // Moves within ETH are judged against ETH's own history
    let later = tick(&mut ctl, 2, "3510.00", t0.advance(Duration::from_secs(1)));
    assert!(thresholds(&later).is_empty());
}

#[test]
fn test_reconnect_after_drop() {
    let mut ctl = controller();
    let t0 = Moment::now();
    ctl.start();
    ctl.handle_transport_event(TransportEvent::opened(ConnectionId(1)), t0);
    tick(&mut ctl, 1, "65000.00", t0);

    let events = ctl.handle_transport_event(TransportEvent::closed(ConnectionId(1), None), t0);
    assert_eq!(
        events,
        vec![
            FeedEvent::StatusChanged {
                status: ConnectionStatus::Disconnected
            },
            FeedEvent::ReconnectScheduled {
                attempt: 1,
                delay_ms: 3600
            },
        ]
    );
    // Last known price stays on screen while disconnected
    assert_eq!(ctl.display().current_price, Some(dec!(65000.00)));

    assert!(ctl
        .poll_timers(t0.advance(Duration::from_millis(3599)))
        .is_empty());
    let events = ctl.poll_timers(t0.advance(Duration::from_millis(3600)));
    assert_eq!(
        events,
        vec![FeedEvent::StatusChanged {
            status: ConnectionStatus::Connecting
        }]
    );
    assert_eq!(ctl.current_connection(), Some(ConnectionId(2)));
    assert_eq!(ctl.supervisor().transport().opened.len(), 2);

    // A successful open resets the retry counter
    ctl.handle_transport_event(TransportEvent::opened(ConnectionId(2)), t0);
    assert_eq!(ctl.supervisor().attempts(Instrument::Btc), 0);
}

#[test]
fn test_gives_up_after_max_attempts() {
    let mut ctl = controller();
    let mut now = Moment::now();
    ctl.start();

    let expected_delays = [3600, 6480, 11664, 20000, 20000];
    for (i, expected) in expected_delays.iter().enumerate() {
        let id = ctl.current_connection().unwrap();
        let events = ctl.handle_transport_event(TransportEvent::error(id, "refused"), now);
        assert!(
            events.contains(&FeedEvent::ReconnectScheduled {
                attempt: i as u32 + 1,
                delay_ms: *expected
            }),
            "attempt {} got {events:?}",
            i + 1
        );
        now = now.advance(Duration::from_millis(*expected));
        ctl.poll_timers(now);
    }

    let id = ctl.current_connection().unwrap();
    let events = ctl.handle_transport_event(TransportEvent::error(id, "refused"), now);
    assert!(events.contains(&FeedEvent::GaveUp { attempts: 5 }));
    assert_eq!(ctl.display().connection_status, ConnectionStatus::Disconnected);
    assert!(ctl.next_deadline().is_none());

    // An explicit switch, even to the same instrument, starts over
    ctl.switch_instrument(Instrument::Btc, now);
    assert_eq!(ctl.supervisor().attempts(Instrument::Btc), 0);
    assert_eq!(ctl.display().connection_status, ConnectionStatus::Connecting);
}

#[test]
fn test_switch_guard_clears_switching() {
    let mut ctl = controller();
    let t0 = Moment::now();
    ctl.start();
    ctl.switch_instrument(Instrument::Sol, t0);
    assert!(ctl.display().switching);

    ctl.poll_timers(t0.advance(Duration::from_millis(1999)));
    assert!(ctl.is_switching());

    ctl.poll_timers(t0.advance(Duration::from_millis(2000)));
    assert!(!ctl.is_switching());
    assert!(!ctl.display().switching);
    assert!(ctl.display().is_loading());
}

#[test]
fn test_stale_open_and_close_ignored() {
    let mut ctl = controller();
    let t0 = Moment::now();
    ctl.start();
    ctl.switch_instrument(Instrument::Eth, t0);

    let opened = ctl.handle_transport_event(TransportEvent::opened(ConnectionId(1)), t0);
    assert!(opened.is_empty());
    assert_eq!(ctl.display().connection_status, ConnectionStatus::Connecting);

    let closed = ctl.handle_transport_event(TransportEvent::closed(ConnectionId(1), None), t0);
    assert!(closed.is_empty());
    assert!(ctl.supervisor().pending_reconnect().is_none());
}

#[test]
fn test_switch_cancels_pending_reconnect() {
    let mut ctl = controller();
    let t0 = Moment::now();
    ctl.start();
    ctl.handle_transport_event(TransportEvent::error(ConnectionId(1), "reset"), t0);
    assert!(ctl.supervisor().pending_reconnect().is_some());

    ctl.switch_instrument(Instrument::Sol, t0);
    assert!(ctl.supervisor().pending_reconnect().is_none());

    // The old timer's deadline passes without opening anything new
    ctl.poll_timers(t0.advance(Duration::from_secs(10)));
    assert_eq!(ctl.current_connection(), Some(ConnectionId(2)));
    assert_eq!(
        ctl.supervisor().transport().opened[1].1,
        "wss://stream.binance.com:9443/ws/solusdt@ticker"
    );
}

#[test]
fn test_switch_to_unsupported_symbol() {
    let mut ctl = controller();
    ctl.start();
    let err = ctl.switch_to_symbol("DOGE", Moment::now()).unwrap_err();
    assert!(err.to_string().contains("\"DOGE\""));
    assert_eq!(ctl.supervisor().transport().opened.len(), 1);
}
