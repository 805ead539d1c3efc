//! Integration tests for the feed service against a local WebSocket server

use futures_util::{SinkExt, StreamExt};
use live_ticker::config::Config;
use live_ticker::controller::{FeedEvent, FeedService};
use live_ticker::display::DisplayState;
use live_ticker::feed::Instrument;
use live_ticker::supervisor::ConnectionStatus;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;

/// Serve every connection the given frames; optionally hang up afterwards
async fn serve(frames: Vec<&'static str>, hang_up: bool) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}/ws", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let frames = frames.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await else {
                    return;
                };
                for frame in frames {
                    if ws.send(Message::Text(frame.to_string())).await.is_err() {
                        return;
                    }
                }
                if hang_up {
                    let _ = ws.close(None).await;
                }
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    (endpoint, accepted)
}

fn config_for(endpoint: String) -> Config {
    let mut config = Config::default();
    config.feed.endpoint = endpoint;
    config.backoff.base_delay_ms = 20;
    config.backoff.max_delay_ms = 100;
    config
}

async fn wait_for<F>(rx: &mut watch::Receiver<DisplayState>, mut pred: F) -> DisplayState
where
    F: FnMut(&DisplayState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if pred(&rx.borrow_and_update()) {
                return rx.borrow().clone();
            }
            rx.changed().await.expect("feed stopped");
        }
    })
    .await
    .expect("Test timed out")
}

#[tokio::test]
async fn test_streams_ticks_into_display() {
    let (endpoint, _) = serve(
        vec![
            r#"{"c":"65000.00","v":"100"}"#,
            r#"{"ping":true}"#,
            r#"{"c":"65010.50","v":"101"}"#,
        ],
        false,
    )
    .await;

    let handle = FeedService::spawn(&config_for(endpoint));
    let mut display = handle.watch_display();

    let state = wait_for(&mut display, |s| s.current_price == Some(dec!(65010.50))).await;
    assert_eq!(state.previous_price, Some(dec!(65000.00)));
    assert_eq!(state.connection_status, ConnectionStatus::Connected);
    assert_eq!(state.segments.middle, "010");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reconnects_after_server_hangs_up() {
    let (endpoint, accepted) = serve(vec![r#"{"c":"150.25","v":"7"}"#], true).await;

    let handle = FeedService::spawn(&config_for(endpoint));
    let mut events = handle.subscribe();

    let attempt = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(FeedEvent::ReconnectScheduled { attempt, .. }) = events.recv().await {
                return attempt;
            }
        }
    })
    .await
    .expect("Test timed out");
    assert_eq!(attempt, 1);

    tokio::time::timeout(Duration::from_secs(5), async {
        while accepted.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Test timed out");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_switch_through_handle() {
    let (endpoint, accepted) = serve(vec![r#"{"c":"3500.00","v":"1"}"#], false).await;

    let handle = FeedService::spawn(&config_for(endpoint));
    let mut display = handle.watch_display();
    wait_for(&mut display, |s| s.current_price.is_some()).await;

    assert!(handle.switch_instrument("ada").await.is_err());
    assert_eq!(handle.switch_instrument("sol").await.unwrap(), Instrument::Sol);

    let state = wait_for(&mut display, |s| {
        s.instrument == Instrument::Sol && s.current_price.is_some()
    })
    .await;
    assert!(!state.switching);
    assert_eq!(accepted.load(Ordering::SeqCst), 2);

    handle.shutdown().await.unwrap();
}
