//! Integration tests for configuration loading

use live_ticker::config::Config;
use live_ticker::feed::{Instrument, StreamKind};
use live_ticker::telemetry::LogFormat;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_partial_file_fills_defaults() {
    let file = write_config(
        r#"
        [feed]
        instrument = "sol"
        stream = "trade"

        [telemetry]
        log_format = "json"
        "#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.feed.instrument, Instrument::Sol);
    assert_eq!(config.feed.stream, StreamKind::Trade);
    assert_eq!(config.telemetry.log_format, LogFormat::Json);
    assert_eq!(config.backoff.policy().max_attempts, Some(5));
    assert_eq!(config.display.highlight(), Duration::from_millis(900));
    assert_eq!(
        config.feed.stream().url_for(Instrument::Sol),
        "wss://stream.binance.com:9443/ws/solusdt@trade"
    );
}

#[test]
fn test_load_rejects_invalid_backoff() {
    let file = write_config(
        r#"
        [backoff]
        growth_rate = 0.5
        "#,
    );

    let err = Config::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("growth_rate"));
}

#[test]
fn test_load_rejects_unknown_instrument() {
    let file = write_config(
        r#"
        [feed]
        instrument = "DOGE"
        "#,
    );

    assert!(Config::load(file.path()).is_err());
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_unbounded_retries() {
    let file = write_config(
        r#"
        [backoff]
        max_attempts = 0
        "#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.backoff.policy().max_attempts, None);
}
