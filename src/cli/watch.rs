//! Watch command implementation

use crate::config::Config;
use crate::controller::{FeedEvent, FeedService};
use crate::display::{
    DisplayState, Highlight, MoveAlert, MoveDirection, SegmentHighlights, ThresholdAlert,
    ThresholdTrigger,
};
use clap::Args;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;

/// How long a headline stays next to the price
const HEADLINE_DURATION: Duration = Duration::from_millis(1_200);

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Instrument to start with (overrides feed.instrument)
    #[arg(short, long)]
    pub instrument: Option<String>,

    /// Emit display state and events as JSON lines
    #[arg(long)]
    pub json: bool,
}

impl WatchArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut config = config.clone();
        if let Some(symbol) = &self.instrument {
            config.feed.instrument = symbol.parse()?;
        }

        tracing::info!(instrument = %config.feed.instrument, "Starting live ticker");
        let handle = FeedService::spawn(&config);
        let mut display = handle.watch_display();
        let mut events = handle.subscribe();
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        let mut renderer = Renderer::new(config.display.highlight());
        let mut stdin_open = true;

        if !self.json {
            println!("Type an instrument ({}) to switch, q to quit", supported_list());
        }

        loop {
            let expiry = renderer.next_expiry();

            tokio::select! {
                changed = display.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    // Text mode redraws on events, which follow every state change
                    let state = display.borrow_and_update().clone();
                    if self.json {
                        println!("{}", serde_json::to_string(&state)?);
                    }
                }

                event = events.recv() => match event {
                    Ok(event) => {
                        renderer.on_event(&event, Instant::now());
                        if self.json {
                            println!("{}", serde_json::to_string(&event)?);
                        } else {
                            self.announce(&event);
                            println!("{}", renderer.render(&display.borrow()));
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Renderer fell behind feed events");
                    }
                    Err(RecvError::Closed) => break,
                },

                line = stdin.next_line(), if stdin_open => match line? {
                    Some(line) => {
                        let input = line.trim();
                        if input.is_empty() {
                            continue;
                        }
                        if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
                            break;
                        }
                        if let Err(e) = handle.switch_instrument(input).await {
                            eprintln!("{e} (supported: {})", supported_list());
                        }
                    }
                    // Keep streaming until Ctrl-C
                    None => stdin_open = false,
                },

                _ = wait_for(expiry) => {
                    if renderer.decay(Instant::now()) && !self.json {
                        println!("{}", renderer.render(&display.borrow()));
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl-C");
                    break;
                }
            }
        }

        handle.shutdown().await?;
        Ok(())
    }

    fn announce(&self, event: &FeedEvent) {
        match event {
            FeedEvent::SwitchStarted { instrument } => println!("Switching to {instrument}..."),
            FeedEvent::ReconnectScheduled { attempt, delay_ms } => {
                println!("Connection lost, retry {attempt} in {delay_ms}ms")
            }
            FeedEvent::GaveUp { attempts } => {
                println!("Gave up after {attempts} attempts; switch instrument to retry")
            }
            FeedEvent::ThresholdCrossed { alert } => println!("{}", threshold_message(alert)),
            _ => {}
        }
    }
}

fn supported_list() -> String {
    crate::feed::Instrument::ALL
        .iter()
        .map(|i| i.symbol())
        .collect::<Vec<_>>()
        .join(", ")
}

fn threshold_message(alert: &ThresholdAlert) -> String {
    let what = match alert.trigger {
        ThresholdTrigger::TickMove => "tick move",
        ThresholdTrigger::RollingChange => "rolling change",
    };
    let bell = match alert.direction {
        MoveDirection::Up => "\x07",
        MoveDirection::Down => "\x07\x07",
    };
    format!("{bell}Threshold crossed: {what} {:+.2}%", alert.change)
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Terminal renderer state: decaying highlights and the latest headline
#[derive(Debug, Clone)]
pub struct Renderer {
    highlight_for: Duration,
    highlights: SegmentHighlights,
    highlight_until: Option<Instant>,
    headline: Option<(MoveAlert, Instant)>,
}

impl Renderer {
    pub fn new(highlight_for: Duration) -> Self {
        Self {
            highlight_for,
            highlights: SegmentHighlights::default(),
            highlight_until: None,
            headline: None,
        }
    }

    pub fn on_event(&mut self, event: &FeedEvent, now: Instant) {
        match event {
            FeedEvent::TickApplied { highlights } if highlights.any() => {
                self.highlights = *highlights;
                self.highlight_until = Some(now + self.highlight_for);
            }
            FeedEvent::Alert { alert } => {
                self.headline = Some((alert.clone(), now + HEADLINE_DURATION));
            }
            FeedEvent::SwitchStarted { .. } => {
                self.highlights = SegmentHighlights::default();
                self.highlight_until = None;
                self.headline = None;
            }
            _ => {}
        }
    }

    /// Drop expired highlights and headlines; true if anything changed
    pub fn decay(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if self.highlight_until.is_some_and(|until| until <= now) {
            self.highlights = SegmentHighlights::default();
            self.highlight_until = None;
            changed = true;
        }
        if self.headline.as_ref().is_some_and(|(_, until)| *until <= now) {
            self.headline = None;
            changed = true;
        }
        changed
    }

    pub fn next_expiry(&self) -> Option<Instant> {
        let headline = self.headline.as_ref().map(|(_, until)| *until);
        match (self.highlight_until, headline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn highlights(&self) -> SegmentHighlights {
        self.highlights
    }

    pub fn render(&self, state: &DisplayState) -> String {
        let headline = self.headline.as_ref().map(|(alert, _)| alert.headline);
        render_line(state, &self.highlights, headline)
    }
}

/// One status line: instrument, segments, change, volume, connection
pub fn render_line(
    state: &DisplayState,
    highlights: &SegmentHighlights,
    headline: Option<&str>,
) -> String {
    let status = if state.switching {
        "switching".to_string()
    } else {
        state.connection_status.to_string()
    };

    let mut line = if state.is_loading() {
        format!("{:<4} loading...", state.instrument.symbol())
    } else {
        let s = &state.segments;
        let mut price = String::new();
        if !s.is_two_block() {
            price.push_str(&paint(&s.left, highlights.left));
            price.push(' ');
        }
        price.push_str(&paint(&s.middle, highlights.middle));
        price.push_str(&paint(&s.right, highlights.right));
        format!(
            "{:<4} {}  {}  vol {}",
            state.instrument.symbol(),
            price,
            state.formatted_change(),
            state.formatted_volume()
        )
    };

    line.push_str(&format!("  [{status}]"));
    if let Some(headline) = headline {
        line.push_str("  ");
        line.push_str(headline);
    }
    line
}

fn paint(segment: &str, highlight: Highlight) -> String {
    match highlight {
        Highlight::Up => format!("\x1b[32m{segment}\x1b[0m"),
        Highlight::Down => format!("\x1b[31m{segment}\x1b[0m"),
        Highlight::None => segment.to_string(),
    }
}
