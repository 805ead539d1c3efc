//! CLI interface for live-ticker
//!
//! Provides subcommands for:
//! - `watch`: Stream a live price display
//! - `split`: Show how a price is split into display segments
//! - `instruments`: List supported instruments and their streams
//! - `config`: Show effective configuration

mod split;
mod watch;

pub use split::SplitArgs;
pub use watch::{render_line, Renderer, WatchArgs};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "live-ticker")]
#[command(about = "Live crypto price ticker with segmented display and instrument switching")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream a live price display
    Watch(WatchArgs),
    /// Split a price into display segments
    Split(SplitArgs),
    /// List supported instruments
    Instruments,
    /// Show configuration
    Config,
}
