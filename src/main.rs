use clap::Parser;
use live_ticker::cli::{Cli, Commands};
use live_ticker::config::Config;
use live_ticker::feed::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    let _telemetry = live_ticker::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Watch(args) => {
            args.execute(&config).await?;
        }
        Commands::Split(args) => {
            args.execute()?;
        }
        Commands::Instruments => {
            let stream = config.feed.stream();
            for instrument in Instrument::ALL {
                println!("{:<4} {}", instrument, stream.url_for(instrument));
            }
        }
        Commands::Config => {
            println!("Current configuration ({}):", cli.config);
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
