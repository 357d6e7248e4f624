use clap::Parser;
use updown_bot::cli::{Cli, Commands};
use updown_bot::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    updown_bot::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting trading loop");
            args.execute(config).await?;
        }
        Commands::Status => {
            println!("updown-bot status");
            println!("  Mode: {:?}", config.execution.mode);
            println!("  Status: Not running");
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Strategies: {:?}", config.engine.strategies);
            println!(
                "  Cadences: world={}ms book={}ms quote={}ms",
                config.engine.world_refresh_ms,
                config.engine.book_refresh_ms,
                config.engine.quote_refresh_ms
            );
            println!("  Execution: {:?}", config.execution.mode);
            println!(
                "  Capital: arb={} lag={} certainty={}",
                config.arbitrage.capital, config.lag.capital, config.certainty.capital
            );
        }
    }

    Ok(())
}
