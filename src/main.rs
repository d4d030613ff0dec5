mod analysis;
mod app;
mod cli;
mod commands;
mod config;
mod data;
mod error;
mod ui;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "stockcharts.log";

/// The terminal views own the screen, so they log to a file instead of stderr.
fn init_tracing(interactive: bool) -> color_eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if interactive {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(LOG_FILE)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let interactive = match &cli.command {
        Commands::Fib { .. } | Commands::Tui => true,
        Commands::Heat { export, .. } => export.is_none(),
        Commands::Fetch { .. } | Commands::Quote { .. } => false,
    };
    init_tracing(interactive)?;

    let config_path = cli.config.unwrap_or_else(config::config_path);
    let cfg = config::load_config(&config_path);

    match cli.command {
        Commands::Fetch {
            symbols,
            outputsize,
        } => commands::fetch(&cfg, symbols, outputsize).await?,
        Commands::Quote { symbols } => commands::quote(&cfg, symbols).await?,
        Commands::Fib { symbol, lookback } => commands::fib(cfg, config_path, symbol, lookback)?,
        Commands::Heat {
            symbol,
            lookback,
            bin_width,
            export,
        } => commands::heat(cfg, config_path, symbol, lookback, bin_width, export)?,
        Commands::Tui => commands::tui(cfg, config_path)?,
    }

    Ok(())
}
