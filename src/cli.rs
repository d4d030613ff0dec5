use crate::analysis::Lookback;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stockcharts")]
#[command(about = "Cache daily stock prices and chart them in the terminal", long_about = None)]
pub struct Cli {
    /// Config file (default: ./.stockcharts.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download daily history and save it to the CSV cache
    Fetch {
        /// Symbols to fetch (default: stocks from the config)
        symbols: Vec<String>,
        /// Number of bars to request
        #[arg(long)]
        outputsize: Option<u32>,
    },
    /// Print the current price of each symbol
    Quote {
        /// Symbols to quote (default: stocks from the config)
        symbols: Vec<String>,
    },
    /// Candlestick chart with Fibonacci levels and moving averages
    Fib {
        symbol: Option<String>,
        /// Window for this run only (default: all); the saved lookback is kept
        #[arg(short, long, value_enum)]
        lookback: Option<Lookback>,
    },
    /// Liquidity heat map of volume by price over time
    Heat {
        symbol: Option<String>,
        /// Window for this run only (default: 6m); the saved lookback is kept
        #[arg(short, long, value_enum)]
        lookback: Option<Lookback>,
        /// Price bin width in dollars for this run only, clamped to 0.01..=1000
        #[arg(short, long)]
        bin_width: Option<f64>,
        /// Write the grid as CSV instead of opening the terminal view
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Open the terminal view with the saved settings
    Tui,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_heat_flags() {
        let cli = Cli::try_parse_from([
            "stockcharts", "heat", "amd", "--lookback", "6m", "--bin-width", "0.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Heat {
                symbol,
                lookback,
                bin_width,
                export,
            } => {
                assert_eq!(symbol.as_deref(), Some("amd"));
                assert_eq!(lookback, Some(Lookback::SixMonths));
                assert_eq!(bin_width, Some(0.5));
                assert!(export.is_none());
            }
            _ => panic!("expected heat"),
        }
    }

    #[test]
    fn test_parse_fetch_symbols_and_global_config() {
        let cli = Cli::try_parse_from(["stockcharts", "fetch", "AMD", "CAVA", "--config", "x.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.json")));
        match cli.command {
            Commands::Fetch { symbols, outputsize } => {
                assert_eq!(symbols, vec!["AMD", "CAVA"]);
                assert_eq!(outputsize, None);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_rejects_unknown_lookback() {
        assert!(Cli::try_parse_from(["stockcharts", "fib", "--lookback", "5w"]).is_err());
    }
}
