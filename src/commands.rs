use crate::analysis::{fibonacci, heatmap, window, Lookback, VolumeGrid};
use crate::app::App;
use crate::config::{clamp_bin_width, AppConfig};
use crate::data::{store, TwelveDataClient};
use crate::error::{AppError, Result};
use crate::ui::View;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{error, info};

fn symbols_or_default(config: &AppConfig, symbols: Vec<String>) -> Vec<String> {
    if symbols.is_empty() {
        config.stocks.clone()
    } else {
        symbols.iter().map(|s| s.trim().to_uppercase()).collect()
    }
}

/// Makes `symbol` current, adding it to the watchlist when it is new.
pub fn select_symbol(config: &mut AppConfig, symbol: Option<String>) {
    let Some(symbol) = symbol.map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty()) else {
        return;
    };
    let idx = match config.stocks.iter().position(|s| *s == symbol) {
        Some(idx) => idx,
        None => {
            config.stocks.push(symbol.clone());
            config.stocks.len() - 1
        }
    };
    config.selected_symbol = idx;
    config.symbol = symbol;
}

pub async fn fetch(config: &AppConfig, symbols: Vec<String>, outputsize: Option<u32>) -> Result<()> {
    let client = TwelveDataClient::new(config.resolve_api_key()?);
    let outputsize = outputsize.unwrap_or(config.outputsize);
    let symbols = symbols_or_default(config, symbols);
    fetch_all(&client, config, &symbols, outputsize).await;
    Ok(())
}

/// Saves each symbol's series to the cache. A failing symbol is logged and
/// skipped; returns how many failed.
pub async fn fetch_all(
    client: &TwelveDataClient,
    config: &AppConfig,
    symbols: &[String],
    outputsize: u32,
) -> usize {
    let mut failed = 0;

    for symbol in symbols {
        info!("Fetching data for {}...", symbol);
        let result = async {
            let bars = client
                .time_series(symbol, &config.interval, outputsize, &config.timezone)
                .await?;
            let path = store::cache_path(&config.data_dir, symbol);
            let count = store::save_bars(&path, &bars)?;
            Ok::<_, AppError>((count, path))
        }
        .await;

        match result {
            Ok((count, path)) => println!("saved {} bars for {} to {}", count, symbol, path.display()),
            Err(e) => {
                failed += 1;
                error!(symbol = %symbol, error = %e, "fetch failed");
            }
        }
    }

    info!(total = symbols.len(), failed, "fetch finished");
    failed
}

pub async fn quote(config: &AppConfig, symbols: Vec<String>) -> Result<()> {
    let client = TwelveDataClient::new(config.resolve_api_key()?);

    for symbol in symbols_or_default(config, symbols) {
        match client.price(&symbol).await {
            Ok(price) => println!("{:<6} {:>10.2}", symbol, price),
            Err(e) => error!(symbol = %symbol, error = %e, "quote failed"),
        }
    }
    Ok(())
}

pub fn print_fib_levels(config: &AppConfig, lookback: Lookback) -> Result<()> {
    let bars = store::load_bars(&store::cache_path(&config.data_dir, &config.symbol))?;
    let windowed = window::apply(&bars, lookback, Local::now().date_naive());
    let Some(levels) = fibonacci::levels(windowed) else {
        return Err(AppError::InvalidInput(format!(
            "{} has no bars in the {} window",
            config.symbol,
            lookback.label()
        )));
    };

    println!("Fibonacci Levels ({} - {}):", config.symbol, lookback.description());
    for level in levels {
        println!("{}: {:.2}", level.label, level.price);
    }
    Ok(())
}

pub fn fib(
    mut config: AppConfig,
    config_path: PathBuf,
    symbol: Option<String>,
    lookback: Option<Lookback>,
) -> Result<()> {
    select_symbol(&mut config, symbol);
    let lookback = lookback.unwrap_or(Lookback::All);
    print_fib_levels(&config, lookback)?;
    App::new(config, config_path, View::Fibonacci)
        .with_overrides(Some(lookback), None)
        .run()
}

pub fn heat(
    mut config: AppConfig,
    config_path: PathBuf,
    symbol: Option<String>,
    lookback: Option<Lookback>,
    bin_width: Option<f64>,
    export: Option<PathBuf>,
) -> Result<()> {
    select_symbol(&mut config, symbol);
    let lookback = lookback.unwrap_or(Lookback::SixMonths);
    let bin_width = bin_width.map(clamp_bin_width);

    match export {
        Some(path) => {
            let bars = store::load_bars(&store::cache_path(&config.data_dir, &config.symbol))?;
            let windowed = window::apply(&bars, lookback, Local::now().date_naive());
            let grid = heatmap::build(windowed, bin_width.unwrap_or(config.bin_width))?;
            export_grid(&path, &grid)?;
            println!(
                "wrote {} price bins x {} dates to {}",
                grid.rows(),
                grid.cols(),
                path.display()
            );
            Ok(())
        }
        None => App::new(config, config_path, View::HeatMap)
            .with_overrides(Some(lookback), bin_width)
            .run(),
    }
}

pub fn tui(config: AppConfig, config_path: PathBuf) -> Result<()> {
    App::new(config, config_path, View::Fibonacci).run()
}

/// One row per price bin (ascending), one column per date.
pub fn export_grid(path: &Path, grid: &VolumeGrid) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["price".to_string()];
    header.extend(grid.dates().iter().map(|d| d.format("%Y-%m-%d").to_string()));
    writer.write_record(&header)?;

    for (row, price) in grid.price_bins().iter().enumerate() {
        let mut record = vec![price.to_string()];
        record.extend(grid.row(row).iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
