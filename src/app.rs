use crate::analysis::{fibonacci, heatmap, window, Lookback, MovingAverages};
use crate::config::{clamp_bin_width, save_config, AppConfig};
use crate::data::{store, Bar};
use crate::error::Result;
use crate::ui::{Chart, HeatMap, LayoutManager, LookbackSelector, View};
use chrono::{Local, NaiveDate};
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Saved values that a command-line flag replaced for this run.
/// They are written back unchanged when settings are saved.
#[derive(Debug, Clone, Copy, Default)]
struct Shadowed {
    lookback: Option<Lookback>,
    bin_width: Option<f64>,
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen, Show)
}

/// Runs the restore closure on drop, so an early `?` or a panic in the
/// event loop still leaves the terminal usable.
struct TerminalGuard<F: FnMut() -> io::Result<()>> {
    restore: Option<F>,
}

impl<F: FnMut() -> io::Result<()>> TerminalGuard<F> {
    fn new(restore: F) -> Self {
        Self {
            restore: Some(restore),
        }
    }
}

impl<F: FnMut() -> io::Result<()>> Drop for TerminalGuard<F> {
    fn drop(&mut self) {
        if let Some(mut restore) = self.restore.take() {
            if let Err(e) = restore() {
                warn!(error = %e, "failed to restore terminal");
            }
        }
    }
}

pub struct App {
    pub config: AppConfig,
    config_path: PathBuf,
    pub layout: LayoutManager,
    pub chart: Chart,
    pub heatmap: HeatMap,
    pub view: View,
    history: Vec<Bar>,
    today: NaiveDate,
    shadowed: Shadowed,
}

impl App {
    pub fn new(config: AppConfig, config_path: PathBuf, view: View) -> Self {
        let mut chart = Chart::new(config.symbol.clone(), config.lookback);
        chart.zoom = config.zoom;
        Self {
            layout: LayoutManager::new(config.stocks.clone(), config.selected_symbol, config.lookback),
            heatmap: HeatMap::new(config.symbol.clone(), config.lookback),
            chart,
            view,
            history: Vec::new(),
            today: Local::now().date_naive(),
            shadowed: Shadowed::default(),
            config,
            config_path,
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Applies command-line values for this session only.
    pub fn with_overrides(mut self, lookback: Option<Lookback>, bin_width: Option<f64>) -> Self {
        if let Some(lookback) = lookback {
            self.shadowed.lookback = Some(self.config.lookback);
            self.config.lookback = lookback;
            self.layout.lookback = LookbackSelector::from_lookback(lookback);
            self.chart.lookback = lookback;
            self.heatmap.lookback = lookback;
        }
        if let Some(bin_width) = bin_width {
            self.shadowed.bin_width = Some(self.config.bin_width);
            self.config.bin_width = clamp_bin_width(bin_width);
        }
        self
    }

    pub fn load_symbol(&mut self, symbol: &str) {
        let path = store::cache_path(&self.config.data_dir, symbol);
        self.chart.symbol = symbol.to_string();
        self.heatmap.symbol = symbol.to_string();
        self.config.symbol = symbol.to_string();

        match store::load_bars(&path) {
            Ok(bars) => {
                info!(symbol, bars = bars.len(), "loaded cached series");
                if let Some(last) = bars.last() {
                    let prev_close = bars
                        .len()
                        .checked_sub(2)
                        .map(|i| bars[i].close)
                        .unwrap_or(last.open);
                    let change_pct = if prev_close > 0.0 {
                        (last.close - prev_close) / prev_close * 100.0
                    } else {
                        0.0
                    };
                    self.layout
                        .last_closes
                        .insert(symbol.to_string(), (last.close, change_pct));
                }
                self.layout
                    .statusbar
                    .info(format!("{}: {} bars from {}", symbol, bars.len(), path.display()));
                self.history = bars;
            }
            Err(e) => {
                warn!(symbol, error = %e, "could not load cached series");
                self.layout.statusbar.error(e.to_string());
                self.history.clear();
            }
        }

        self.recompute();
    }

    /// Re-derives the windowed chart series and the heat-map grid.
    pub fn recompute(&mut self) {
        let lookback = self.layout.lookback.current();
        let start = window::window_start(&self.history, lookback, self.today);
        let windowed = &self.history[start..];

        let averages = MovingAverages::from_history(&self.history).tail(start);
        let levels = fibonacci::levels(windowed).unwrap_or_default();
        self.chart.lookback = lookback;
        self.chart.set_series(windowed.to_vec(), averages, levels);

        self.heatmap.lookback = lookback;
        self.heatmap.grid = if windowed.is_empty() {
            None
        } else {
            match heatmap::build(windowed, self.config.bin_width) {
                Ok(grid) => Some(grid),
                Err(e) => {
                    self.layout.statusbar.error(e.to_string());
                    None
                }
            }
        };
        self.config.lookback = lookback;
    }

    fn set_bin_width(&mut self, bin_width: f64) {
        let bin_width = clamp_bin_width(bin_width);
        if bin_width != self.config.bin_width {
            self.config.bin_width = bin_width;
            self.layout.statusbar.info(format!("bin width ${}", bin_width));
            self.recompute();
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Control {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Control::Quit,
            KeyCode::Up => self.layout.select_prev(),
            KeyCode::Down => self.layout.select_next(),
            KeyCode::Enter => {
                if let Some(symbol) = self.layout.selected().cloned() {
                    self.config.selected_symbol = self.layout.selected_symbol;
                    self.load_symbol(&symbol);
                }
            }
            KeyCode::Tab => self.view = self.view.toggle(),
            KeyCode::Char(']') => {
                self.layout.lookback.select_next();
                self.recompute();
            }
            KeyCode::Char('[') => {
                self.layout.lookback.select_prev();
                self.recompute();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.chart.zoom_in(),
            KeyCode::Char('-') => self.chart.zoom_out(),
            KeyCode::Left => self.chart.pan_left(),
            KeyCode::Right => self.chart.pan_right(),
            KeyCode::Char('<') => self.set_bin_width(self.config.bin_width / 2.0),
            KeyCode::Char('>') => self.set_bin_width(self.config.bin_width * 2.0),
            _ => {}
        }
        Control::Continue
    }

    fn settings_to_save(&self) -> AppConfig {
        let mut saved = self.config.clone();
        saved.zoom = self.chart.zoom;
        if let Some(lookback) = self.shadowed.lookback {
            saved.lookback = lookback;
        }
        if let Some(bin_width) = self.shadowed.bin_width {
            saved.bin_width = bin_width;
        }
        saved
    }

    fn save_settings(&self) {
        if let Err(e) = save_config(&self.config_path, &self.settings_to_save()) {
            warn!(path = %self.config_path.display(), error = %e, "failed to save config");
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|frame| {
                let area = frame.area();
                self.layout
                    .render(frame, self.view, &self.chart, &self.heatmap, area)
            })?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key.code) == Control::Quit {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Takes over the terminal until the user quits.
    pub fn run(mut self) -> Result<()> {
        let symbol = self.config.symbol.clone();
        self.load_symbol(&symbol);

        enable_raw_mode()?;
        let guard = TerminalGuard::new(restore_terminal);
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        let result = self.event_loop(&mut terminal);
        drop(guard);

        self.save_settings();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config, MIN_BIN_WIDTH};
    use std::cell::Cell;

    fn write_series(dir: &std::path::Path, symbol: &str) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<Bar> = (0..120)
            .map(|i| {
                let base = 50.0 + (i % 10) as f64;
                Bar {
                    date: start + chrono::Days::new(i),
                    open: base,
                    high: base + 3.0,
                    low: base - 1.5,
                    close: base + 1.0,
                    volume: 10_000.0,
                }
            })
            .collect();
        store::save_bars(&store::cache_path(dir, symbol), &bars).unwrap();
    }

    fn app_in(dir: &std::path::Path) -> App {
        let config = AppConfig {
            stocks: vec!["AMD".to_string(), "CAVA".to_string()],
            symbol: "AMD".to_string(),
            data_dir: dir.to_path_buf(),
            lookback: Lookback::OneMonth,
            ..AppConfig::default()
        };
        App::new(config, dir.join(".stockcharts.json"), View::HeatMap)
            .with_today(NaiveDate::from_ymd_opt(2024, 4, 29).unwrap())
    }

    #[test]
    fn test_load_symbol_builds_window_and_grid() {
        let dir = tempfile::tempdir().unwrap();
        write_series(dir.path(), "AMD");
        let mut app = app_in(dir.path());
        app.load_symbol("AMD");

        // 2024-03-29 is the cutoff; the series ends 2024-04-29
        assert_eq!(app.chart.bars.len(), 31);
        assert_eq!(app.chart.fib_levels.len(), 9);
        let grid = app.heatmap.grid.as_ref().unwrap();
        assert_eq!(grid.cols(), 31);
        assert!(app.layout.last_closes.contains_key("AMD"));
        assert!(!app.layout.statusbar.is_error);
    }

    #[test]
    fn test_lookback_and_bin_width_keys_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        write_series(dir.path(), "AMD");
        let mut app = app_in(dir.path());
        app.load_symbol("AMD");
        let rows_at_one = app.heatmap.grid.as_ref().unwrap().rows();

        app.handle_key(KeyCode::Char('<'));
        assert_eq!(app.config.bin_width, 0.5);
        assert!(app.heatmap.grid.as_ref().unwrap().rows() > rows_at_one);

        app.handle_key(KeyCode::Char(']'));
        assert_eq!(app.config.lookback, Lookback::ThreeMonths);
        assert_eq!(app.chart.bars.len(), app.heatmap.grid.as_ref().unwrap().cols());
    }

    #[test]
    fn test_missing_cache_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.chart.symbol, "CAVA");
        assert!(app.layout.statusbar.is_error);
        assert!(app.chart.bars.is_empty());
        assert!(app.heatmap.grid.is_none());
    }

    #[test]
    fn test_tab_and_quit() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        assert_eq!(app.handle_key(KeyCode::Tab), Control::Continue);
        assert_eq!(app.view, View::Fibonacci);
        assert_eq!(app.handle_key(KeyCode::Char('q')), Control::Quit);
    }

    #[test]
    fn test_overrides_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        write_series(dir.path(), "AMD");
        let mut app = app_in(dir.path()).with_overrides(Some(Lookback::All), Some(1e-9));
        assert_eq!(app.layout.lookback.current(), Lookback::All);
        assert_eq!(app.config.bin_width, MIN_BIN_WIDTH);

        app.load_symbol("AMD");
        assert_eq!(app.chart.bars.len(), 120);
        app.chart.zoom_in();
        app.save_settings();

        let saved = load_config(&dir.path().join(".stockcharts.json"));
        assert_eq!(saved.lookback, Lookback::OneMonth);
        assert_eq!(saved.bin_width, 1.0);
        assert_eq!(saved.zoom, app.chart.zoom);
    }

    #[test]
    fn test_without_overrides_lookback_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        app.handle_key(KeyCode::Char(']'));
        assert_eq!(app.settings_to_save().lookback, Lookback::ThreeMonths);
    }

    #[test]
    fn test_terminal_guard_restores_on_panic() {
        let restored = Cell::new(0);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = TerminalGuard::new(|| {
                restored.set(restored.get() + 1);
                Ok(())
            });
            panic!("event loop failed");
        }));
        assert!(outcome.is_err());
        assert_eq!(restored.get(), 1);

        let guard = TerminalGuard::new(|| {
            restored.set(restored.get() + 1);
            Ok(())
        });
        drop(guard);
        assert_eq!(restored.get(), 2);
    }
}
