use crate::analysis::{FibLevel, Lookback, MovingAverages};
use crate::data::Bar;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const AXIS_WIDTH: u16 = 13;

const FIB_COLORS: [Color; 5] = [
    Color::Rgb(0xFF, 0x99, 0x00),
    Color::Rgb(0xFF, 0x33, 0x00),
    Color::Rgb(0x99, 0x00, 0xFF),
    Color::Rgb(0x00, 0xAA, 0x00),
    Color::Rgb(0x00, 0x99, 0xFF),
];

/// Candlestick chart with Fibonacci retracements and MA50/MA200 overlays.
#[derive(Debug, Clone)]
pub struct Chart {
    pub bars: Vec<Bar>,
    pub averages: MovingAverages,
    pub fib_levels: Vec<FibLevel>,
    pub symbol: String,
    pub lookback: Lookback,
    pub zoom: usize,
    pub offset: usize,
}

impl Chart {
    pub fn new(symbol: String, lookback: Lookback) -> Self {
        Self {
            bars: Vec::new(),
            averages: MovingAverages::default(),
            fib_levels: Vec::new(),
            symbol,
            lookback,
            zoom: 1,
            offset: 0,
        }
    }

    /// `bars` is the windowed series; `averages` must already be sliced to match it.
    pub fn set_series(&mut self, bars: Vec<Bar>, averages: MovingAverages, fib_levels: Vec<FibLevel>) {
        self.bars = bars;
        self.averages = averages;
        self.fib_levels = fib_levels;
        self.offset = 0;
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 2).min(32);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 2).max(1);
    }

    pub fn pan_left(&mut self) {
        let visible = self.get_visible_count();
        if self.offset + visible < self.bars.len() {
            self.offset += (visible / 4).max(1);
        }
    }

    pub fn pan_right(&mut self) {
        self.offset = self
            .offset
            .saturating_sub((self.get_visible_count() / 4).max(1));
    }

    fn get_visible_count(&self) -> usize {
        (self.bars.len() / self.zoom).max(10)
    }

    /// Bars that fit the given width, newest last, shifted back by `offset`.
    fn visible_range(&self, width: u16) -> (usize, usize) {
        let visible = self.get_visible_count().min((width as usize).max(1));
        let end = self.bars.len().saturating_sub(self.offset);
        (end.saturating_sub(visible), end)
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(4),
                Constraint::Length(3),
            ])
            .split(area);

        let title = format!("{} - {}", self.symbol, self.lookback.description());
        let title_block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        frame.render_widget(title_block, vertical[0]);

        if self.bars.is_empty() {
            let empty = Paragraph::new(Line::from(Span::styled(
                "No bars in this window",
                Style::default().fg(Color::Gray),
            )));
            frame.render_widget(empty, vertical[1]);
            return;
        }

        self.render_candlesticks(frame, vertical[1]);
        self.render_volume(frame, vertical[2]);
        self.render_stats(frame, vertical[3]);
    }

    fn render_candlesticks(&self, frame: &mut Frame, area: Rect) {
        if area.width < 20 || area.height < 5 {
            return;
        }

        let chart_width = area.width.saturating_sub(AXIS_WIDTH);
        let chart_height = area.height.saturating_sub(2);
        let (start_idx, end_idx) = self.visible_range(chart_width);
        let visible = &self.bars[start_idx..end_idx];

        if visible.is_empty() {
            return;
        }

        let (min_price, max_price) = visible
            .iter()
            .fold((f64::MAX, f64::MIN), |(min, max), bar| {
                (min.min(bar.low), max.max(bar.high))
            });

        let price_range = (max_price - min_price).max(0.0001);
        let candle_width = (chart_width as usize / visible.len().max(1)).max(1);

        let inner = Rect {
            x: area.x + AXIS_WIDTH,
            y: area.y + 1,
            width: chart_width,
            height: chart_height,
        };

        let to_y = |price: f64| -> Option<u16> {
            if price < min_price || price > max_price {
                return None;
            }
            Some(inner.y + ((max_price - price) / price_range * (chart_height - 1) as f64) as u16)
        };
        let column_x = |idx: usize| inner.x + (idx * candle_width) as u16 + candle_width as u16 / 2;

        let buf = frame.buffer_mut();

        for (i, level) in self.fib_levels.iter().enumerate() {
            let Some(y) = to_y(level.price) else {
                continue;
            };
            let color = FIB_COLORS[i % FIB_COLORS.len()];
            let glyph = if level.is_anchor() { '─' } else { '╌' };
            for x in inner.x..inner.x + inner.width {
                buf[(x, y)].set_char(glyph).set_fg(color);
            }

            let label = format!("{} ({:.2})", level.label, level.price);
            let label_x = (inner.x + inner.width).saturating_sub(label.chars().count() as u16);
            for (j, ch) in label.chars().enumerate() {
                let x = label_x + j as u16;
                if x >= inner.x && x < inner.x + inner.width {
                    buf[(x, y)].set_char(ch).set_fg(color);
                }
            }
        }

        let mut overlays = vec![(&self.averages.fast, Color::Green)];
        if self.averages.has_slow() {
            overlays.push((&self.averages.slow, Color::Blue));
        }
        for (series, color) in overlays {
            for idx in 0..visible.len() {
                let value = series.get(start_idx + idx).copied().flatten();
                if let Some(y) = value.and_then(to_y) {
                    let x = column_x(idx);
                    if x < inner.x + inner.width {
                        buf[(x, y)].set_char('•').set_fg(color);
                    }
                }
            }
        }

        for (idx, bar) in visible.iter().enumerate() {
            let x = column_x(idx);
            if x >= inner.x + inner.width {
                break;
            }

            let (Some(high_y), Some(low_y), Some(open_y), Some(close_y)) =
                (to_y(bar.high), to_y(bar.low), to_y(bar.open), to_y(bar.close))
            else {
                continue;
            };

            let color = if bar.is_bullish() {
                Color::Green
            } else {
                Color::Red
            };

            for y in high_y..=low_y {
                buf[(x, y)].set_char('│').set_fg(color);
            }

            let body_top = open_y.min(close_y);
            let body_bottom = open_y.max(close_y);
            for y in body_top..=body_bottom {
                buf[(x, y)].set_char('█').set_fg(color);
            }
        }

        let label_count = 5.min(chart_height as usize / 2);
        for i in 0..=label_count {
            let y = inner.y + ((i as u16) * (chart_height.saturating_sub(1)) / label_count.max(1) as u16);
            let price = max_price - (i as f64 / label_count.max(1) as f64) * price_range;
            let label = format!("{:>11.2}", price);

            for (j, ch) in label.chars().enumerate() {
                let x_pos = area.x + (j as u16);
                if x_pos < area.x + AXIS_WIDTH && y < area.y + area.height {
                    buf[(x_pos, y)].set_char(ch).set_fg(Color::Gray);
                }
            }
        }

        let first = &visible[0];
        let latest = &visible[visible.len() - 1];
        let change = latest.close - first.open;
        let change_pct = if first.open > 0.0 {
            (change / first.open) * 100.0
        } else {
            0.0
        };

        let change_color = if change >= 0.0 {
            Color::Green
        } else {
            Color::Red
        };

        let price_text = Line::from(vec![
            Span::styled("Price: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:.2}", latest.close),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                format!("{:+.2} ({:+.2}%)", change, change_pct),
                Style::default().fg(change_color),
            ),
            Span::raw("  "),
            Span::styled(
                format!("{} → {}", first.date, latest.date),
                Style::default().fg(Color::DarkGray),
            ),
        ]);

        let price_para = Paragraph::new(price_text);
        frame.render_widget(
            price_para,
            Rect {
                x: area.x + AXIS_WIDTH,
                y: area.y + area.height - 1,
                width: chart_width,
                height: 1,
            },
        );
    }

    fn render_volume(&self, frame: &mut Frame, area: Rect) {
        if area.width < 20 || area.height < 2 {
            return;
        }

        let chart_width = area.width.saturating_sub(AXIS_WIDTH);
        let chart_height = area.height.saturating_sub(1);
        let (start_idx, end_idx) = self.visible_range(chart_width);
        let visible = &self.bars[start_idx..end_idx];

        let max_volume = visible.iter().fold(0.0f64, |a, b| a.max(b.volume));
        if visible.is_empty() || max_volume == 0.0 {
            return;
        }

        let candle_width = (chart_width as usize / visible.len().max(1)).max(1);
        let inner = Rect {
            x: area.x + AXIS_WIDTH,
            y: area.y,
            width: chart_width,
            height: chart_height,
        };

        let buf = frame.buffer_mut();
        for (idx, bar) in visible.iter().enumerate() {
            let x = inner.x + (idx * candle_width) as u16 + candle_width as u16 / 2;
            if x >= inner.x + inner.width {
                break;
            }
            let height = ((bar.volume / max_volume) * chart_height as f64) as u16;
            let color = if bar.is_bullish() {
                Color::Green
            } else {
                Color::Red
            };

            for y in (inner.y + inner.height - height)..inner.y + inner.height {
                buf[(x, y)].set_char('▊').set_fg(color);
            }
        }

        let label_text = Line::from(Span::styled(
            format!("Vol: {}", compact(max_volume)),
            Style::default().fg(Color::Gray),
        ));
        frame.render_widget(
            Paragraph::new(label_text),
            Rect {
                x: area.x,
                y: area.y,
                width: AXIS_WIDTH - 1,
                height: 1,
            },
        );
    }

    fn render_stats(&self, frame: &mut Frame, area: Rect) {
        let Some(latest) = self.bars.last() else {
            return;
        };

        let change = latest.close - latest.open;
        let change_pct = if latest.open > 0.0 {
            (change / latest.open) * 100.0
        } else {
            0.0
        };
        let change_color = if change >= 0.0 {
            Color::Green
        } else {
            Color::Red
        };

        let ma_label = |series: &[Option<f64>]| match series.last().copied().flatten() {
            Some(v) => format!("{:.2}  ", v),
            None => "n/a  ".to_string(),
        };

        let stats_text = Line::from(vec![
            Span::styled("O: ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{:.2}  ", latest.open), Style::default().fg(Color::White)),
            Span::styled("H: ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{:.2}  ", latest.high), Style::default().fg(Color::Green)),
            Span::styled("L: ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{:.2}  ", latest.low), Style::default().fg(Color::Red)),
            Span::styled("C: ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{:.2}  ", latest.close), Style::default().fg(Color::White)),
            Span::styled("Vol: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}  ", compact(latest.volume)),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled("MA50: ", Style::default().fg(Color::Gray)),
            Span::styled(ma_label(&self.averages.fast), Style::default().fg(Color::Green)),
            Span::styled("MA200: ", Style::default().fg(Color::Gray)),
            Span::styled(ma_label(&self.averages.slow), Style::default().fg(Color::Blue)),
            Span::styled("Chg: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:+.2}%", change_pct),
                Style::default().fg(change_color).add_modifier(Modifier::BOLD),
            ),
        ]);

        let stats_block = Block::default()
            .title(latest.date.to_string())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue));
        frame.render_widget(Paragraph::new(stats_text).block(stats_block), area);
    }
}

/// 1234567.0 -> "1.23M"
pub fn compact(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else {
        format!("{:.0}", value)
    }
}
