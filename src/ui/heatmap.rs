use crate::analysis::{Lookback, VolumeGrid};
use crate::ui::chart::compact;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const AXIS_WIDTH: u16 = 10;
const LEGEND_WIDTH: u16 = 12;

/// Sampled from matplotlib's "inferno".
const INFERNO: [(u8, u8, u8); 8] = [
    (0, 0, 4),
    (40, 11, 84),
    (101, 21, 110),
    (159, 42, 99),
    (212, 72, 66),
    (245, 125, 21),
    (250, 193, 39),
    (252, 255, 164),
];

pub fn inferno(t: f64) -> Color {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (INFERNO.len() - 1) as f64;
    let idx = (scaled.floor() as usize).min(INFERNO.len() - 2);
    let frac = scaled - idx as f64;
    let (r0, g0, b0) = INFERNO[idx];
    let (r1, g1, b1) = INFERNO[idx + 1];
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    Color::Rgb(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

/// Index range of source items covered by target cell `k` of `target`.
/// Cells stretch when the source is smaller than the target.
fn span(k: usize, source: usize, target: usize) -> (usize, usize) {
    let lo = k * source / target;
    let hi = ((k + 1) * source / target).max(lo + 1).min(source);
    (lo, hi)
}

/// Sums grid cells into a `height` x `width` raster, top row = highest prices.
pub fn resample(grid: &VolumeGrid, width: usize, height: usize) -> Vec<Vec<f64>> {
    if grid.rows() == 0 || grid.cols() == 0 || width == 0 || height == 0 {
        return Vec::new();
    }

    (0..height)
        .rev()
        .map(|k| {
            let (row_lo, row_hi) = span(k, grid.rows(), height);
            (0..width)
                .map(|c| {
                    let (col_lo, col_hi) = span(c, grid.cols(), width);
                    (row_lo..row_hi)
                        .map(|r| grid.row(r)[col_lo..col_hi].iter().sum::<f64>())
                        .sum()
                })
                .collect()
        })
        .collect()
}

pub struct HeatMap {
    pub grid: Option<VolumeGrid>,
    pub symbol: String,
    pub lookback: Lookback,
}

impl HeatMap {
    pub fn new(symbol: String, lookback: Lookback) -> Self {
        Self {
            grid: None,
            symbol,
            lookback,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let bin_label = self
            .grid
            .as_ref()
            .map(|g| format!(" [bin ${}]", g.bin_width()))
            .unwrap_or_default();
        let block = Block::default()
            .title(format!(
                "{} Liquidity Heat Map (Volume by Price Over Time) - {}{}",
                self.symbol,
                self.lookback.description(),
                bin_label
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(grid) = &self.grid else {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    "No bars in this window",
                    Style::default().fg(Color::Gray),
                ))),
                inner,
            );
            return;
        };

        if inner.width < AXIS_WIDTH + LEGEND_WIDTH + 10 || inner.height < 6 {
            return;
        }

        let plot = Rect {
            x: inner.x + AXIS_WIDTH,
            y: inner.y,
            width: inner.width - AXIS_WIDTH - LEGEND_WIDTH,
            height: inner.height - 2,
        };

        let raster = resample(grid, plot.width as usize, plot.height as usize);
        let peak = raster
            .iter()
            .flatten()
            .fold(0.0f64, |a, &b| a.max(b));

        let buf = frame.buffer_mut();
        for (dy, line) in raster.iter().enumerate() {
            for (dx, &value) in line.iter().enumerate() {
                let t = if peak > 0.0 { value / peak } else { 0.0 };
                buf[(plot.x + dx as u16, plot.y + dy as u16)]
                    .set_char(' ')
                    .set_bg(inferno(t));
            }
        }

        // price axis, labelled with the lower edge of the lowest bin in the cell
        let height = plot.height as usize;
        let label_every = 3;
        for dy in (0..height).step_by(label_every) {
            let (row_lo, _) = span(height - 1 - dy, grid.rows(), height);
            let label = format!("{:>9.2}", grid.price_bins()[row_lo]);
            write_str(buf, inner.x, plot.y + dy as u16, &label, Color::Gray, plot.x);
        }

        // date axis, every max(1, n/10)-th column
        let axis_y = plot.y + plot.height;
        let mut next_free = plot.x;
        for tick in grid.date_ticks() {
            let x = plot.x + (tick.column * plot.width as usize / grid.cols()) as u16;
            buf[(x, axis_y)].set_char('┬').set_fg(Color::Gray);
            let label = tick.date.format("%Y-%m-%d").to_string();
            if x >= next_free && x + label.len() as u16 <= plot.x + plot.width + LEGEND_WIDTH {
                write_str(buf, x, axis_y + 1, &label, Color::Gray, inner.x + inner.width);
                next_free = x + label.len() as u16 + 1;
            }
        }

        // color scale
        let legend_x = plot.x + plot.width + 2;
        for dy in 0..plot.height {
            let t = 1.0 - dy as f64 / (plot.height - 1).max(1) as f64;
            buf[(legend_x, plot.y + dy)].set_char(' ').set_bg(inferno(t));
            buf[(legend_x + 1, plot.y + dy)].set_char(' ').set_bg(inferno(t));
        }
        let right = inner.x + inner.width;
        write_str(buf, legend_x + 3, plot.y, &compact(peak), Color::Gray, right);
        write_str(buf, legend_x + 3, plot.y + plot.height / 2, "Est.", Color::Gray, right);
        write_str(buf, legend_x + 3, plot.y + plot.height / 2 + 1, "Volume", Color::Gray, right);
        write_str(buf, legend_x + 3, plot.y + plot.height - 1, "0", Color::Gray, right);
    }
}

fn write_str(buf: &mut ratatui::buffer::Buffer, x: u16, y: u16, text: &str, color: Color, limit: u16) {
    for (j, ch) in text.chars().enumerate() {
        let x_pos = x + j as u16;
        if x_pos >= limit {
            break;
        }
        buf[(x_pos, y)].set_char(ch).set_fg(color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::heatmap;
    use crate::data::Bar;
    use chrono::NaiveDate;
    use ratatui::{backend::TestBackend, Terminal};

    fn bars(n: u32) -> Vec<Bar> {
        (1..=n)
            .map(|d| Bar {
                date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
                open: 10.0,
                high: 10.0 + (d % 4) as f64,
                low: 10.0,
                close: 10.0,
                volume: 100.0 * d as f64,
            })
            .collect()
    }

    #[test]
    fn test_inferno_endpoints() {
        assert_eq!(inferno(0.0), Color::Rgb(0, 0, 4));
        assert_eq!(inferno(1.0), Color::Rgb(252, 255, 164));
        assert_eq!(inferno(f64::NAN), Color::Rgb(0, 0, 4));
        assert_eq!(inferno(7.5), Color::Rgb(252, 255, 164));
    }

    #[test]
    fn test_span_stretches_and_compresses() {
        assert_eq!(span(0, 10, 5), (0, 2));
        assert_eq!(span(4, 10, 5), (8, 10));
        assert_eq!(span(0, 2, 4), (0, 1));
        assert_eq!(span(3, 2, 4), (1, 2));
    }

    #[test]
    fn test_resample_preserves_total_when_compressing() {
        let grid = heatmap::build(&bars(28), 0.5).unwrap();
        let raster = resample(&grid, 7, 3);

        assert_eq!(raster.len(), 3);
        assert!(raster.iter().all(|r| r.len() == 7));

        let total: f64 = raster.iter().flatten().sum();
        let expected: f64 = (0..grid.cols()).map(|c| grid.column_sum(c)).sum();
        assert!((total - expected).abs() < 1e-6);
    }

    #[test]
    fn test_resample_puts_high_prices_on_top() {
        let bars = vec![Bar {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            open: 10.0,
            high: 10.5,
            low: 10.0,
            close: 10.5,
            volume: 5.0,
        }];
        // bins 10, 11; all volume on the lowest bin
        let grid = heatmap::build(&bars, 1.0).unwrap();
        let raster = resample(&grid, 1, 2);
        assert_eq!(raster, vec![vec![0.0], vec![5.0]]);
    }

    #[test]
    fn test_render_shows_axes() {
        let mut view = HeatMap::new("AMD".to_string(), Lookback::SixMonths);
        view.grid = Some(heatmap::build(&bars(20), 1.0).unwrap());

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                view.render(f, area)
            })
            .unwrap();

        let content: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(content.contains("AMD Liquidity Heat Map"));
        assert!(content.contains("2024-03-01"));
        assert!(content.contains("Volume"));
    }
}
