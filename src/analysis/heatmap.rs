//! Volume-by-price binning for the liquidity heat map.
//!
//! Each day's volume is spread evenly over the price bins whose lower edge
//! lies inside that day's `[low, high]` range. A day whose range contains no
//! bin edge contributes nothing to the grid.

use crate::data::Bar;
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use tracing::debug;

/// Estimated volume per (price bin, date). Rows are bins ascending by lower
/// edge, columns are bars in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGrid {
    price_bins: Vec<f64>,
    dates: Vec<NaiveDate>,
    bin_width: f64,
    cells: Vec<f64>,
}

/// A labelled position on the date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct DateTick {
    pub column: usize,
    pub date: NaiveDate,
}

impl VolumeGrid {
    pub fn rows(&self) -> usize {
        self.price_bins.len()
    }

    pub fn cols(&self) -> usize {
        self.dates.len()
    }

    pub fn price_bins(&self) -> &[f64] {
        &self.price_bins
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.cols() + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let cols = self.cols();
        &self.cells[row * cols..(row + 1) * cols]
    }

    pub fn column_sum(&self, col: usize) -> f64 {
        (0..self.rows()).map(|row| self.get(row, col)).sum()
    }

    pub fn max_value(&self) -> f64 {
        self.cells.iter().fold(0.0f64, |a, &b| a.max(b))
    }

    /// Every `max(1, cols / 10)`-th column, starting at the first.
    pub fn date_ticks(&self) -> Vec<DateTick> {
        let step = (self.cols() / 10).max(1);
        self.dates
            .iter()
            .enumerate()
            .step_by(step)
            .map(|(column, date)| DateTick {
                column,
                date: *date,
            })
            .collect()
    }
}

fn validate(bars: &[Bar], bin_width: f64) -> Result<()> {
    if bars.is_empty() {
        return Err(AppError::InvalidInput("no bars to bin".to_string()));
    }
    if !(bin_width.is_finite() && bin_width > 0.0) {
        return Err(AppError::InvalidInput(format!(
            "bin width must be positive, got {}",
            bin_width
        )));
    }
    for bar in bars {
        if !(bar.low.is_finite() && bar.high.is_finite() && bar.volume.is_finite()) {
            return Err(AppError::InvalidInput(format!(
                "bar on {} has a non-finite value",
                bar.date
            )));
        }
        if bar.low > bar.high {
            return Err(AppError::InvalidInput(format!(
                "bar on {} has low {} above high {}",
                bar.date, bar.low, bar.high
            )));
        }
        if bar.volume < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "bar on {} has negative volume {}",
                bar.date, bar.volume
            )));
        }
    }
    Ok(())
}

/// Upper bound on `bins x dates`.
pub const MAX_CELLS: usize = 25_000_000;

/// Lower edges from `floor(min low)` up to, but excluding, `ceil(max high) + bin_width`.
pub fn price_bins(bars: &[Bar], bin_width: f64) -> Result<Vec<f64>> {
    validate(bars, bin_width)?;

    let (min_low, max_high) = bars
        .iter()
        .fold((f64::MAX, f64::MIN), |(min, max), bar| {
            (min.min(bar.low), max.max(bar.high))
        });

    let start = min_low.floor();
    let stop = max_high.ceil() + bin_width;
    let count = ((stop - start) / bin_width).ceil();
    if !count.is_finite() || count > MAX_CELLS as f64 {
        return Err(AppError::InvalidInput(format!(
            "bin width {} splits {}..{} into too many bins",
            bin_width, start, stop
        )));
    }
    let count = count as usize;

    Ok((0..count).map(|i| start + i as f64 * bin_width).collect())
}

pub fn build(bars: &[Bar], bin_width: f64) -> Result<VolumeGrid> {
    let bins = price_bins(bars, bin_width)?;
    let cols = bars.len();
    let size = bins
        .len()
        .checked_mul(cols)
        .filter(|&n| n <= MAX_CELLS)
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "{} bins x {} dates exceeds the {} cell limit; use a wider bin",
                bins.len(),
                cols,
                MAX_CELLS
            ))
        })?;
    let mut cells = vec![0.0; size];

    for (col, bar) in bars.iter().enumerate() {
        // bins are ascending, so the edges inside [low, high] are contiguous
        let first = bins.partition_point(|&edge| edge < bar.low);
        let last = bins.partition_point(|&edge| edge <= bar.high);

        if first >= last {
            if bar.volume > 0.0 {
                debug!(
                    date = %bar.date,
                    low = bar.low,
                    high = bar.high,
                    volume = bar.volume,
                    "no bin edge inside range, volume dropped"
                );
            }
            continue;
        }

        let per_bin = bar.volume / (last - first) as f64;
        for row in first..last {
            cells[row * cols + col] = per_bin;
        }
    }

    Ok(VolumeGrid {
        price_bins: bins,
        dates: bars.iter().map(|b| b.date).collect(),
        bin_width,
        cells,
    })
}
