use crate::data::Bar;

pub const FAST_MA: usize = 50;
pub const SLOW_MA: usize = 200;

pub fn calculate_sma(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    if period == 0 || bars.len() < period {
        return vec![None; bars.len()];
    }

    let mut sma = vec![None; period - 1];

    for i in (period - 1)..bars.len() {
        let sum: f64 = bars[(i + 1 - period)..=i].iter().map(|b| b.close).sum();
        sma.push(Some(sum / period as f64));
    }

    sma
}

/// Moving averages are computed over the full history so the first windowed
/// bars already carry a value.
#[derive(Debug, Clone, Default)]
pub struct MovingAverages {
    pub fast: Vec<Option<f64>>,
    pub slow: Vec<Option<f64>>,
}

impl MovingAverages {
    pub fn from_history(bars: &[Bar]) -> Self {
        Self {
            fast: calculate_sma(bars, FAST_MA),
            slow: calculate_sma(bars, SLOW_MA),
        }
    }

    pub fn tail(&self, start: usize) -> Self {
        Self {
            fast: self.fast.get(start..).unwrap_or_default().to_vec(),
            slow: self.slow.get(start..).unwrap_or_default().to_vec(),
        }
    }

    pub fn has_slow(&self) -> bool {
        self.slow.iter().any(Option::is_some)
    }
}
