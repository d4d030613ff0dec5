use crate::data::Bar;

/// Retracement ratios measured down from the swing high.
const RATIOS: [(&str, f64); 9] = [
    ("0% (High)", 0.0),
    ("23.6%", 0.236),
    ("28%", 0.28),
    ("38.2%", 0.382),
    ("50%", 0.5),
    ("61.8%", 0.618),
    ("72%", 0.72),
    ("78.6%", 0.786),
    ("100% (Low)", 1.0),
];

#[derive(Debug, Clone, PartialEq)]
pub struct FibLevel {
    pub label: &'static str,
    pub ratio: f64,
    pub price: f64,
}

impl FibLevel {
    /// The swing high and low are drawn solid, the retracements dashed.
    pub fn is_anchor(&self) -> bool {
        self.ratio == 0.0 || self.ratio == 1.0
    }
}

pub fn levels(bars: &[Bar]) -> Option<Vec<FibLevel>> {
    if bars.is_empty() {
        return None;
    }

    let swing_high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let swing_low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    let range = swing_high - swing_low;

    Some(
        RATIOS
            .iter()
            .map(|&(label, ratio)| FibLevel {
                label,
                ratio,
                price: if ratio == 1.0 {
                    swing_low
                } else {
                    swing_high - ratio * range
                },
            })
            .collect(),
    )
}
