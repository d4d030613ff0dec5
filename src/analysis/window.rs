use crate::data::Bar;
use chrono::{Months, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Trailing window applied to a cached series before charting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Lookback {
    #[value(name = "1m")]
    OneMonth,
    #[value(name = "3m")]
    ThreeMonths,
    #[value(name = "6m")]
    SixMonths,
    #[value(name = "1y")]
    OneYear,
    #[value(name = "2y")]
    TwoYears,
    #[value(name = "all")]
    All,
}

impl Lookback {
    pub fn all() -> Vec<Lookback> {
        vec![
            Lookback::OneMonth,
            Lookback::ThreeMonths,
            Lookback::SixMonths,
            Lookback::OneYear,
            Lookback::TwoYears,
            Lookback::All,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Lookback::OneMonth => "1M",
            Lookback::ThreeMonths => "3M",
            Lookback::SixMonths => "6M",
            Lookback::OneYear => "1Y",
            Lookback::TwoYears => "2Y",
            Lookback::All => "ALL",
        }
    }

    pub fn description(&self) -> String {
        match self.months() {
            Some(12) => "Last 1 Year".to_string(),
            Some(24) => "Last 2 Years".to_string(),
            Some(m) => format!("Last {} Months", m),
            None => "Full History".to_string(),
        }
    }

    pub fn months(&self) -> Option<u32> {
        match self {
            Lookback::OneMonth => Some(1),
            Lookback::ThreeMonths => Some(3),
            Lookback::SixMonths => Some(6),
            Lookback::OneYear => Some(12),
            Lookback::TwoYears => Some(24),
            Lookback::All => None,
        }
    }

    pub fn cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.months()
            .and_then(|m| today.checked_sub_months(Months::new(m)))
    }
}

/// Index of the first bar dated strictly after the cutoff day.
///
/// Daily rows are stamped at midnight while the cutoff is "now minus N
/// months", so the cutoff day itself falls outside the window.
pub fn window_start(bars: &[Bar], lookback: Lookback, today: NaiveDate) -> usize {
    match lookback.cutoff(today) {
        Some(cutoff) => bars.partition_point(|b| b.date <= cutoff),
        None => 0,
    }
}

pub fn apply(bars: &[Bar], lookback: Lookback, today: NaiveDate) -> &[Bar] {
    &bars[window_start(bars, lookback, today)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bars_on(dates: &[NaiveDate]) -> Vec<Bar> {
        dates
            .iter()
            .map(|&date| Bar {
                date,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_cutoff_clamps_month_end() {
        assert_eq!(Lookback::SixMonths.cutoff(day(2024, 8, 31)), Some(day(2024, 2, 29)));
        assert_eq!(Lookback::OneYear.cutoff(day(2024, 3, 15)), Some(day(2023, 3, 15)));
        assert_eq!(Lookback::All.cutoff(day(2024, 3, 15)), None);
    }

    #[test]
    fn test_window_excludes_cutoff_day() {
        let bars = bars_on(&[day(2024, 1, 14), day(2024, 1, 15), day(2024, 1, 16), day(2024, 3, 1)]);
        let today = day(2024, 2, 15);

        assert_eq!(window_start(&bars, Lookback::OneMonth, today), 2);
        assert_eq!(apply(&bars, Lookback::OneMonth, today).len(), 2);
        assert_eq!(apply(&bars, Lookback::All, today).len(), 4);
    }

    #[test]
    fn test_window_can_be_empty() {
        let bars = bars_on(&[day(2020, 1, 2)]);
        assert!(apply(&bars, Lookback::SixMonths, day(2024, 6, 1)).is_empty());
    }

    #[test]
    fn test_description() {
        assert_eq!(Lookback::SixMonths.description(), "Last 6 Months");
        assert_eq!(Lookback::OneYear.description(), "Last 1 Year");
        assert_eq!(Lookback::All.description(), "Full History");
    }
}
