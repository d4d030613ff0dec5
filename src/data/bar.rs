use crate::error::{AppError, Result};
use chrono::{NaiveDate, NaiveDateTime};

/// One day's OHLCV record.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

/// Accepts `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`; intraday stamps keep only the date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .map_err(|_| AppError::Parse(format!("unrecognised datetime '{}'", raw)))
}

pub fn parse_number(field: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| AppError::Parse(format!("{} is not a number: '{}'", field, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15").unwrap(), expected);
        assert_eq!(parse_date("2024-03-15 16:00:00").unwrap(), expected);
        assert!(parse_date("15/03/2024").is_err());
    }

    #[test]
    fn test_parse_number_reports_field() {
        assert_eq!(parse_number("close", " 12.5 ").unwrap(), 12.5);
        let err = parse_number("volume", "n/a").unwrap_err();
        assert!(err.to_string().contains("volume"));
    }
}
