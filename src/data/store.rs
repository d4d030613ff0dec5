use crate::data::bar::{parse_date, parse_number, Bar};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct BarRecord {
    datetime: String,
    open: String,
    high: String,
    low: String,
    close: String,
    #[serde(default)]
    volume: String,
}

#[derive(Debug, Serialize)]
struct BarRow {
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub fn cache_path(data_dir: &Path, symbol: &str) -> PathBuf {
    data_dir.join(format!("{}_5y_data.csv", symbol.to_uppercase()))
}

pub fn save_bars(path: &Path, bars: &[Bar]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for bar in bars {
        writer.serialize(BarRow {
            datetime: bar.date.format("%Y-%m-%d").to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        })?;
    }
    writer.flush()?;
    Ok(bars.len())
}

/// Loads a cached series sorted ascending by date. Columns are matched by header name.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    if !path.exists() {
        return Err(AppError::Io(format!(
            "no cached data at {} (run `stockcharts fetch` first)",
            path.display()
        )));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut bars = Vec::new();

    for (idx, result) in reader.deserialize::<BarRecord>().enumerate() {
        let record = result?;
        let row = idx + 2;
        let bar = Bar {
            date: parse_date(&record.datetime)?,
            open: parse_number("open", &record.open)?,
            high: parse_number("high", &record.high)?,
            low: parse_number("low", &record.low)?,
            close: parse_number("close", &record.close)?,
            volume: if record.volume.trim().is_empty() {
                0.0
            } else {
                parse_number("volume", &record.volume)?
            },
        };
        if bar.low > bar.high {
            return Err(AppError::InvalidInput(format!(
                "row {}: low {} is above high {}",
                row, bar.low, bar.high
            )));
        }
        bars.push(bar);
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_cache_path_uses_uppercase_symbol() {
        let path = cache_path(Path::new("data"), "cava");
        assert_eq!(path, Path::new("data").join("CAVA_5y_data.csv"));
    }

    #[test]
    fn test_load_sorts_descending_file_and_ignores_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "AMD_5y_data.csv",
            "datetime,open,high,low,close,volume,MA50\n\
             2024-01-04,10,12,9,11,300,\n\
             2024-01-03,9,11,8,10,200,\n\
             2024-01-02,8,10,7,9,100,\n",
        );

        let bars = load_bars(&path).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[2].volume, 300.0);
    }

    #[test]
    fn test_load_rejects_inverted_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "BAD.csv",
            "datetime,open,high,low,close,volume\n2024-01-02,8,7,10,9,100\n",
        );

        let err = load_bars(&path).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_save_then_load_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir.path().join("data"), "nvda");
        let bars = vec![Bar {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            open: 850.0,
            high: 862.5,
            low: 841.0,
            close: 858.25,
            volume: 41_250_000.0,
        }];

        assert_eq!(save_bars(&path, &bars).unwrap(), 1);
        assert_eq!(load_bars(&path).unwrap(), bars);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_bars(&dir.path().join("NOPE_5y_data.csv")).unwrap_err();
        assert!(err.to_string().contains("stockcharts fetch"));
    }
}
