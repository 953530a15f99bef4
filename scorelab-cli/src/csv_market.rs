//! Market data read from a directory of CSV files.
//!
//! Layout:
//! - `<dir>/<code>.csv` holds daily bars under a
//!   `date,open,high,low,close,volume` header (`2024-06-14`)
//! - `<dir>/<code>.5m.csv` optionally holds five-minute bars under a
//!   `timestamp,open,high,low,close,volume` header (`2024-06-14T09:05:00`)
//!
//! A missing daily file is a `SymbolNotFound`; a missing five-minute file is
//! an empty history, which sends intraday scoring down its proxy path.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use scorelab_core::domain::{Interval, PriceBar};
use scorelab_core::{MarketData, ProviderError};

#[derive(Debug, Deserialize)]
struct DailyRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl From<DailyRow> for PriceBar {
    fn from(row: DailyRow) -> Self {
        PriceBar::daily(row.date, row.open, row.high, row.low, row.close, row.volume)
    }
}

#[derive(Debug, Deserialize)]
struct IntradayRow {
    timestamp: NaiveDateTime,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl From<IntradayRow> for PriceBar {
    fn from(row: IntradayRow) -> Self {
        PriceBar {
            timestamp: row.timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvMarket {
    dir: PathBuf,
}

impl CsvMarket {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, code: &str, interval: Interval) -> PathBuf {
        match interval {
            Interval::Daily => self.dir.join(format!("{code}.csv")),
            Interval::FiveMinute => self.dir.join(format!("{code}.5m.csv")),
        }
    }

    fn read<R>(&self, code: &str, path: &Path) -> Result<Vec<PriceBar>, ProviderError>
    where
        R: DeserializeOwned + Into<PriceBar>,
    {
        let file = File::open(path)?;
        let mut reader = csv::Reader::from_reader(file);
        reader
            .deserialize::<R>()
            .map(|row| {
                row.map(Into::into).map_err(|e| ProviderError::Malformed {
                    symbol: code.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

impl MarketData for CsvMarket {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_history(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        let path = self.path(code, interval);
        if !path.is_file() {
            return match interval {
                Interval::Daily => Err(ProviderError::SymbolNotFound {
                    symbol: code.to_string(),
                }),
                Interval::FiveMinute => Ok(Vec::new()),
            };
        }

        let mut bars = match interval {
            Interval::Daily => self.read::<DailyRow>(code, &path)?,
            Interval::FiveMinute => self.read::<IntradayRow>(code, &path)?,
        };
        bars.retain(|b| (start..=end).contains(&b.date()));
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn market_with(files: &[(&str, &str)]) -> (tempfile::TempDir, CsvMarket) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let market = CsvMarket::new(dir.path());
        (dir, market)
    }

    const DAILY: &str = "\
date,open,high,low,close,volume
2024-06-14,101,103,100,102,5000
2024-06-12,99,100,98,99.5,4000
2024-06-13,100,102,99,101,4500
";

    #[test]
    fn reads_sorts_and_filters_daily_bars() {
        let (_dir, market) = market_with(&[("005930.csv", DAILY)]);
        let bars = market
            .fetch_history("005930", d(2024, 6, 13), d(2024, 6, 14), Interval::Daily)
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date(), d(2024, 6, 13));
        assert_eq!(bars[1].close, 102.0);
        assert_eq!(bars[1].volume, 5000.0);
    }

    #[test]
    fn missing_daily_file_is_symbol_not_found() {
        let (_dir, market) = market_with(&[]);
        let err = market
            .fetch_history("000660", d(2024, 1, 1), d(2024, 6, 14), Interval::Daily)
            .unwrap_err();
        assert!(matches!(err, ProviderError::SymbolNotFound { ref symbol } if symbol == "000660"));
    }

    #[test]
    fn missing_intraday_file_is_empty() {
        let (_dir, market) = market_with(&[("005930.csv", DAILY)]);
        let bars = market
            .fetch_history("005930", d(2024, 6, 14), d(2024, 6, 14), Interval::FiveMinute)
            .unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn reads_five_minute_bars() {
        let intraday = "\
timestamp,open,high,low,close,volume
2024-06-14T09:05:00,101,101.5,100.8,101.2,300
2024-06-14T09:00:00,100,101,99.5,101,500
2024-06-13T15:15:00,99,99.2,98.9,99.1,200
";
        let (_dir, market) = market_with(&[("005930.5m.csv", intraday)]);
        let bars = market
            .fetch_history("005930", d(2024, 6, 14), d(2024, 6, 14), Interval::FiveMinute)
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time(), scorelab_core::calendar::hhmm(9, 0));
        assert_eq!(bars[1].close, 101.2);
    }

    #[test]
    fn bad_row_is_malformed() {
        let (_dir, market) = market_with(&[("005930.csv", "date,open,high,low,close,volume\n2024-06-14,x,1,1,1,1\n")]);
        let err = market
            .fetch_history("005930", d(2024, 6, 1), d(2024, 6, 14), Interval::Daily)
            .unwrap_err();
        assert!(matches!(err, ProviderError::Malformed { .. }));
    }
}
