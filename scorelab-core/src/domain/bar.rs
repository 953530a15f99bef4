//! PriceBar: the fundamental market data unit.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single instrument at a single timestamp.
///
/// Daily bars carry midnight timestamps; intraday bars carry the bar open
/// time in exchange-local time. Bars are supplied by a provider and never
/// mutated by the scoring code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Daily bar stamped at midnight of `date`.
    pub fn daily(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp: date.and_time(NaiveTime::MIN),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }

    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Typical price used for VWAP: (high + low + close) / 3.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Percent change from `prev` to `current`; `None` when `prev` is zero or
/// either value is not finite.
pub fn change_pct(prev: f64, current: f64) -> Option<f64> {
    if prev == 0.0 || !prev.is_finite() || !current.is_finite() {
        return None;
    }
    Some((current - prev) / prev * 100.0)
}

/// Percent change between the last two closes.
pub fn last_change_pct(bars: &[PriceBar]) -> Option<f64> {
    match bars {
        [.., prev, last] => change_pct(prev.close, last.close),
        _ => None,
    }
}

/// Bar interval requested from a market data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    FiveMinute,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_bar_is_stamped_at_midnight() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let bar = PriceBar::daily(d, 100.0, 105.0, 98.0, 103.0, 5_000.0);
        assert_eq!(bar.date(), d);
        assert_eq!(bar.time(), NaiveTime::MIN);
        assert!(!bar.is_void());
    }

    #[test]
    fn typical_price_averages_hlc() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let bar = PriceBar::daily(d, 100.0, 106.0, 97.0, 103.0, 1.0);
        assert!((bar.typical_price() - 102.0).abs() < 1e-12);
    }

    #[test]
    fn change_between_last_two_closes() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let bars = vec![
            PriceBar::daily(d, 1.0, 1.0, 1.0, 200.0, 1.0),
            PriceBar::daily(d, 1.0, 1.0, 1.0, 202.0, 1.0),
        ];
        assert!((last_change_pct(&bars).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(last_change_pct(&bars[..1]), None);
        assert_eq!(change_pct(0.0, 5.0), None);
    }

    #[test]
    fn nan_close_is_void() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let bar = PriceBar::daily(d, 100.0, 106.0, 97.0, f64::NAN, 1.0);
        assert!(bar.is_void());
    }
}
