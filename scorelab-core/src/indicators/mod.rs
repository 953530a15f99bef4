//! Indicator trait and concrete indicator implementations.
//!
//! Indicators are pure functions: bar history in, numeric series out. The
//! output has the same length as the input and carries `f64::NAN` for bars
//! inside the warmup period. The Indicator Engine (`crate::factors`) reads the
//! last value of each series.
//!
//! Smoothing follows the conventions the factor rules were calibrated on:
//! moving averages accept partial leading windows, exponential averages are
//! seeded with the first observation (no SMA seed), and Wilder-style averages
//! use `alpha = 1 / period` with a `period`-observation warmup.

pub mod atr;
pub mod channel;
pub mod drawdown;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod sparkline;
pub mod volatility;

pub use atr::Atr;
pub use channel::{Channel, ChannelBand};
pub use drawdown::Drawdown;
pub use ema::Ema;
pub use macd::Macd;
pub use rsi::Rsi;
pub use sma::{PriceField, Sma};
pub use sparkline::{build_sparkline, normalize_sparkline};
pub use volatility::Volatility;

use crate::domain::PriceBar;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[PriceBar]) -> Vec<f64>;

    /// Value at the last bar, or NaN for an empty series.
    fn last(&self, bars: &[PriceBar]) -> f64 {
        self.compute(bars).last().copied().unwrap_or(f64::NAN)
    }
}

/// Pandas-style `ewm(alpha, adjust=False, min_periods)` over a series that may
/// contain leading NaNs. The first finite value seeds the average.
pub(crate) fn ewm(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    let mut state: Option<f64> = None;
    let mut seen = 0usize;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            if let Some(s) = state {
                if seen >= min_periods {
                    result[i] = s;
                }
            }
            continue;
        }
        let next = match state {
            None => v,
            Some(prev) => alpha * v + (1.0 - alpha) * prev,
        };
        state = Some(next);
        seen += 1;
        if seen >= min_periods {
            result[i] = next;
        }
    }
    result
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            PriceBar::daily(
                base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
