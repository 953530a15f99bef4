//! Average True Range (ATR).
//!
//! True range = max(high - low, |high - prev_close|, |low - prev_close|); the
//! first bar uses high - low. Wilder smoothing with alpha = 1/period.
//! Lookback: period - 1.

use crate::domain::PriceBar;

use super::{ewm, Indicator};

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True range of each bar.
pub fn true_range(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let hl = (bar.high - bar.low).abs();
            if i == 0 || bars[i - 1].close.is_nan() {
                return hl;
            }
            let prev_close = bars[i - 1].close;
            hl.max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        })
        .collect()
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        ewm(&true_range(bars), 1.0 / self.period as f64, self.period)
    }
}
