//! Simple Moving Average (SMA).
//!
//! Rolling mean over a lookback window. Leading bars use the partial window
//! (`min_periods = 1`), so the series has no warmup. NaN inputs are skipped.

use crate::domain::PriceBar;

use super::Indicator;

/// Which bar field an indicator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Close,
    Volume,
}

impl PriceField {
    pub fn read(&self, bar: &PriceBar) -> f64 {
        match self {
            PriceField::Close => bar.close,
            PriceField::Volume => bar.volume,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    field: PriceField,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            field: PriceField::Close,
            name: format!("sma_{period}"),
        }
    }

    /// Rolling mean of volume instead of close.
    pub fn of_volume(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            field: PriceField::Volume,
            name: format!("avg_volume_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for i in 0..n {
            let start = (i + 1).saturating_sub(self.period);
            let (sum, count) = bars[start..=i]
                .iter()
                .map(|b| self.field.read(b))
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count > 0 {
                result[i] = sum / count as f64;
            }
        }

        result
    }
}
