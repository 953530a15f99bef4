//! Annualized volatility: sample std (ddof = 1) of simple daily returns over
//! the trailing window, times sqrt(252).
//!
//! The value is NaN until the window holds `period` finite returns, so a
//! 60-bar history (59 returns) has no 60-return volatility yet.

use crate::domain::PriceBar;

use super::Indicator;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone)]
pub struct Volatility {
    period: usize,
    name: String,
}

impl Volatility {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "volatility period must be >= 2");
        Self {
            period,
            name: format!("volatility_{period}"),
        }
    }
}

/// Simple returns; element 0 is NaN.
pub fn simple_returns(bars: &[PriceBar]) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        let prev = bars[i - 1].close;
        if prev != 0.0 {
            out[i] = bars[i].close / prev - 1.0;
        }
    }
    out
}

/// Sample standard deviation (ddof = 1). None for fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

impl Indicator for Volatility {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let returns = simple_returns(bars);
        (0..bars.len())
            .map(|i| {
                if i + 1 < self.period {
                    return f64::NAN;
                }
                let window = &returns[i + 1 - self.period..=i];
                if window.iter().any(|v| !v.is_finite()) {
                    return f64::NAN;
                }
                sample_std(window)
                    .map(|s| s * TRADING_DAYS_PER_YEAR.sqrt())
                    .unwrap_or(f64::NAN)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn flat_series_has_zero_volatility() {
        let result = Volatility::new(60).compute(&make_bars(&[100.0; 80]));
        assert!(result[0].is_nan());
        assert!(result[59].is_nan());
        assert_approx(result[60], 0.0, DEFAULT_EPSILON);
        assert_approx(result[79], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn alternating_returns() {
        // Returns: +10%, -10%/1.1 ... compute directly.
        let bars = make_bars(&[100.0, 110.0, 99.0]);
        let r1: f64 = 0.1;
        let r2: f64 = 99.0 / 110.0 - 1.0;
        let mean = (r1 + r2) / 2.0;
        let std = (((r1 - mean) * (r1 - mean) + (r2 - mean) * (r2 - mean)) / 1.0).sqrt();
        let result = Volatility::new(2).compute(&bars);
        assert!(result[1].is_nan());
        assert_approx(result[2], std * 252f64.sqrt(), 1e-12);
    }

    #[test]
    fn needs_a_full_window_of_returns() {
        let closes: Vec<f64> = (0..61).map(|i| if i % 2 == 0 { 100.0 } else { 102.0 }).collect();
        let result = Volatility::new(60).compute(&make_bars(&closes));
        // 60 bars carry 59 returns
        assert!(result[59].is_nan());
        assert!(result[60].is_finite());
        assert!(result[60] > 0.0);
    }

    #[test]
    fn sample_std_requires_two_values() {
        assert!(sample_std(&[1.0]).is_none());
        assert_approx(sample_std(&[1.0, 3.0]).unwrap(), 2f64.sqrt(), DEFAULT_EPSILON);
    }
}
