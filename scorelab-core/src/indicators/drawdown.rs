//! Drawdown from a rolling peak: close / rolling_max(close, period) - 1.
//!
//! Values are ≤ 0. The maximum drawdown over a history is the minimum of this
//! series (see [`Drawdown::max_drawdown`]).

use crate::domain::PriceBar;

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Drawdown {
    period: usize,
    name: String,
}

impl Drawdown {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "drawdown period must be >= 1");
        Self {
            period,
            name: format!("drawdown_{period}"),
        }
    }

    /// Most negative drawdown across the whole series (0.0 if empty).
    pub fn max_drawdown(&self, bars: &[PriceBar]) -> f64 {
        self.compute(bars)
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold(0.0, f64::min)
    }
}

impl Indicator for Drawdown {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        (0..bars.len())
            .map(|i| {
                let peak = bars[(i + 1).saturating_sub(self.period)..=i]
                    .iter()
                    .map(|b| b.close)
                    .filter(|v| !v.is_nan())
                    .fold(f64::NAN, f64::max);
                let close = bars[i].close;
                if peak.is_nan() || close.is_nan() || peak <= 0.0 {
                    f64::NAN
                } else {
                    close / peak - 1.0
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn drawdown_from_peak() {
        let bars = make_bars(&[100.0, 120.0, 90.0, 110.0]);
        let dd = Drawdown::new(60).compute(&bars);
        assert_approx(dd[0], 0.0, DEFAULT_EPSILON);
        assert_approx(dd[2], -0.25, DEFAULT_EPSILON);
        assert_approx(Drawdown::new(60).max_drawdown(&bars), -0.25, DEFAULT_EPSILON);
    }

    #[test]
    fn drawdown_peak_rolls_out_of_window() {
        let bars = make_bars(&[200.0, 100.0, 100.0]);
        let dd = Drawdown::new(2).compute(&bars);
        assert_approx(dd[1], -0.5, DEFAULT_EPSILON);
        assert_approx(dd[2], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn flat_series_has_no_drawdown() {
        let bars = make_bars(&[50.0; 70]);
        assert_approx(Drawdown::new(60).max_drawdown(&bars), 0.0, DEFAULT_EPSILON);
    }
}
