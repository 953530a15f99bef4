//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], with
//! alpha = 2 / (span + 1). Seeded with the first close, so there is no warmup.

use crate::domain::PriceBar;

use super::{ewm, Indicator};

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    name: String,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be >= 1");
        Self {
            span,
            name: format!("ema_{span}"),
        }
    }

    pub fn alpha(&self) -> f64 {
        2.0 / (self.span as f64 + 1.0)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ewm(&closes, self.alpha(), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn ema_seeded_with_first_close() {
        let bars = make_bars(&[10.0, 13.0, 16.0]);
        let result = Ema::new(2).compute(&bars);
        // alpha = 2/3
        assert_approx(result[0], 10.0, DEFAULT_EPSILON);
        assert_approx(result[1], 12.0, DEFAULT_EPSILON);
        assert_approx(result[2], 14.666666666666666, 1e-9);
    }

    #[test]
    fn ema_constant_series_is_constant() {
        let bars = make_bars(&[50.0; 30]);
        let result = Ema::new(12).compute(&bars);
        assert!(result.iter().all(|v| (v - 50.0).abs() < DEFAULT_EPSILON));
    }
}
