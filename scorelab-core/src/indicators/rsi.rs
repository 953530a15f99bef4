//! Relative Strength Index (RSI).
//!
//! Wilder smoothing (`alpha = 1/period`) of gains and losses, seeded with the
//! first change. RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! Lookback: period.
//! Edge case: avg_loss == 0 → RSI = 50 (undefined ratio treated as neutral).

use crate::domain::PriceBar;

use super::{ewm, Indicator};

pub const NEUTRAL_RSI: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let n = bars.len();
        let mut gains = vec![f64::NAN; n];
        let mut losses = vec![f64::NAN; n];
        for i in 1..n {
            let change = bars[i].close - bars[i - 1].close;
            if change.is_nan() {
                continue;
            }
            gains[i] = change.max(0.0);
            losses[i] = (-change).max(0.0);
        }

        let alpha = 1.0 / self.period as f64;
        let avg_gain = ewm(&gains, alpha, self.period);
        let avg_loss = ewm(&losses, alpha, self.period);

        avg_gain
            .iter()
            .zip(avg_loss.iter())
            .map(|(&g, &l)| {
                if g.is_nan() || l.is_nan() {
                    f64::NAN
                } else {
                    compute_rsi(g, l)
                }
            })
            .collect()
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        NEUTRAL_RSI
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn rsi_warmup_is_nan() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + (i % 3) as f64).collect();
        let result = Rsi::new(14).compute(&make_bars(&closes));
        for v in &result[..14] {
            assert!(v.is_nan());
        }
        assert!(!result[14].is_nan());
    }

    #[test]
    fn rsi_all_gains_is_neutral() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = Rsi::new(14).compute(&make_bars(&closes));
        assert_approx(result[19], NEUTRAL_RSI, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let result = Rsi::new(14).compute(&make_bars(&closes));
        assert_approx(result[19], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_symmetric_moves_near_fifty() {
        let closes: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let result = Rsi::new(14).compute(&make_bars(&closes));
        let last = result[39];
        assert!(last > 40.0 && last < 60.0, "rsi = {last}");
    }

    #[test]
    fn rsi_bounded() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + ((i * 7) % 11) as f64).collect();
        let result = Rsi::new(14).compute(&make_bars(&closes));
        for v in result.iter().filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(v));
        }
    }
}
