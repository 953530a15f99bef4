//! MACD line: EMA(fast) - EMA(slow) of close.

use crate::domain::PriceBar;

use super::{Ema, Indicator};

#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize) -> Self {
        assert!(fast < slow, "MACD fast span must be shorter than slow span");
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            name: format!("macd_{fast}_{slow}"),
        }
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new(12, 26)
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let fast = self.fast.compute(bars);
        let slow = self.slow.compute(bars);
        fast.iter().zip(slow.iter()).map(|(f, s)| f - s).collect()
    }
}
