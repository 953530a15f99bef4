//! Rolling high / low channel with partial leading windows.

use crate::domain::PriceBar;

use super::Indicator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelBand {
    /// Rolling max of highs.
    Upper,
    /// Rolling min of lows.
    Lower,
}

#[derive(Debug, Clone)]
pub struct Channel {
    period: usize,
    band: ChannelBand,
    name: String,
}

impl Channel {
    pub fn new(period: usize, band: ChannelBand) -> Self {
        assert!(period >= 1, "channel period must be >= 1");
        let label = match band {
            ChannelBand::Upper => "high",
            ChannelBand::Lower => "low",
        };
        Self {
            period,
            band,
            name: format!("{label}_{period}"),
        }
    }
}

impl Indicator for Channel {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        (0..bars.len())
            .map(|i| {
                let window = &bars[(i + 1).saturating_sub(self.period)..=i];
                match self.band {
                    ChannelBand::Upper => window
                        .iter()
                        .map(|b| b.high)
                        .filter(|v| !v.is_nan())
                        .fold(f64::NAN, f64::max),
                    ChannelBand::Lower => window
                        .iter()
                        .map(|b| b.low)
                        .filter(|v| !v.is_nan())
                        .fold(f64::NAN, f64::min),
                }
            })
            .collect()
    }
}
