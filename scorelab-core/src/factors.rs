//! Indicator Engine: price/volume history → three raw factor scores.
//!
//! Scoring rules:
//! - return    = 0.4·ma + 0.3·rsi + 0.3·macd, where ma = 10 if SMA5 > SMA20
//!   else 4; rsi = 10 inside [40, 70], 5 above 70, else 8; macd = 10 if the
//!   MACD line is positive else 5.
//! - stability = 0.6·max(0, 10 − |MDD|·100/3) + 0.4·max(0, 10 − vol·10).
//! - market    = 1 + ((log10(avgVol20) − 4.5) / 3)·9.
//!
//! Each factor is rounded to one decimal and clamped to [1, 10].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{clamp_score, round_to, FactorScore, PriceBar};
use crate::indicators::{
    Atr, Channel, ChannelBand, Drawdown, Indicator, Macd, Rsi, Sma, Volatility,
};
use crate::indicators::rsi::NEUTRAL_RSI;

/// Fewest daily bars an instrument needs to be scored.
pub const MIN_HISTORY_BARS: usize = 60;

/// ATR fallback as a fraction of price when ATR is still warming up.
pub const ATR_FALLBACK_FRACTION: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactorError {
    #[error("insufficient history: {len} bars < minimum {required}")]
    InsufficientHistory { len: usize, required: usize },
}

/// Raw factors plus the indicator readings they were derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorSnapshot {
    pub raw: FactorScore,
    pub sma_fast: f64,
    pub sma_slow: f64,
    pub rsi: f64,
    pub macd: f64,
    /// Maximum drawdown as a fraction (≤ 0).
    pub mdd: f64,
    /// Annualized 60-return volatility; `None` until 60 returns exist.
    pub volatility: Option<f64>,
    pub avg_volume_20: f64,
    pub atr: f64,
    pub price: f64,
    pub prev_price: f64,
    pub high60: f64,
    pub low10: f64,
}

impl FactorSnapshot {
    /// Day-over-day change in percent, two decimals.
    pub fn change_rate(&self) -> f64 {
        if self.prev_price == 0.0 {
            return 0.0;
        }
        round_to((self.price - self.prev_price) / self.prev_price * 100.0, 2)
    }

    /// Upside target at two ATRs.
    pub fn target_price(&self) -> f64 {
        (self.price + self.atr * 2.0).round()
    }

    /// Stop at one and a half ATRs.
    pub fn stop_loss(&self) -> f64 {
        (self.price - self.atr * 1.5).round()
    }

    /// Style tag derived from the unadjusted factors.
    pub fn style_tag(&self) -> &'static str {
        if self.raw.stability > 8.0 {
            "Value"
        } else if self.rsi < 40.0 {
            "TechnicalRebound"
        } else {
            "Momentum"
        }
    }

    /// Indicator digest for the candidate summary.
    pub fn summary(&self) -> String {
        format!(
            "RSI {:.1}, MACD {:.2}, MDD {:.1}%",
            self.rsi,
            self.macd,
            self.mdd.abs() * 100.0
        )
    }
}

pub fn ma_score(sma_fast: f64, sma_slow: f64) -> f64 {
    if sma_fast > sma_slow {
        10.0
    } else {
        4.0
    }
}

pub fn rsi_score(rsi: f64) -> f64 {
    if (40.0..=70.0).contains(&rsi) {
        10.0
    } else if rsi > 70.0 {
        5.0
    } else {
        8.0
    }
}

pub fn macd_score(macd: f64) -> f64 {
    if macd > 0.0 {
        10.0
    } else {
        5.0
    }
}

pub fn return_score(sma_fast: f64, sma_slow: f64, rsi: f64, macd: f64) -> f64 {
    let raw = ma_score(sma_fast, sma_slow) * 0.4 + rsi_score(rsi) * 0.3 + macd_score(macd) * 0.3;
    clamp_score(round_to(raw, 1))
}

/// `mdd` is a fraction (−0.12 for a 12% drawdown); `volatility` is annualized.
/// A missing (non-finite) volatility scores 0.
pub fn stability_score(mdd: f64, volatility: f64) -> f64 {
    let mdd_score = (10.0 - mdd.abs() * 100.0 / 3.0).max(0.0);
    let vol_score = if volatility.is_finite() {
        (10.0 - volatility * 10.0).max(0.0)
    } else {
        0.0
    };
    clamp_score(round_to(mdd_score * 0.6 + vol_score * 0.4, 1))
}

/// Liquidity score on a log10 scale so mega-caps do not saturate.
pub fn market_score(avg_volume: f64) -> f64 {
    let log_volume = avg_volume.max(1.0).log10();
    let raw = 1.0 + ((log_volume - 4.5) / 3.0) * 9.0;
    clamp_score(round_to(raw, 1))
}

/// The fixed indicator set behind the three factors.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    sma_fast: Sma,
    sma_slow: Sma,
    rsi: Rsi,
    macd: Macd,
    atr: Atr,
    drawdown: Drawdown,
    volatility: Volatility,
    avg_volume: Sma,
    high: Channel,
    low: Channel,
    min_history: usize,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self {
            sma_fast: Sma::new(5),
            sma_slow: Sma::new(20),
            rsi: Rsi::new(14),
            macd: Macd::new(12, 26),
            atr: Atr::new(14),
            drawdown: Drawdown::new(60),
            volatility: Volatility::new(60),
            avg_volume: Sma::of_volume(20),
            high: Channel::new(60, ChannelBand::Upper),
            low: Channel::new(10, ChannelBand::Lower),
            min_history: MIN_HISTORY_BARS,
        }
    }
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_history(mut self, min_history: usize) -> Self {
        self.min_history = min_history;
        self
    }

    pub fn min_history(&self) -> usize {
        self.min_history
    }

    /// Score a daily history ending at the signal date.
    pub fn evaluate(&self, bars: &[PriceBar]) -> Result<FactorSnapshot, FactorError> {
        if bars.is_empty() || bars.len() < self.min_history {
            return Err(FactorError::InsufficientHistory {
                len: bars.len(),
                required: self.min_history.max(1),
            });
        }

        let price = bars[bars.len() - 1].close;
        let prev_price = if bars.len() > 1 {
            bars[bars.len() - 2].close
        } else {
            price
        };

        let sma_fast = self.sma_fast.last(bars);
        let sma_slow = self.sma_slow.last(bars);
        let rsi = finite_or(self.rsi.last(bars), NEUTRAL_RSI);
        let macd = finite_or(self.macd.last(bars), 0.0);
        let mdd = self.drawdown.max_drawdown(bars);
        let volatility = self.volatility.last(bars);
        let avg_volume_20 = finite_or(self.avg_volume.last(bars), 0.0);
        let atr = finite_or(self.atr.last(bars), price * ATR_FALLBACK_FRACTION);

        let raw = FactorScore::new(
            return_score(sma_fast, sma_slow, rsi, macd),
            stability_score(mdd, volatility),
            market_score(avg_volume_20),
        );

        Ok(FactorSnapshot {
            raw,
            sma_fast,
            sma_slow,
            rsi,
            macd,
            mdd,
            volatility: volatility.is_finite().then_some(volatility),
            avg_volume_20,
            atr,
            price,
            prev_price,
            high60: self.high.last(bars),
            low10: self.low.last(bars),
        })
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
