//! Strategy Adapter: turns raw factors into strategy-adjusted factors.
//!
//! Each strategy kind has its own branch:
//! - **close** uses the raw factors as-is.
//! - **premarket** blends headline sentiment into `return` and the overnight
//!   index proxy into `market` ([`premarket`]).
//! - **intraday** blends opening-range, VWAP and relative-volume signals,
//!   from the session's daily bar or from 5-minute bars ([`intraday`]).
//!
//! Every branch finishes the same way: `weighted = raw × weights` (three
//! decimals per component) and `total = round(Σ weighted, 1)`.

pub mod intraday;
pub mod premarket;

use crate::domain::{round_to, FactorScore, FactorWeights, SignalDetail};

pub use intraday::{
    apply_intraday, bar_signals, load_bar_signals, previous_close, proxy_signals, BarSignals,
    ProxySignals, SessionQuote,
};
pub use premarket::{
    apply_premarket, overnight_changes, overnight_proxy_score, select_headlines,
    sentiment_score, NewsWindow, OVERNIGHT_BASKET,
};

/// Result of running one instrument through a strategy branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    /// Strategy-adjusted factors, each in [1, 10].
    pub raw: FactorScore,
    pub weighted: FactorScore,
    /// `Σ weighted`, one decimal.
    pub total: f64,
    pub signals: Option<SignalDetail>,
}

impl Adjustment {
    pub fn finalize(raw: FactorScore, weights: &FactorWeights, signals: Option<SignalDetail>) -> Self {
        let raw = raw.clamped();
        let weighted = raw.weighted(weights);
        Self {
            raw,
            weighted,
            total: round_to(weighted.sum(), 1),
            signals,
        }
    }
}

/// End-of-day branch: no auxiliary signals.
pub fn apply_close(raw: FactorScore, weights: &FactorWeights) -> Adjustment {
    Adjustment::finalize(raw, weights, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_total_is_weighted_sum() {
        let adj = apply_close(FactorScore::new(8.0, 6.0, 4.0), &FactorWeights::default());
        assert_eq!(adj.raw, FactorScore::new(8.0, 6.0, 4.0));
        assert_eq!(adj.total, 6.2);
        assert!(adj.signals.is_none());
    }

    #[test]
    fn close_respects_custom_weights() {
        let w = FactorWeights::normalize(1.0, 0.0, 0.0).unwrap();
        let adj = apply_close(FactorScore::new(7.3, 2.0, 9.0), &w);
        assert_eq!(adj.weighted.stability, 0.0);
        assert_eq!(adj.total, 7.3);
    }

    #[test]
    fn out_of_range_raw_is_clamped() {
        let adj = apply_close(FactorScore::new(12.0, 0.2, 5.0), &FactorWeights::default());
        assert_eq!(adj.raw.ret, 10.0);
        assert_eq!(adj.raw.stability, 1.0);
    }
}
