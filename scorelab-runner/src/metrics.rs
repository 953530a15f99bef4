//! Return-series metrics: pure functions over per-session net returns.
//!
//! Returns are in percent (1.5 means +1.5%). Every function is total: empty
//! or degenerate input yields 0.0 rather than NaN.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use scorelab_core::domain::{round_to, PriceBar};

/// Trading sessions per year used to annualize Sharpe.
pub const SESSIONS_PER_YEAR: f64 = 252.0;

/// Standard deviations at or below this are treated as zero.
const STD_EPSILON: f64 = 1e-9;

/// Summary of one net-return sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnMetrics {
    pub net_sharpe: f64,
    /// Worst peak-to-trough of the compounded equity curve, in percent (≤ 0).
    pub max_drawdown: f64,
    /// Percent of sessions with a positive return.
    pub hit_rate: f64,
    /// Percent of consecutive sessions whose pick changed.
    pub turnover: f64,
    pub sample_size: usize,
}

impl ReturnMetrics {
    /// Compute all metrics. `switches` is the number of pick changes behind
    /// `returns`.
    pub fn compute(returns: &[f64], switches: usize) -> Self {
        if returns.is_empty() {
            return Self::default();
        }
        Self {
            net_sharpe: round_to(sharpe_ratio(returns), 4),
            max_drawdown: round_to(max_drawdown_pct(returns), 4),
            hit_rate: round_to(hit_rate(returns), 2),
            turnover: round_to(turnover_pct(switches, returns.len()), 2),
            sample_size: returns.len(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Annualized Sharpe-like ratio: mean / sample stdev × √252.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    let sd = std_dev(returns);
    if sd <= STD_EPSILON {
        return 0.0;
    }
    mean(returns) / sd * SESSIONS_PER_YEAR.sqrt()
}

/// Maximum drawdown of the equity curve compounded from percent returns.
pub fn max_drawdown_pct(returns: &[f64]) -> f64 {
    let mut equity = 1.0;
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for r in returns {
        equity *= 1.0 + r / 100.0;
        peak = peak.max(equity);
        let dd = equity / peak.max(1e-12) - 1.0;
        worst = worst.min(dd);
    }
    worst * 100.0
}

pub fn hit_rate(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let wins = returns.iter().filter(|r| **r > 0.0).count();
    wins as f64 / returns.len() as f64 * 100.0
}

/// Pick switches as a percent of the `n - 1` session transitions.
pub fn turnover_pct(switches: usize, n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    switches as f64 / (n - 1) as f64 * 100.0
}

/// Number of positions where a pick differs from the one before it.
pub fn count_switches<S: AsRef<str>>(picks: &[S]) -> usize {
    picks
        .windows(2)
        .filter(|w| w[0].as_ref() != w[1].as_ref())
        .count()
}

/// Next-session return in percent: enter at the first close on or after
/// `date`, exit at the following close.
pub fn forward_return_pct(bars: &[PriceBar], date: NaiveDate) -> Option<f64> {
    let entry = bars.iter().position(|b| b.date() >= date)?;
    let exit = bars.get(entry + 1)?;
    let entry_price = bars[entry].close;
    if entry_price == 0.0 || !entry_price.is_finite() || !exit.close.is_finite() {
        return None;
    }
    Some((exit.close - entry_price) / entry_price * 100.0)
}

// ─── Helpers ────────────────────────────────────────────────────────

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1); 0.0 below two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
