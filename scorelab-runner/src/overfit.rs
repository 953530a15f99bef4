//! Overfitting statistics: PBO over walk-forward windows and the deflated
//! Sharpe ratio of the aggregate out-of-sample sample.

use scorelab_core::domain::round_to;

use crate::metrics::{sharpe_ratio, std_dev};

/// Test Sharpe below this fraction of train Sharpe marks a window overfit.
pub const DEGRADATION_FLOOR: f64 = 0.5;

/// Probability of backtest overfitting over `(train_sharpe, test_sharpe)`
/// pairs, rounded to 4 decimals.
///
/// A window is overfit when its test Sharpe is negative or below half its
/// train Sharpe. Pairs with a non-finite side are not usable; with no usable
/// window the result is 1.0.
pub fn compute_pbo(windows: &[(f64, f64)]) -> f64 {
    let usable: Vec<(f64, f64)> = windows
        .iter()
        .copied()
        .filter(|(train, test)| train.is_finite() && test.is_finite())
        .collect();
    if usable.is_empty() {
        return 1.0;
    }
    let overfit = usable
        .iter()
        .filter(|&&(train, test)| test < 0.0 || test < train * DEGRADATION_FLOOR)
        .count();
    round_to(overfit as f64 / usable.len() as f64, 4)
}

/// Sharpe minus the expected maximum from `trials` tries:
/// `sharpe − sqrt(2·ln(trials) / n)`, rounded to 4 decimals.
///
/// Zero for fewer than two returns or a flat sample.
pub fn deflated_sharpe(returns: &[f64], trials: usize) -> f64 {
    if returns.len() < 2 || std_dev(returns) <= 1e-9 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let trials = trials.max(1) as f64;
    let penalty = (2.0 * trials.ln() / n).max(0.0).sqrt();
    round_to(sharpe_ratio(returns) - penalty, 4)
}
