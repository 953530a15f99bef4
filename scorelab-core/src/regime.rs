//! Regime Detector: market breadth and index momentum → regime + weights.
//!
//! ```text
//! breadth    = (up − down) / total
//! indexAvg   = mean(index % changes)
//! dispersion = population stdev(candidate % changes)
//! confidence = clamp(45 + |breadth|·35 + |indexAvg|·6 − dispersion·2, 25, 95)
//! ```

use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{change_pct, round_to, Candidate, FactorWeights, Interval, PriceBar};
use crate::provider::MarketData;

/// Reference indices for regime detection: (symbol, display name).
pub const REFERENCE_INDICES: [(&str, &str); 3] =
    [("^KS11", "KOSPI"), ("^KQ11", "KOSDAQ"), ("^GSPC", "S&P 500")];

const INDEX_LOOKBACK_DAYS: i64 = 6;

const BREADTH_THRESHOLD: f64 = 0.2;
const INDEX_THRESHOLD: f64 = 0.25;
const EMPTY_CONFIDENCE: f64 = 35.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Bull,
    Bear,
    Sideways,
}

impl Regime {
    pub fn label(&self) -> &'static str {
        match self {
            Regime::Bull => "Bull",
            Regime::Bear => "Bear",
            Regime::Sideways => "Sideways",
        }
    }

    /// Bull favors return, bear favors stability, sideways leans stability.
    pub fn suggested_weights(&self) -> FactorWeights {
        let (ret, stability, market) = match self {
            Regime::Bull => (0.55, 0.2, 0.25),
            Regime::Sideways => (0.35, 0.4, 0.25),
            Regime::Bear => (0.2, 0.6, 0.2),
        };
        FactorWeights {
            ret,
            stability,
            market,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            Regime::Bull => "Positive breadth and index momentum are both strong.",
            Regime::Bear => "Negative breadth and index momentum are both weak.",
            Regime::Sideways => "Breadth and index momentum are mixed.",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Last-session move of a reference index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexChange {
    pub symbol: String,
    pub name: String,
    pub value: f64,
    /// Percent, two decimals.
    pub change_rate: f64,
}

impl IndexChange {
    pub fn new(symbol: &str, name: &str, value: f64, change_rate: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            value,
            change_rate,
        }
    }

    fn from_bars(symbol: &str, name: &str, bars: &[PriceBar]) -> Option<Self> {
        let [.., prev, last] = bars else {
            return None;
        };
        let change = change_pct(prev.close, last.close)?;
        Some(Self::new(symbol, name, round_to(last.close, 2), round_to(change, 2)))
    }
}

/// Changes of [`REFERENCE_INDICES`] as of `date`, skipping indices without
/// two closes in the preceding week.
pub fn reference_index_changes(market: &dyn MarketData, date: NaiveDate) -> Vec<IndexChange> {
    let start = date - Duration::days(INDEX_LOOKBACK_DAYS);
    REFERENCE_INDICES
        .iter()
        .filter_map(|&(symbol, name)| {
            match market.fetch_history(symbol, start, date, Interval::Daily) {
                Ok(bars) => IndexChange::from_bars(symbol, name, &bars),
                Err(e) => {
                    debug!(symbol, error = %e, "reference index unavailable");
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegimeAssessment {
    pub regime: Regime,
    pub label: String,
    /// In [25, 95], one decimal.
    pub confidence: f64,
    pub suggested_weights: FactorWeights,
    pub reason: String,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn population_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

pub fn detect_regime(candidates: &[Candidate], indices: &[IndexChange]) -> RegimeAssessment {
    if candidates.is_empty() {
        return RegimeAssessment {
            regime: Regime::Sideways,
            label: Regime::Sideways.label().to_string(),
            confidence: EMPTY_CONFIDENCE,
            suggested_weights: FactorWeights::default(),
            reason: "Insufficient breadth data, fallback to default weights.".to_string(),
        };
    }

    let changes: Vec<f64> = candidates.iter().map(|c| c.change_rate).collect();
    let up = changes.iter().filter(|&&c| c > 0.0).count() as f64;
    let down = changes.iter().filter(|&&c| c < 0.0).count() as f64;
    let breadth = (up - down) / changes.len() as f64;
    let index_avg = mean(&indices.iter().map(|i| i.change_rate).collect::<Vec<_>>());
    let dispersion = population_std(&changes);

    let regime = if breadth >= BREADTH_THRESHOLD && index_avg >= INDEX_THRESHOLD {
        Regime::Bull
    } else if breadth <= -BREADTH_THRESHOLD && index_avg <= -INDEX_THRESHOLD {
        Regime::Bear
    } else {
        Regime::Sideways
    };

    let raw = 45.0 + breadth.abs() * 35.0 + index_avg.abs() * 6.0 - dispersion * 2.0;
    RegimeAssessment {
        regime,
        label: regime.label().to_string(),
        confidence: round_to(raw.clamp(25.0, 95.0), 1),
        suggested_weights: regime.suggested_weights(),
        reason: regime.reason().to_string(),
    }
}

// ─── Market overview ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketWarning {
    #[serde(rename = "type")]
    pub level: WarningLevel,
    pub message: String,
}

/// Up/steady/down counts, risk warnings and the regime for a candidate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOverview {
    pub up: usize,
    pub steady: usize,
    pub down: usize,
    pub warnings: Vec<MarketWarning>,
    pub indices: Vec<IndexChange>,
    pub regime_recommendation: RegimeAssessment,
}

pub fn market_overview(candidates: &[Candidate], indices: Vec<IndexChange>) -> MarketOverview {
    let up = candidates.iter().filter(|c| c.change_rate > 0.0).count();
    let down = candidates.iter().filter(|c| c.change_rate < 0.0).count();
    let steady = candidates.len() - up - down;

    let mut warnings = Vec::new();
    if down as f64 > (up + steady) as f64 * 1.5 {
        warnings.push(MarketWarning {
            level: WarningLevel::Error,
            message: "Broad downside pressure detected; keep entries conservative.".to_string(),
        });
    } else if down > up {
        warnings.push(MarketWarning {
            level: WarningLevel::Warning,
            message: "Risk control is advised; consider staggered exits.".to_string(),
        });
    }

    let regime_recommendation = detect_regime(candidates, &indices);
    MarketOverview {
        up,
        steady,
        down,
        warnings,
        indices,
        regime_recommendation,
    }
}
