//! Factor scores and factor weights.
//!
//! Every factor lives on a 1..10 scale. Weights are normalized once at the
//! boundary: negative components and non-positive totals are rejected there,
//! so everything downstream can assume `return + stability + market == 1`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SCORE_MIN: f64 = 1.0;
pub const SCORE_MAX: f64 = 10.0;

/// Clamp a factor value to [1, 10] and round to three decimals.
///
/// Non-finite input clamps to the floor.
pub fn clamp_score(value: f64) -> f64 {
    if !value.is_finite() {
        return SCORE_MIN;
    }
    round_to(value.clamp(SCORE_MIN, SCORE_MAX), 3)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// The three factor components of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    #[serde(rename = "return")]
    pub ret: f64,
    pub stability: f64,
    pub market: f64,
}

impl FactorScore {
    pub fn new(ret: f64, stability: f64, market: f64) -> Self {
        Self {
            ret,
            stability,
            market,
        }
    }

    /// Same components, each clamped to [1, 10].
    pub fn clamped(self) -> Self {
        Self::new(
            clamp_score(self.ret),
            clamp_score(self.stability),
            clamp_score(self.market),
        )
    }

    /// Component-wise product with normalized weights, rounded to three decimals.
    pub fn weighted(&self, weights: &FactorWeights) -> FactorScore {
        FactorScore::new(
            round_to(self.ret * weights.ret, 3),
            round_to(self.stability * weights.stability, 3),
            round_to(self.market * weights.market, 3),
        )
    }

    pub fn sum(&self) -> f64 {
        self.ret + self.stability + self.market
    }

    /// One-decimal rendition used in reports and payloads.
    pub fn rounded(&self) -> FactorScore {
        FactorScore::new(
            round_to(self.ret, 1),
            round_to(self.stability, 1),
            round_to(self.market, 1),
        )
    }
}

/// Rejection reasons at the weight normalization boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightError {
    #[error("factor weight '{component}' must not be negative (got {value})")]
    Negative { component: &'static str, value: f64 },
    #[error("factor weight '{component}' must be finite (got {value})")]
    NonFinite { component: &'static str, value: f64 },
    #[error("factor weights must sum to a positive total (got {total})")]
    NonPositiveTotal { total: f64 },
}

/// Normalized factor weights. Construct through [`FactorWeights::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    #[serde(rename = "return")]
    pub ret: f64,
    pub stability: f64,
    pub market: f64,
}

impl Default for FactorWeights {
    /// 0.4 return / 0.3 stability / 0.3 market.
    fn default() -> Self {
        Self {
            ret: 0.4,
            stability: 0.3,
            market: 0.3,
        }
    }
}

impl FactorWeights {
    /// Validate a raw weight triple and scale it to sum to 1.
    pub fn normalize(ret: f64, stability: f64, market: f64) -> Result<Self, WeightError> {
        for (component, value) in [("return", ret), ("stability", stability), ("market", market)] {
            if !value.is_finite() {
                return Err(WeightError::NonFinite { component, value });
            }
            if value < 0.0 {
                return Err(WeightError::Negative { component, value });
            }
        }
        let total = ret + stability + market;
        if total <= 0.0 {
            return Err(WeightError::NonPositiveTotal { total });
        }
        Ok(Self {
            ret: ret / total,
            stability: stability / total,
            market: market / total,
        })
    }

    /// Normalize with per-component fallback to the defaults.
    pub fn from_partial(
        ret: Option<f64>,
        stability: Option<f64>,
        market: Option<f64>,
    ) -> Result<Self, WeightError> {
        let d = Self::default();
        Self::normalize(
            ret.unwrap_or(d.ret),
            stability.unwrap_or(d.stability),
            market.unwrap_or(d.market),
        )
    }

    pub fn sum(&self) -> f64 {
        self.ret + self.stability + self.market
    }
}

/// Caller-supplied weights before normalization. Missing components take the
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawWeights {
    #[serde(rename = "return", default, skip_serializing_if = "Option::is_none")]
    pub ret: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<f64>,
}

impl RawWeights {
    pub fn new(ret: f64, stability: f64, market: f64) -> Self {
        Self {
            ret: Some(ret),
            stability: Some(stability),
            market: Some(market),
        }
    }

    pub fn normalize(&self) -> Result<FactorWeights, WeightError> {
        FactorWeights::from_partial(self.ret, self.stability, self.market)
    }
}

impl From<FactorWeights> for RawWeights {
    fn from(w: FactorWeights) -> Self {
        Self::new(w.ret, w.stability, w.market)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_weights_fill_missing_components() {
        let raw = RawWeights {
            ret: Some(0.4),
            stability: None,
            market: Some(0.0),
        };
        let w = raw.normalize().unwrap();
        assert!((w.ret - 0.4 / 0.7).abs() < 1e-12);
        assert!((w.market).abs() < 1e-12);
    }

    #[test]
    fn normalize_scales_to_unit_sum() {
        let w = FactorWeights::normalize(2.0, 1.0, 1.0).unwrap();
        assert!((w.ret - 0.5).abs() < 1e-12);
        assert!((w.stability - 0.25).abs() < 1e-12);
        assert!((w.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_rejects_negative_component() {
        let err = FactorWeights::normalize(0.5, -0.1, 0.6).unwrap_err();
        assert!(matches!(err, WeightError::Negative { component: "stability", .. }));
    }

    #[test]
    fn normalize_rejects_all_zero() {
        let err = FactorWeights::normalize(0.0, 0.0, 0.0).unwrap_err();
        assert_eq!(err, WeightError::NonPositiveTotal { total: 0.0 });
    }

    #[test]
    fn normalize_rejects_nan() {
        assert!(FactorWeights::normalize(f64::NAN, 1.0, 1.0).is_err());
    }

    #[test]
    fn partial_weights_fall_back_to_defaults() {
        let w = FactorWeights::from_partial(None, None, None).unwrap();
        assert_eq!(w, FactorWeights::default());
    }

    #[test]
    fn clamp_score_bounds_and_rounds() {
        assert_eq!(clamp_score(12.0), 10.0);
        assert_eq!(clamp_score(-3.0), 1.0);
        assert_eq!(clamp_score(5.12345), 5.123);
        assert_eq!(clamp_score(f64::NAN), 1.0);
    }

    #[test]
    fn weighted_sum_matches_manual() {
        let raw = FactorScore::new(8.0, 6.0, 4.0);
        let w = FactorWeights::default();
        let weighted = raw.weighted(&w);
        assert!((weighted.ret - 3.2).abs() < 1e-12);
        assert!((weighted.stability - 1.8).abs() < 1e-12);
        assert!((weighted.market - 1.2).abs() < 1e-12);
        assert!((weighted.sum() - 6.2).abs() < 1e-9);
    }
}
