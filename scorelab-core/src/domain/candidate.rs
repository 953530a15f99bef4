//! Candidate: one ranked instrument in a scoring response.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::factor::FactorScore;
use super::strategy::{IntradayBranch, StrategyKind};
use super::validation::ValidationAnnotation;

/// Liquidity size bucket used as the second diversification axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeBucket {
    Mega,
    Large,
    Mid,
}

impl SizeBucket {
    pub const MEGA_MIN_AVG_VOLUME: f64 = 8_000_000.0;
    pub const LARGE_MIN_AVG_VOLUME: f64 = 2_500_000.0;

    /// Bucket inferred from 20-day average volume.
    pub fn from_avg_volume(avg_volume: f64) -> Self {
        if avg_volume >= Self::MEGA_MIN_AVG_VOLUME {
            SizeBucket::Mega
        } else if avg_volume >= Self::LARGE_MIN_AVG_VOLUME {
            SizeBucket::Large
        } else {
            SizeBucket::Mid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeBucket::Mega => "mega",
            SizeBucket::Large => "large",
            SizeBucket::Mid => "mid",
        }
    }
}

// ─── Strategy signal blocks ──────────────────────────────────────────

/// Audit trail of the premarket blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremarketSignals {
    pub news_sentiment: f64,
    pub overnight_proxy: f64,
    pub news_window_start: NaiveDateTime,
    pub news_window_end: NaiveDateTime,
    pub used_primary_window: bool,
    pub analyzed_news_count: usize,
}

/// How the intraday signal block was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntradaySignalMode {
    #[serde(rename = "bars-phase2")]
    BarsPhase2,
    #[serde(rename = "proxy")]
    Proxy,
    /// Bars were requested for phase2 but none were usable.
    #[serde(rename = "proxy-fallback")]
    ProxyFallback,
    #[serde(rename = "proxy-baseline")]
    ProxyBaseline,
}

impl IntradaySignalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntradaySignalMode::BarsPhase2 => "bars-phase2",
            IntradaySignalMode::Proxy => "proxy",
            IntradaySignalMode::ProxyFallback => "proxy-fallback",
            IntradaySignalMode::ProxyBaseline => "proxy-baseline",
        }
    }
}

/// Components only available when 5-minute bars were used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarSignalDetail {
    pub orb_high: f64,
    pub orb_low: f64,
    pub vwap_price: f64,
    pub in_play_score: f64,
    pub intraday_momentum_score: f64,
    pub overnight_reversal_score: f64,
    pub rvol_profile_ratio: f64,
    pub overnight_return_pct: f64,
    pub intraday_return_pct: f64,
}

/// Audit trail of the intraday blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntradaySignals {
    pub mode: IntradaySignalMode,
    pub signal_branch: IntradayBranch,
    pub orb_score: f64,
    pub vwap_score: f64,
    pub rvol_score: f64,
    pub open_price: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub vwap_proxy_price: f64,
    pub rvol_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bars: Option<BarSignalDetail>,
}

/// Strategy-specific signal block attached to a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SignalDetail {
    Premarket(PremarketSignals),
    Intraday(IntradaySignals),
}

impl SignalDetail {
    /// Short prefix for the candidate summary line.
    pub fn digest(&self) -> String {
        match self {
            SignalDetail::Premarket(p) => format!(
                "Premarket blend (news={:.1}, overnight={:.1}).",
                p.news_sentiment, p.overnight_proxy
            ),
            SignalDetail::Intraday(i) => format!(
                "Intraday blend (ORB={:.1}, VWAP={:.1}, RVOL={:.1}, branch={}, mode={}).",
                i.orb_score,
                i.vwap_score,
                i.rvol_score,
                i.signal_branch,
                i.mode.as_str()
            ),
        }
    }
}

// ─── Candidate ───────────────────────────────────────────────────────

/// One scored instrument.
///
/// `raw` holds strategy-adjusted factors in [1, 10]; `weighted` is `raw`
/// times the normalized weights and `score` is their sum at one decimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub code: String,
    pub name: String,
    pub sector: String,
    pub size_bucket: SizeBucket,
    pub strategy: StrategyKind,
    pub session_date: NaiveDate,
    pub signal_date: NaiveDate,
    pub score: f64,
    pub rank: usize,
    pub raw: FactorScore,
    pub weighted: FactorScore,
    pub price: f64,
    pub change_rate: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub high60: f64,
    pub low10: f64,
    pub tags: Vec<String>,
    pub summary: String,
    #[serde(default)]
    pub sparkline60: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<SignalDetail>,
    pub balance_deferred: bool,
    pub exposure_deferred: bool,
    pub strong_recommendation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationAnnotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_penalty: Option<f64>,
}

impl Candidate {
    /// Ranks at or above this are flagged as strong recommendations.
    pub const STRONG_RANK: usize = 5;

    /// Bare close-strategy candidate with an empty payload.
    pub fn new(code: &str, name: &str, sector: &str, size_bucket: SizeBucket, score: f64) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            sector: sector.to_string(),
            size_bucket,
            strategy: StrategyKind::Close,
            session_date: NaiveDate::default(),
            signal_date: NaiveDate::default(),
            score,
            rank: 0,
            raw: FactorScore::new(0.0, 0.0, 0.0),
            weighted: FactorScore::new(0.0, 0.0, 0.0),
            price: 0.0,
            change_rate: 0.0,
            target_price: 0.0,
            stop_loss: 0.0,
            high60: 0.0,
            low10: 0.0,
            tags: Vec::new(),
            summary: String::new(),
            sparkline60: Vec::new(),
            signals: None,
            balance_deferred: false,
            exposure_deferred: false,
            strong_recommendation: false,
            validation: None,
            validation_penalty: None,
        }
    }

    pub fn with_change_rate(mut self, change_rate: f64) -> Self {
        self.change_rate = change_rate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_bucket_thresholds() {
        assert_eq!(SizeBucket::from_avg_volume(9_000_000.0), SizeBucket::Mega);
        assert_eq!(SizeBucket::from_avg_volume(8_000_000.0), SizeBucket::Mega);
        assert_eq!(SizeBucket::from_avg_volume(2_500_000.0), SizeBucket::Large);
        assert_eq!(SizeBucket::from_avg_volume(2_499_999.0), SizeBucket::Mid);
    }

    #[test]
    fn signal_mode_serializes_with_dashes() {
        let json = serde_json::to_string(&IntradaySignalMode::ProxyFallback).unwrap();
        assert_eq!(json, "\"proxy-fallback\"");
    }
}
