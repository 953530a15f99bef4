//! Strategy tokens and the per-request strategy context.
//!
//! Every token the outside world can send (strategy kind, intraday branch,
//! intraday mode) is a closed enum parsed once via `FromStr`. Nothing past the
//! boundary compares strings.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected token at the parsing boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field} '{value}' (expected one of: {expected})")]
pub struct ParseError {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl ParseError {
    pub fn new(field: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            field,
            value: value.to_string(),
            expected,
        }
    }
}

// ─── Strategy kind ───────────────────────────────────────────────────

/// Which scoring branch a request runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// End-of-day scoring on the latest completed session.
    Close,
    /// Pre-open scoring: prior session history plus news and overnight proxy.
    Premarket,
    /// In-session scoring with opening-range, VWAP and relative-volume signals.
    Intraday,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Premarket,
        StrategyKind::Close,
        StrategyKind::Intraday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Close => "close",
            StrategyKind::Premarket => "premarket",
            StrategyKind::Intraday => "intraday",
        }
    }

    /// Tag prepended to candidate tags, if the strategy has one.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            StrategyKind::Close => None,
            StrategyKind::Premarket => Some("PREMARKET"),
            StrategyKind::Intraday => Some("INTRADAY"),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "close" => Ok(StrategyKind::Close),
            "premarket" => Ok(StrategyKind::Premarket),
            "intraday" => Ok(StrategyKind::Intraday),
            _ => Err(ParseError::new("strategy", s, "close, premarket, intraday")),
        }
    }
}

// ─── Intraday branch / mode ──────────────────────────────────────────

/// Intraday signal variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntradayBranch {
    Baseline,
    #[default]
    Phase2,
}

impl IntradayBranch {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntradayBranch::Baseline => "baseline",
            IntradayBranch::Phase2 => "phase2",
        }
    }
}

impl fmt::Display for IntradayBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntradayBranch {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" => Ok(IntradayBranch::Baseline),
            "phase2" => Ok(IntradayBranch::Phase2),
            _ => Err(ParseError::new("intraday branch", s, "baseline, phase2")),
        }
    }
}

/// Where intraday signals come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntradayMode {
    /// Derive signals from the session's daily OHLCV.
    #[default]
    Proxy,
    /// Recompute signals from 5-minute bars (phase2 only).
    Bars,
}

impl IntradayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntradayMode::Proxy => "proxy",
            IntradayMode::Bars => "bars",
        }
    }
}

impl fmt::Display for IntradayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntradayMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proxy" => Ok(IntradayMode::Proxy),
            "bars" => Ok(IntradayMode::Bars),
            _ => Err(ParseError::new("intraday mode", s, "proxy, bars")),
        }
    }
}

// ─── Context ─────────────────────────────────────────────────────────

/// Everything a scoring request needs to know about *when* it is scoring.
///
/// `signal_date` is the session whose price history grounds the score. It
/// equals `session_date` for close and intraday, and the prior trading date
/// for premarket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyContext {
    pub kind: StrategyKind,
    pub session_date: NaiveDate,
    pub signal_date: NaiveDate,
    pub branch: IntradayBranch,
}

impl StrategyContext {
    /// Close or intraday context where signal and session coincide.
    pub fn same_day(kind: StrategyKind, date: NaiveDate) -> Self {
        Self {
            kind,
            session_date: date,
            signal_date: date,
            branch: IntradayBranch::default(),
        }
    }

    pub fn premarket(session_date: NaiveDate, signal_date: NaiveDate) -> Self {
        Self {
            kind: StrategyKind::Premarket,
            session_date,
            signal_date,
            branch: IntradayBranch::default(),
        }
    }

    pub fn with_branch(mut self, branch: IntradayBranch) -> Self {
        self.branch = branch;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_kind_parses_case_insensitively() {
        assert_eq!("Close".parse::<StrategyKind>().unwrap(), StrategyKind::Close);
        assert_eq!(" intraday ".parse::<StrategyKind>().unwrap(), StrategyKind::Intraday);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = "swing".parse::<StrategyKind>().unwrap_err();
        assert_eq!(err.field, "strategy");
        assert!(err.to_string().contains("swing"));
    }

    #[test]
    fn unknown_branch_is_rejected() {
        assert!("phase3".parse::<IntradayBranch>().is_err());
        assert_eq!("PHASE2".parse::<IntradayBranch>().unwrap(), IntradayBranch::Phase2);
    }

    #[test]
    fn serde_uses_lowercase_tokens() {
        let json = serde_json::to_string(&StrategyKind::Premarket).unwrap();
        assert_eq!(json, "\"premarket\"");
        let mode: IntradayMode = serde_json::from_str("\"bars\"").unwrap();
        assert_eq!(mode, IntradayMode::Bars);
    }

    #[test]
    fn tags_only_for_adjusted_strategies() {
        assert_eq!(StrategyKind::Close.tag(), None);
        assert_eq!(StrategyKind::Premarket.tag(), Some("PREMARKET"));
        assert_eq!(StrategyKind::Intraday.tag(), Some("INTRADAY"));
    }
}
