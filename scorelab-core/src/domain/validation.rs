//! Gate tokens and the validation block carried by annotated candidates.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::strategy::ParseError;

/// How a failed validation gate affects served candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Gate always passes.
    Off,
    /// Gate is evaluated and reported only.
    Observe,
    /// Non-pass applies a score penalty.
    #[default]
    Soft,
    /// Non-pass is a failure.
    Hard,
}

impl GateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateMode::Off => "off",
            GateMode::Observe => "observe",
            GateMode::Soft => "soft",
            GateMode::Hard => "hard",
        }
    }
}

impl fmt::Display for GateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(GateMode::Off),
            "observe" => Ok(GateMode::Observe),
            "soft" => Ok(GateMode::Soft),
            "hard" => Ok(GateMode::Hard),
            _ => Err(ParseError::new("gate mode", s, "off, observe, soft, hard")),
        }
    }
}

/// Outcome of the validation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Pass,
    Warn,
    Fail,
}

impl GateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStatus::Pass => "pass",
            GateStatus::Warn => "warn",
            GateStatus::Fail => "fail",
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation outcome copied onto every candidate of an annotated response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationAnnotation {
    pub gate_passed: bool,
    pub gate_status: GateStatus,
    pub insufficient_data: bool,
    pub pbo: f64,
    pub dsr: f64,
    pub net_sharpe: f64,
    pub as_of_date: NaiveDate,
    pub mode: GateMode,
}
