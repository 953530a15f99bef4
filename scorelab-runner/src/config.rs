//! Validation configuration and per-call overrides.
//!
//! `ValidationConfig` is the TOML-loaded baseline. `ValidationParams` carries
//! the overrides of a single validation call; [`ValidationParams::resolve`]
//! merges them over the config into the concrete [`Protocol`] and
//! [`GateThresholds`] a run uses.
//!
//! ```toml
//! [protocol]
//! train_months = 6
//! embargo_sessions = 2
//!
//! [gate]
//! mode = "hard"
//! enabled_strategies = ["intraday", "close"]
//!
//! [monitoring]
//! log_path = "/var/log/scorelab/validation.jsonl"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use scorelab_core::config::read_file;
use scorelab_core::domain::{GateMode, IntradayBranch, ParseError, RawWeights, StrategyKind};
use scorelab_core::ConfigError;

use crate::gate::GateThresholds;
use crate::monitor::AlertThresholds;

// ─── Sections ────────────────────────────────────────────────────────

/// Walk-forward protocol defaults. Session counts derive from months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub train_months: usize,
    pub test_months: usize,
    pub trading_days_per_month: usize,
    pub embargo_sessions: usize,
    pub max_windows: usize,
    /// Calendar days of sessions considered, ending at the as-of date.
    pub lookback_days: i64,
    pub cost_bps: f64,
    /// When false, `cost_bps` is one-way and charged twice.
    pub cost_is_round_trip: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            train_months: 6,
            test_months: 1,
            trading_days_per_month: 21,
            embargo_sessions: 1,
            max_windows: 2,
            lookback_days: 420,
            cost_bps: 20.0,
            cost_is_round_trip: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub min_sample_size: usize,
    pub min_net_sharpe: f64,
    pub max_pbo: f64,
    pub min_dsr: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 60,
            min_net_sharpe: 0.5,
            max_pbo: 0.2,
            min_dsr: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub mode: GateMode,
    /// Score points subtracted from candidates on a soft-mode non-pass.
    pub soft_penalty: f64,
    /// Strategies the validator actually runs; others short-circuit.
    pub enabled_strategies: Vec<StrategyKind>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            mode: GateMode::Soft,
            soft_penalty: 0.35,
            enabled_strategies: vec![StrategyKind::Intraday],
        }
    }
}

/// How the intraday branch is picked when a request does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RolloutMode {
    /// Run the dual-branch comparison and adopt its recommendation.
    Auto,
    /// Use the configured default branch.
    #[default]
    Manual,
}

impl RolloutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RolloutMode::Auto => "auto",
            RolloutMode::Manual => "manual",
        }
    }
}

impl fmt::Display for RolloutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RolloutMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(RolloutMode::Auto),
            "manual" => Ok(RolloutMode::Manual),
            _ => Err(ParseError::new("rollout mode", s, "auto, manual")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RolloutConfig {
    pub mode: RolloutMode,
    pub default_branch: IntradayBranch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub enabled: bool,
    pub log_path: PathBuf,
    pub alert_max_pbo: f64,
    pub alert_min_dsr: f64,
    pub alert_min_net_sharpe: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: std::env::temp_dir().join("scorelab_validation_metrics.jsonl"),
            alert_max_pbo: 0.30,
            alert_min_dsr: -0.10,
            alert_min_net_sharpe: 0.0,
        }
    }
}

impl MonitorConfig {
    pub fn alerts(&self) -> AlertThresholds {
        AlertThresholds {
            max_pbo: self.alert_max_pbo,
            min_dsr: self.alert_min_dsr,
            min_net_sharpe: self.alert_min_net_sharpe,
        }
    }
}

// ─── Top-level config ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ValidationConfig {
    pub protocol: ProtocolConfig,
    pub thresholds: ThresholdConfig,
    pub gate: GateConfig,
    pub rollout: RolloutConfig,
    pub monitoring: MonitorConfig,
}

impl ValidationConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ValidationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read_file(path)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.protocol;
        if p.train_months == 0 || p.test_months == 0 {
            return Err(ConfigError::invalid("protocol", "train and test months must be at least 1"));
        }
        if p.trading_days_per_month < 10 {
            return Err(ConfigError::invalid(
                "protocol.trading_days_per_month",
                "must be at least 10",
            ));
        }
        if p.max_windows == 0 {
            return Err(ConfigError::invalid("protocol.max_windows", "must be at least 1"));
        }
        if p.lookback_days < 120 {
            return Err(ConfigError::invalid("protocol.lookback_days", "must be at least 120"));
        }
        check_cost(p.cost_bps)?;
        if self.thresholds.min_sample_size == 0 {
            return Err(ConfigError::invalid("thresholds.min_sample_size", "must be at least 1"));
        }
        check_unit("thresholds.max_pbo", self.thresholds.max_pbo)?;
        if !self.gate.soft_penalty.is_finite() || self.gate.soft_penalty < 0.0 {
            return Err(ConfigError::invalid("gate.soft_penalty", "must be a non-negative number"));
        }
        if self.gate.enabled_strategies.is_empty() {
            return Err(ConfigError::invalid("gate.enabled_strategies", "must name at least one strategy"));
        }
        check_unit("monitoring.alert_max_pbo", self.monitoring.alert_max_pbo)?;
        Ok(())
    }

    pub fn is_enabled(&self, strategy: StrategyKind) -> bool {
        self.gate.enabled_strategies.contains(&strategy)
    }

    pub fn train_sessions(&self) -> usize {
        self.protocol.train_months * self.protocol.trading_days_per_month
    }

    pub fn test_sessions(&self) -> usize {
        self.protocol.test_months * self.protocol.trading_days_per_month
    }

    /// Cost charged per trade, in percent of entry price.
    pub fn cost_pct(&self, cost_bps: f64) -> f64 {
        let bps = cost_bps.max(0.0);
        if self.protocol.cost_is_round_trip {
            bps / 100.0
        } else {
            bps * 2.0 / 100.0
        }
    }
}

fn check_cost(cost_bps: f64) -> Result<(), ConfigError> {
    if !cost_bps.is_finite() || cost_bps < 0.0 {
        return Err(ConfigError::invalid("cost_bps", format!("{cost_bps} is not a non-negative number")));
    }
    Ok(())
}

fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(field, format!("{value} is outside [0, 1]")));
    }
    Ok(())
}

// ─── Per-call overrides ──────────────────────────────────────────────

/// Concrete session protocol of one validation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Protocol {
    pub train_sessions: usize,
    pub test_sessions: usize,
    pub embargo_sessions: usize,
    pub max_windows: usize,
    pub lookback_days: i64,
    pub cost_bps: f64,
}

impl Protocol {
    /// Fewest sessions that can hold one train block, one test block and the embargo.
    pub fn required_sessions(&self) -> usize {
        self.train_sessions + self.test_sessions + self.embargo_sessions
    }
}

/// Overrides for a single validation call. `None` fields use the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationParams {
    pub weights: Option<RawWeights>,
    pub train_sessions: Option<usize>,
    pub test_sessions: Option<usize>,
    pub embargo_sessions: Option<usize>,
    pub max_windows: Option<usize>,
    pub lookback_days: Option<i64>,
    pub cost_bps: Option<f64>,
    pub min_sample_size: Option<usize>,
    pub min_net_sharpe: Option<f64>,
    pub max_pbo: Option<f64>,
    pub min_dsr: Option<f64>,
    pub intraday_branch: Option<IntradayBranch>,
    /// Also run both intraday branches and recommend one.
    pub compare_branches: bool,
    pub emit_monitoring: bool,
}

impl Default for ValidationParams {
    fn default() -> Self {
        Self {
            weights: None,
            train_sessions: None,
            test_sessions: None,
            embargo_sessions: None,
            max_windows: None,
            lookback_days: None,
            cost_bps: None,
            min_sample_size: None,
            min_net_sharpe: None,
            max_pbo: None,
            min_dsr: None,
            intraday_branch: None,
            compare_branches: false,
            emit_monitoring: true,
        }
    }
}

impl ValidationParams {
    pub fn with_weights(mut self, weights: RawWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_branch(mut self, branch: IntradayBranch) -> Self {
        self.intraday_branch = Some(branch);
        self
    }

    pub fn with_sessions(mut self, train: usize, test: usize, embargo: usize) -> Self {
        self.train_sessions = Some(train);
        self.test_sessions = Some(test);
        self.embargo_sessions = Some(embargo);
        self
    }

    pub fn with_max_windows(mut self, max_windows: usize) -> Self {
        self.max_windows = Some(max_windows);
        self
    }

    pub fn with_min_sample_size(mut self, min_sample_size: usize) -> Self {
        self.min_sample_size = Some(min_sample_size);
        self
    }

    pub fn comparing_branches(mut self, compare: bool) -> Self {
        self.compare_branches = compare;
        self
    }

    pub fn with_monitoring(mut self, emit: bool) -> Self {
        self.emit_monitoring = emit;
        self
    }

    /// Merge over `config` and check the result.
    pub fn resolve(&self, config: &ValidationConfig) -> Result<(Protocol, GateThresholds), ConfigError> {
        let protocol = Protocol {
            train_sessions: self.train_sessions.unwrap_or_else(|| config.train_sessions()),
            test_sessions: self.test_sessions.unwrap_or_else(|| config.test_sessions()),
            embargo_sessions: self
                .embargo_sessions
                .unwrap_or(config.protocol.embargo_sessions),
            max_windows: self.max_windows.unwrap_or(config.protocol.max_windows),
            lookback_days: self.lookback_days.unwrap_or(config.protocol.lookback_days),
            cost_bps: self.cost_bps.unwrap_or(config.protocol.cost_bps),
        };
        let t = &config.thresholds;
        let thresholds = GateThresholds {
            pbo_max: self.max_pbo.unwrap_or(t.max_pbo),
            dsr_min: self.min_dsr.unwrap_or(t.min_dsr),
            sample_size_min: self.min_sample_size.unwrap_or(t.min_sample_size),
            net_sharpe_min: self.min_net_sharpe.unwrap_or(t.min_net_sharpe),
        };

        if protocol.test_sessions == 0 {
            return Err(ConfigError::invalid("testSessions", "must be at least 1"));
        }
        if protocol.max_windows == 0 {
            return Err(ConfigError::invalid("maxWindows", "must be at least 1"));
        }
        if protocol.lookback_days < 1 {
            return Err(ConfigError::invalid("lookbackDays", "must be at least 1"));
        }
        check_cost(protocol.cost_bps)?;
        check_unit("maxPbo", thresholds.pbo_max)?;
        Ok((protocol, thresholds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_protocol() {
        let config = ValidationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.train_sessions(), 126);
        assert_eq!(config.test_sessions(), 21);
        assert_eq!(config.protocol.embargo_sessions, 1);
        assert_eq!(config.gate.mode, GateMode::Soft);
        assert_eq!(config.rollout.mode, RolloutMode::Manual);
        assert!(config.is_enabled(StrategyKind::Intraday));
        assert!(!config.is_enabled(StrategyKind::Close));
    }

    #[test]
    fn cost_pct_respects_round_trip_flag() {
        let mut config = ValidationConfig::default();
        assert!((config.cost_pct(20.0) - 0.2).abs() < 1e-12);
        config.protocol.cost_is_round_trip = false;
        assert!((config.cost_pct(20.0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ValidationConfig::from_toml_str(
            r#"
[gate]
mode = "hard"
enabled_strategies = ["intraday", "close"]

[rollout]
mode = "auto"
"#,
        )
        .unwrap();
        assert_eq!(config.gate.mode, GateMode::Hard);
        assert!(config.is_enabled(StrategyKind::Close));
        assert_eq!(config.rollout.mode, RolloutMode::Auto);
        assert_eq!(config.protocol, ProtocolConfig::default());
        assert!((config.gate.soft_penalty - 0.35).abs() < 1e-12);
    }

    #[test]
    fn unknown_gate_mode_is_a_parse_error() {
        let err = ValidationConfig::from_toml_str("[gate]\nmode = \"strict\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = ValidationConfig::from_toml_str("[thresholds]\nmax_pbo = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "thresholds.max_pbo", .. }));

        let err = ValidationConfig::from_toml_str("[protocol]\nlookback_days = 30\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "protocol.lookback_days", .. }));

        let err = ValidationConfig::from_toml_str("[gate]\nenabled_strategies = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "gate.enabled_strategies", .. }));
    }

    #[test]
    fn rollout_mode_parses() {
        assert_eq!("AUTO".parse::<RolloutMode>().unwrap(), RolloutMode::Auto);
        let err = "weekly".parse::<RolloutMode>().unwrap_err();
        assert_eq!(err.field, "rollout mode");
    }

    #[test]
    fn params_override_config() {
        let config = ValidationConfig::default();
        let (protocol, thresholds) = ValidationParams::default()
            .with_sessions(20, 5, 1)
            .with_min_sample_size(3)
            .resolve(&config)
            .unwrap();
        assert_eq!(protocol.train_sessions, 20);
        assert_eq!(protocol.required_sessions(), 26);
        assert_eq!(protocol.max_windows, 2);
        assert_eq!(thresholds.sample_size_min, 3);
        assert!((thresholds.pbo_max - 0.2).abs() < 1e-12);
    }

    #[test]
    fn zero_test_sessions_are_rejected() {
        let err = ValidationParams::default()
            .with_sessions(20, 0, 1)
            .resolve(&ValidationConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "testSessions", .. }));
    }

    #[test]
    fn params_deserialize_from_camel_case() {
        let params: ValidationParams =
            serde_json::from_str(r#"{"trainSessions": 40, "intradayBranch": "baseline"}"#).unwrap();
        assert_eq!(params.train_sessions, Some(40));
        assert_eq!(params.intraday_branch, Some(IntradayBranch::Baseline));
        assert!(params.emit_monitoring);
    }

    #[test]
    fn load_round_trips_through_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut original = ValidationConfig::default();
        original.gate.mode = GateMode::Observe;
        original.monitoring.log_path = PathBuf::from("/tmp/validation.jsonl");
        file.write_all(original.to_toml().unwrap().as_bytes()).unwrap();
        assert_eq!(ValidationConfig::load(file.path()).unwrap(), original);
    }
}
