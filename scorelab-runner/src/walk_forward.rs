//! Walk-forward validation: train/test windows over trading sessions.
//!
//! Sessions are the trading days in `[asOf − lookbackDays, asOf]`. A cursor
//! slides over them in steps of `testSessions`, carving one train block and
//! one test block per window (at most `maxWindows`, oldest first). The first
//! `embargoSessions` of each test block are purged; the rest is the
//! evaluation slice. The train Sharpe of a window is measured on the last
//! `min(trainSessions, testSessions)` train sessions.
//!
//! For every evaluated session the strategy picks its top-ranked instrument
//! and books the next-session return net of cost. Test-slice returns of all
//! windows form the aggregate sample behind the reported metrics, PBO, DSR
//! and gate decision.
//!
//! Not enough sessions, or too few samples, is never an error: the summary is
//! flagged `insufficientData` instead. Only a bad protocol or bad weights fail
//! a run.

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use scorelab_core::calendar::{latest_trading_date, previous_trading_date, trading_sessions};
use scorelab_core::domain::{
    FactorWeights, GateMode, GateStatus, IntradayBranch, Interval, RawWeights, StrategyContext,
    StrategyKind, ValidationAnnotation, WeightError,
};
use scorelab_core::{ConfigError, MarketData, ScoreRequest, Scorer, TradingCalendar, Universe};

use crate::config::{Protocol, ValidationConfig, ValidationParams};
use crate::gate::{self, GateInputs, GateThresholds};
use crate::metrics::{count_switches, forward_return_pct, ReturnMetrics};
use crate::monitor::MonitorLog;
use crate::overfit::{compute_pbo, deflated_sharpe};

/// Note carried by summaries of strategies the validator does not run.
pub const DISABLED_NOTE: &str = "validation-disabled-for-strategy";

/// Calendar days of daily bars fetched after a session to find its exit.
const FORWARD_FETCH_DAYS: i64 = 10;

// ─── Collaborators ───────────────────────────────────────────────────

/// One session's pick request, as the validator issues it.
#[derive(Debug, Clone, Copy)]
pub struct PickRequest<'u> {
    pub strategy: StrategyKind,
    pub session: NaiveDate,
    pub branch: IntradayBranch,
    pub weights: RawWeights,
    pub universe: &'u Universe,
}

/// Produces the top-ranked instrument of a session.
pub trait SessionPicker: Send + Sync {
    /// `None` when nothing could be scored for the session.
    fn top_pick(&self, request: &PickRequest<'_>) -> Option<String>;
}

impl SessionPicker for Scorer<'_> {
    fn top_pick(&self, request: &PickRequest<'_>) -> Option<String> {
        let context = match request.strategy {
            StrategyKind::Premarket => StrategyContext::premarket(
                request.session,
                previous_trading_date(self.calendar(), request.session),
            ),
            kind => StrategyContext::same_day(kind, request.session),
        }
        .with_branch(request.branch);
        let scoring = ScoreRequest::new(context).with_weights(request.weights);
        match self.score_candidates(request.universe, &scoring) {
            Ok(response) => response.candidates.into_iter().next().map(|c| c.code),
            Err(e) => {
                debug!(session = %request.session, error = %e, "session scoring failed");
                None
            }
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Aggregate metrics of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMetrics {
    pub net_sharpe: f64,
    pub max_drawdown: f64,
    pub hit_rate: f64,
    pub turnover: f64,
    pub pbo: f64,
    pub dsr: f64,
    pub sample_size: usize,
}

impl ValidationMetrics {
    /// Metrics of a run that evaluated nothing.
    pub fn empty() -> Self {
        Self::from_parts(ReturnMetrics::default(), 1.0, 0.0)
    }

    fn from_parts(core: ReturnMetrics, pbo: f64, dsr: f64) -> Self {
        Self {
            net_sharpe: core.net_sharpe,
            max_drawdown: core.max_drawdown,
            hit_rate: core.hit_rate,
            turnover: core.turnover,
            pbo,
            dsr,
            sample_size: core.sample_size,
        }
    }
}

/// Protocol actually used, echoed in the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolEcho {
    pub train_sessions: usize,
    pub test_sessions: usize,
    pub embargo_sessions: usize,
    pub cost_bps: f64,
    pub windows: usize,
    pub intraday_signal_branch: IntradayBranch,
}

impl ProtocolEcho {
    fn new(protocol: &Protocol, windows: usize, branch: IntradayBranch) -> Self {
        Self {
            train_sessions: protocol.train_sessions,
            test_sessions: protocol.test_sessions,
            embargo_sessions: protocol.embargo_sessions,
            cost_bps: protocol.cost_bps,
            windows,
            intraday_signal_branch: branch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonitoringOutcome {
    pub logged: bool,
    pub alerts: Vec<String>,
}

/// Session index ranges of one window. Ends are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    pub window_index: usize,
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
    /// First test session after the embargo.
    pub eval_start: usize,
}

/// Outcome of one evaluated window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowResult {
    pub window_index: usize,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
    pub train_sharpe: f64,
    pub test_sharpe: f64,
    pub train_samples: usize,
    pub test_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchMetrics {
    pub gate_status: GateStatus,
    pub net_sharpe: f64,
    pub pbo: f64,
    pub dsr: f64,
    pub sample_size: usize,
}

impl BranchMetrics {
    fn of(summary: &ValidationSummary) -> Self {
        Self {
            gate_status: summary.gate_status,
            net_sharpe: summary.metrics.net_sharpe,
            pbo: summary.metrics.pbo,
            dsr: summary.metrics.dsr,
            sample_size: summary.metrics.sample_size,
        }
    }
}

/// Baseline vs. phase2 intraday branches under the same protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchComparison {
    pub baseline: BranchMetrics,
    pub phase2: BranchMetrics,
    /// Higher net Sharpe wins; ties go to phase2.
    pub recommended_branch: IntradayBranch,
    pub selected_branch: IntradayBranch,
}

/// Complete result of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub strategy: StrategyKind,
    pub as_of_date: NaiveDate,
    pub mode: GateMode,
    pub gate_status: GateStatus,
    pub gate_passed: bool,
    pub insufficient_data: bool,
    /// Score points the caller subtracts from candidates.
    pub validation_penalty: f64,
    pub protocol: ProtocolEcho,
    pub thresholds: GateThresholds,
    pub metrics: ValidationMetrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub windows: Vec<WindowResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_comparison: Option<BranchComparison>,
    #[serde(default)]
    pub monitoring: MonitoringOutcome,
}

impl ValidationSummary {
    /// The block copied onto annotated candidates.
    pub fn annotation(&self) -> ValidationAnnotation {
        ValidationAnnotation {
            gate_passed: self.gate_passed,
            gate_status: self.gate_status,
            insufficient_data: self.insufficient_data,
            pbo: self.metrics.pbo,
            dsr: self.metrics.dsr,
            net_sharpe: self.metrics.net_sharpe,
            as_of_date: self.as_of_date,
            mode: self.mode,
        }
    }

    pub fn recommended_branch(&self) -> Option<IntradayBranch> {
        self.branch_comparison.as_ref().map(|c| c.recommended_branch)
    }
}

/// Errors that stop a validation run before it evaluates anything.
#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error(transparent)]
    Weights(#[from] WeightError),

    #[error(transparent)]
    Protocol(#[from] ConfigError),
}

// ─── Window creation ─────────────────────────────────────────────────

/// Create rolling walk-forward windows over `n_sessions` sessions.
///
/// Window `k` tests sessions `[c − test, c)` and trains on the `train`
/// sessions before them, where `c = train + test + k·test`. Windows whose
/// train block or post-embargo test block is empty are skipped without
/// counting towards `max_windows`.
pub fn create_windows(n_sessions: usize, protocol: &Protocol) -> Vec<WindowSpec> {
    let Protocol {
        train_sessions: train,
        test_sessions: test,
        embargo_sessions: embargo,
        max_windows,
        ..
    } = *protocol;
    let mut windows = Vec::new();
    if test == 0 {
        return windows;
    }

    let mut cursor = train + test;
    while cursor <= n_sessions && windows.len() < max_windows {
        let test_start = cursor - test;
        let train_start = test_start - train;
        let eval_start = test_start + embargo;
        if train > 0 && eval_start < cursor {
            windows.push(WindowSpec {
                window_index: windows.len(),
                train_start,
                train_end: test_start,
                test_start,
                test_end: cursor,
                eval_start,
            });
        }
        cursor += test;
    }
    windows
}

// ─── Validator ───────────────────────────────────────────────────────

/// Net returns of one slice of sessions, in session order.
#[derive(Debug, Default)]
struct SliceOutcome {
    returns: Vec<f64>,
    switches: usize,
}

impl SliceOutcome {
    fn metrics(&self) -> ReturnMetrics {
        ReturnMetrics::compute(&self.returns, self.switches)
    }
}

/// Per-run settings shared by every session evaluation.
struct RunContext<'u> {
    strategy: StrategyKind,
    universe: &'u Universe,
    weights: RawWeights,
    branch: IntradayBranch,
    cost_pct: f64,
}

/// Runs the walk-forward protocol against injected collaborators.
pub struct WalkForwardValidator<'a> {
    picker: &'a dyn SessionPicker,
    market: &'a dyn MarketData,
    calendar: &'a dyn TradingCalendar,
    config: ValidationConfig,
    monitor: Option<MonitorLog>,
    default_weights: RawWeights,
}

impl<'a> WalkForwardValidator<'a> {
    pub fn new(
        picker: &'a dyn SessionPicker,
        market: &'a dyn MarketData,
        calendar: &'a dyn TradingCalendar,
        config: ValidationConfig,
    ) -> Self {
        let monitor = MonitorLog::from_config(&config.monitoring);
        Self {
            picker,
            market,
            calendar,
            config,
            monitor,
            default_weights: FactorWeights::default().into(),
        }
    }

    /// Validate the scorer's own strategy: its market, calendar and default weights.
    pub fn for_scorer(scorer: &'a Scorer<'a>, config: ValidationConfig) -> Self {
        Self::new(scorer, scorer.market(), scorer.calendar(), config)
            .with_default_weights(scorer.config().weights)
    }

    pub fn with_default_weights(mut self, weights: RawWeights) -> Self {
        self.default_weights = weights;
        self
    }

    /// Replace the configured monitoring log (`None` disables it).
    pub fn with_monitor(mut self, monitor: Option<MonitorLog>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate `strategy` over `universe` as of the latest trading date on
    /// or before `as_of`.
    pub fn run(
        &self,
        strategy: StrategyKind,
        universe: &Universe,
        params: &ValidationParams,
        as_of: NaiveDate,
    ) -> Result<ValidationSummary, WalkForwardError> {
        let (protocol, thresholds) = params.resolve(&self.config)?;
        let weights = params.weights.unwrap_or(self.default_weights);
        weights.normalize()?;

        let as_of_date = latest_trading_date(self.calendar, as_of);
        let branch = params
            .intraday_branch
            .unwrap_or(self.config.rollout.default_branch);

        let mut summary = if !self.config.is_enabled(strategy) {
            debug!(%strategy, "validation disabled for strategy");
            let echo = ProtocolEcho {
                train_sessions: 0,
                test_sessions: 0,
                embargo_sessions: 0,
                cost_bps: protocol.cost_bps,
                windows: 0,
                intraday_signal_branch: branch,
            };
            let mut s = self.unevaluated(strategy, as_of_date, echo, thresholds);
            s.note = Some(DISABLED_NOTE.to_string());
            s
        } else {
            let start = as_of_date - Duration::days(protocol.lookback_days);
            let sessions = trading_sessions(self.calendar, start, as_of_date);
            if sessions.len() < protocol.required_sessions() {
                debug!(
                    %strategy,
                    available = sessions.len(),
                    required = protocol.required_sessions(),
                    "not enough sessions for walk-forward validation"
                );
                let echo = ProtocolEcho::new(&protocol, 0, branch);
                self.unevaluated(strategy, as_of_date, echo, thresholds)
            } else {
                let run = RunContext {
                    strategy,
                    universe,
                    weights,
                    branch,
                    cost_pct: self.config.cost_pct(protocol.cost_bps),
                };
                let mut s = self.evaluate(&run, &sessions, &protocol, thresholds, as_of_date);
                if params.compare_branches && strategy == StrategyKind::Intraday {
                    s.branch_comparison =
                        Some(self.compare_branches(strategy, universe, params, as_of_date, branch)?);
                }
                s
            }
        };

        if params.emit_monitoring {
            if let Some(monitor) = &self.monitor {
                summary.monitoring = monitor.emit(&summary);
            }
        }

        info!(
            %strategy,
            as_of = %summary.as_of_date,
            status = %summary.gate_status,
            passed = summary.gate_passed,
            insufficient = summary.insufficient_data,
            net_sharpe = summary.metrics.net_sharpe,
            pbo = summary.metrics.pbo,
            dsr = summary.metrics.dsr,
            samples = summary.metrics.sample_size,
            "walk-forward validation finished"
        );
        Ok(summary)
    }

    /// Summary of a run that evaluated no session.
    fn unevaluated(
        &self,
        strategy: StrategyKind,
        as_of_date: NaiveDate,
        protocol: ProtocolEcho,
        thresholds: GateThresholds,
    ) -> ValidationSummary {
        let metrics = ValidationMetrics::empty();
        let decision = self.decide(&thresholds, &metrics, true);
        ValidationSummary {
            strategy,
            as_of_date,
            mode: self.config.gate.mode,
            gate_status: decision.status,
            gate_passed: decision.passed,
            insufficient_data: true,
            validation_penalty: decision.penalty,
            protocol,
            thresholds,
            metrics,
            windows: Vec::new(),
            note: None,
            branch_comparison: None,
            monitoring: MonitoringOutcome::default(),
        }
    }

    fn decide(
        &self,
        thresholds: &GateThresholds,
        metrics: &ValidationMetrics,
        insufficient_data: bool,
    ) -> gate::GateDecision {
        let inputs = GateInputs {
            net_sharpe: metrics.net_sharpe,
            pbo: metrics.pbo,
            dsr: metrics.dsr,
            insufficient_data,
        };
        gate::decide(self.config.gate.mode, self.config.gate.soft_penalty, thresholds, &inputs)
    }

    fn evaluate(
        &self,
        run: &RunContext<'_>,
        sessions: &[NaiveDate],
        protocol: &Protocol,
        thresholds: GateThresholds,
        as_of_date: NaiveDate,
    ) -> ValidationSummary {
        let specs = create_windows(sessions.len(), protocol);
        let mut windows = Vec::with_capacity(specs.len());
        let mut aggregate = SliceOutcome::default();

        for spec in &specs {
            let train = &sessions[spec.train_start..spec.train_end];
            let tail = train.len().min(protocol.test_sessions);
            let train_eval = self.evaluate_sessions(&train[train.len() - tail..], run);
            let test_eval = self.evaluate_sessions(&sessions[spec.eval_start..spec.test_end], run);

            let result = WindowResult {
                window_index: spec.window_index,
                test_start: sessions[spec.test_start],
                test_end: sessions[spec.test_end - 1],
                train_sharpe: train_eval.metrics().net_sharpe,
                test_sharpe: test_eval.metrics().net_sharpe,
                train_samples: train_eval.returns.len(),
                test_samples: test_eval.returns.len(),
            };
            debug!(
                window = result.window_index,
                test_start = %result.test_start,
                train_sharpe = result.train_sharpe,
                test_sharpe = result.test_sharpe,
                samples = result.test_samples,
                "walk-forward window evaluated"
            );
            windows.push(result);
            aggregate.returns.extend(test_eval.returns);
            aggregate.switches += test_eval.switches;
        }

        let pairs: Vec<(f64, f64)> = windows
            .iter()
            .map(|w| (w.train_sharpe, w.test_sharpe))
            .collect();
        let pbo = compute_pbo(&pairs);
        let dsr = deflated_sharpe(&aggregate.returns, windows.len().max(1));
        let metrics = ValidationMetrics::from_parts(aggregate.metrics(), pbo, dsr);
        let insufficient_data = metrics.sample_size < thresholds.sample_size_min;
        let decision = self.decide(&thresholds, &metrics, insufficient_data);

        ValidationSummary {
            strategy: run.strategy,
            as_of_date,
            mode: self.config.gate.mode,
            gate_status: decision.status,
            gate_passed: decision.passed,
            insufficient_data,
            validation_penalty: decision.penalty,
            protocol: ProtocolEcho::new(protocol, windows.len(), run.branch),
            thresholds,
            metrics,
            windows,
            note: None,
            branch_comparison: None,
            monitoring: MonitoringOutcome::default(),
        }
    }

    /// Score every session in parallel; the outcome keeps session order.
    fn evaluate_sessions(&self, sessions: &[NaiveDate], run: &RunContext<'_>) -> SliceOutcome {
        let picks: Vec<(String, f64)> = sessions
            .par_iter()
            .map(|&session| self.session_outcome(session, run))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();
        let switches = count_switches(&picks.iter().map(|(code, _)| code.as_str()).collect::<Vec<_>>());
        SliceOutcome {
            returns: picks.into_iter().map(|(_, r)| r).collect(),
            switches,
        }
    }

    /// Top pick of one session and its net forward return.
    fn session_outcome(&self, session: NaiveDate, run: &RunContext<'_>) -> Option<(String, f64)> {
        let request = PickRequest {
            strategy: run.strategy,
            session,
            branch: run.branch,
            weights: run.weights,
            universe: run.universe,
        };
        let code = self.picker.top_pick(&request)?;
        let end = session + Duration::days(FORWARD_FETCH_DAYS);
        let bars = match self.market.fetch_history(&code, session, end, Interval::Daily) {
            Ok(bars) => bars,
            Err(e) => {
                debug!(%code, %session, error = %e, "forward prices unavailable");
                return None;
            }
        };
        let raw = forward_return_pct(&bars, session)?;
        Some((code, raw - run.cost_pct))
    }

    /// Re-run the protocol once per intraday branch and recommend one.
    fn compare_branches(
        &self,
        strategy: StrategyKind,
        universe: &Universe,
        params: &ValidationParams,
        as_of_date: NaiveDate,
        selected: IntradayBranch,
    ) -> Result<BranchComparison, WalkForwardError> {
        let shared = params.clone().comparing_branches(false).with_monitoring(false);
        let baseline = self.run(
            strategy,
            universe,
            &shared.clone().with_branch(IntradayBranch::Baseline),
            as_of_date,
        )?;
        let phase2 = self.run(
            strategy,
            universe,
            &shared.with_branch(IntradayBranch::Phase2),
            as_of_date,
        )?;
        let recommended_branch = if phase2.metrics.net_sharpe >= baseline.metrics.net_sharpe {
            IntradayBranch::Phase2
        } else {
            IntradayBranch::Baseline
        };
        Ok(BranchComparison {
            baseline: BranchMetrics::of(&baseline),
            phase2: BranchMetrics::of(&phase2),
            recommended_branch,
            selected_branch: selected,
        })
    }
}
