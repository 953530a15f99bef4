//! ScoreLab Runner: walk-forward validation, gating and branch rollout.
//!
//! This crate builds on `scorelab-core` to provide:
//! - Walk-forward validator over trading sessions with purged test blocks
//! - Return metrics, PBO and deflated Sharpe estimators
//! - Gate policy (off / observe / soft / hard) and score penalties
//! - Validation annotations for scored candidates
//! - Branch Rollout Resolver for the intraday signal branch
//! - JSONL monitoring log with threshold alerts
//! - TOML validation config with per-call overrides

pub mod annotate;
pub mod config;
pub mod gate;
pub mod metrics;
pub mod monitor;
pub mod overfit;
pub mod rollout;
pub mod walk_forward;

pub use annotate::{attach_validation, strip_validation};
pub use config::{Protocol, RolloutMode, ValidationConfig, ValidationParams};
pub use gate::{GateDecision, GateThresholds};
pub use metrics::ReturnMetrics;
pub use monitor::{MonitorError, MonitorLog, MonitorRecord};
pub use overfit::{compute_pbo, deflated_sharpe};
pub use rollout::{resolve_branch, BranchSelection, BranchSource};
pub use walk_forward::{
    BranchComparison, SessionPicker, ValidationMetrics, ValidationSummary, WalkForwardError,
    WalkForwardValidator,
};
