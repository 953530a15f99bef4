//! Validation gate: thresholds → passed flag → status → score penalty.

use serde::{Deserialize, Serialize};

use scorelab_core::domain::{round_to, GateMode, GateStatus};

/// Thresholds a validated strategy must meet. Serialized under the names
/// the summary reports them with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateThresholds {
    pub pbo_max: f64,
    pub dsr_min: f64,
    pub sample_size_min: usize,
    pub net_sharpe_min: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            pbo_max: 0.2,
            dsr_min: 0.0,
            sample_size_min: 60,
            net_sharpe_min: 0.5,
        }
    }
}

/// The statistics the gate looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateInputs {
    pub net_sharpe: f64,
    pub pbo: f64,
    pub dsr: f64,
    pub insufficient_data: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateDecision {
    pub passed: bool,
    pub status: GateStatus,
    pub penalty: f64,
}

/// `pbo ≤ max`, `dsr > min` and `sharpe ≥ min`, on sufficient data only.
pub fn gate_passed(inputs: &GateInputs, thresholds: &GateThresholds) -> bool {
    !inputs.insufficient_data
        && inputs.pbo <= thresholds.pbo_max
        && inputs.dsr > thresholds.dsr_min
        && inputs.net_sharpe >= thresholds.net_sharpe_min
}

pub fn gate_status(mode: GateMode, passed: bool, insufficient_data: bool) -> GateStatus {
    if mode == GateMode::Off || passed {
        GateStatus::Pass
    } else if insufficient_data {
        GateStatus::Warn
    } else if mode == GateMode::Hard {
        GateStatus::Fail
    } else {
        GateStatus::Warn
    }
}

/// Penalty only for a soft-mode non-pass backed by enough data.
pub fn validation_penalty(
    mode: GateMode,
    status: GateStatus,
    insufficient_data: bool,
    soft_penalty: f64,
) -> f64 {
    if mode == GateMode::Soft && status != GateStatus::Pass && !insufficient_data {
        round_to(soft_penalty.max(0.0), 4)
    } else {
        0.0
    }
}

pub fn decide(
    mode: GateMode,
    soft_penalty: f64,
    thresholds: &GateThresholds,
    inputs: &GateInputs,
) -> GateDecision {
    let passed = gate_passed(inputs, thresholds);
    let status = gate_status(mode, passed, inputs.insufficient_data);
    GateDecision {
        passed,
        status,
        penalty: validation_penalty(mode, status, inputs.insufficient_data, soft_penalty),
    }
}
