//! Branch Rollout Resolver: which intraday branch a scoring request runs.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use scorelab_core::domain::{IntradayBranch, RawWeights, StrategyKind};
use scorelab_core::Universe;

use crate::config::{RolloutMode, ValidationParams};
use crate::walk_forward::{WalkForwardError, WalkForwardValidator};

/// Where a branch selection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchSource {
    Explicit,
    Validated,
    Default,
}

impl fmt::Display for BranchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BranchSource::Explicit => "explicit",
            BranchSource::Validated => "validated",
            BranchSource::Default => "default",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSelection {
    pub branch: IntradayBranch,
    pub source: BranchSource,
}

/// Resolve the intraday branch for a request; `None` for other strategies.
///
/// An explicit request wins. Otherwise auto rollout adopts the recommendation
/// of a dual-branch validation (falling back to the default branch when the
/// validation produced no comparison), and manual rollout uses the default
/// branch.
pub fn resolve_branch(
    validator: &WalkForwardValidator<'_>,
    strategy: StrategyKind,
    requested: Option<IntradayBranch>,
    universe: &Universe,
    weights: Option<RawWeights>,
    as_of: NaiveDate,
) -> Result<Option<BranchSelection>, WalkForwardError> {
    if strategy != StrategyKind::Intraday {
        return Ok(None);
    }
    if let Some(branch) = requested {
        return Ok(Some(BranchSelection {
            branch,
            source: BranchSource::Explicit,
        }));
    }

    let rollout = &validator.config().rollout;
    let selection = match rollout.mode {
        RolloutMode::Manual => BranchSelection {
            branch: rollout.default_branch,
            source: BranchSource::Default,
        },
        RolloutMode::Auto => {
            let params = ValidationParams {
                weights,
                ..ValidationParams::default()
            }
            .with_branch(IntradayBranch::Phase2)
            .comparing_branches(true)
            .with_monitoring(false);
            let summary = validator.run(StrategyKind::Intraday, universe, &params, as_of)?;
            match summary.recommended_branch() {
                Some(branch) => BranchSelection {
                    branch,
                    source: BranchSource::Validated,
                },
                None => BranchSelection {
                    branch: rollout.default_branch,
                    source: BranchSource::Default,
                },
            }
        }
    };
    info!(branch = %selection.branch, source = %selection.source, "intraday branch resolved");
    Ok(Some(selection))
}
