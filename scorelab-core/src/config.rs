//! Scoring configuration, loaded from TOML.
//!
//! Every field has a default, so a config file only needs the keys it
//! overrides:
//!
//! ```toml
//! history_days = 240
//! intraday_mode = "bars"
//!
//! [weights]
//! return = 0.5
//! stability = 0.3
//! market = 0.2
//!
//! [balance]
//! top_n = 10
//! max_per_sector = 2
//! max_per_bucket = 4
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diversify::{BalanceCaps, ExposureCap};
use crate::domain::{FactorWeights, IntradayBranch, IntradayMode, RawWeights, WeightError};
use crate::factors::MIN_HISTORY_BARS;
use crate::provider::RetryPolicy;
use crate::strategy::OVERNIGHT_BASKET;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Weights(#[from] WeightError),
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Read a whole file, tagging I/O errors with the path.
pub fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub intraday_mode: IntradayMode,
    pub intraday_branch: IntradayBranch,
    /// Calendar days of daily history fetched per instrument.
    pub history_days: i64,
    /// Fewest daily bars an instrument needs to be scored.
    pub min_history: usize,
    pub include_sparkline: bool,
    pub overnight_basket: Vec<String>,
    /// Default factor weights; normalized on use.
    pub weights: RawWeights,
    pub balance: BalanceCaps,
    /// Narrower sector cap, applied only when a request enables it.
    pub exposure_cap: ExposureCap,
    pub retry: RetryPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            intraday_mode: IntradayMode::default(),
            intraday_branch: IntradayBranch::default(),
            history_days: 180,
            min_history: MIN_HISTORY_BARS,
            include_sparkline: true,
            overnight_basket: OVERNIGHT_BASKET.iter().map(|s| s.to_string()).collect(),
            weights: FactorWeights::default().into(),
            balance: BalanceCaps::default(),
            exposure_cap: ExposureCap::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ScoringConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ScoringConfig = toml::from_str(content)?;
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
        self.weights.normalize()?;
        if self.balance.top_n == 0 {
            return Err(ConfigError::invalid("balance.top_n", "must be at least 1"));
        }
        if self.balance.max_per_sector == 0 || self.balance.max_per_bucket == 0 {
            return Err(ConfigError::invalid("balance", "group caps must be at least 1"));
        }
        if self.exposure_cap.top_n == 0 {
            return Err(ConfigError::invalid("exposure_cap.top_n", "must be at least 1"));
        }
        if self.min_history == 0 {
            return Err(ConfigError::invalid("min_history", "must be at least 1"));
        }
        if self.history_days < self.min_history as i64 {
            return Err(ConfigError::invalid(
                "history_days",
                format!(
                    "{} calendar days cannot hold {} bars",
                    self.history_days, self.min_history
                ),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        Ok(())
    }

    /// Normalized default weights.
    pub fn default_weights(&self) -> Result<FactorWeights, WeightError> {
        self.weights.normalize()
    }
}
