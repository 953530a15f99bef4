//! Domain types for ScoreLab

pub mod bar;
pub mod candidate;
pub mod factor;
pub mod strategy;
pub mod validation;

pub use bar::{change_pct, last_change_pct, Interval, PriceBar};
pub use candidate::{
    BarSignalDetail, Candidate, IntradaySignalMode, IntradaySignals, PremarketSignals,
    SignalDetail, SizeBucket,
};
pub use factor::{clamp_score, round_to, FactorScore, FactorWeights, RawWeights, WeightError};
pub use strategy::{IntradayBranch, IntradayMode, ParseError, StrategyContext, StrategyKind};
pub use validation::{GateMode, GateStatus, ValidationAnnotation};
