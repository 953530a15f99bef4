//! ScoreLab Core: factor scoring, strategy adapters, diversification, regime detection.
//!
//! This crate contains the scoring half of ScoreLab:
//! - Domain types (price bars, factor scores, candidates, strategy tokens)
//! - Indicators and the Indicator Engine (history → three raw factors)
//! - Strategy Adapter branches for close, premarket and intraday
//! - Diversification Sampler and sector exposure cap
//! - Regime Detector and market overview
//! - Collaborator traits (market data, news, trading calendar) and a
//!   deterministic synthetic market
//! - Strategy availability table, result-cache keys, TOML configuration

pub mod availability;
pub mod cache_key;
pub mod calendar;
pub mod config;
pub mod diversify;
pub mod domain;
pub mod factors;
pub mod indicators;
pub mod provider;
pub mod regime;
pub mod scoring;
pub mod strategy;
pub mod synthetic;
pub mod universe;

pub use availability::{resolve_strategy_context, strategy_availability, AvailabilityError};
pub use calendar::{TradingCalendar, WeekdayCalendar};
pub use config::{ConfigError, ScoringConfig};
pub use provider::{MarketData, NewsSource, ProviderError};
pub use regime::{detect_regime, RegimeAssessment};
pub use scoring::{ScoreError, ScoreRequest, ScoreResponse, Scorer};
pub use synthetic::SyntheticMarket;
pub use universe::Universe;
