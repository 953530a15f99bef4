//! Collaborator traits for market data and news, plus the fetch retry policy.
//!
//! The scoring core never talks to a network. Callers inject implementations
//! of these traits (a CSV reader, the synthetic market, a test fake). Provider
//! errors are always recoverable from the core's point of view: the affected
//! instrument is skipped and the batch continues.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{Interval, PriceBar};

/// Structured errors a provider may report.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("malformed data for {symbol}: {reason}")]
    Malformed { symbol: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Price history source.
///
/// `fetch_history` returns bars with timestamps in `[start, end]` (dates
/// inclusive), ordered by timestamp.
pub trait MarketData: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn fetch_history(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<PriceBar>, ProviderError>;
}

/// A headline with its publication time in exchange-local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub published_at: NaiveDateTime,
}

/// Headline source for premarket sentiment.
pub trait NewsSource: Send + Sync {
    fn headlines(&self, code: &str) -> Result<Vec<Headline>, ProviderError>;
}

/// News source that never has headlines. Sentiment degrades to neutral.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNews;

impl NewsSource for NoNews {
    fn headlines(&self, _code: &str) -> Result<Vec<Headline>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Explicit retry policy for flaky history fetches.
///
/// Up to `max_attempts` fetches are made; the longest history seen is kept,
/// and retrying stops as soon as a result has at least `min_bars` bars.
/// Provider errors count as empty attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub min_bars: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            min_bars: 60,
        }
    }
}

impl RetryPolicy {
    pub fn accepts(&self, bars: &[PriceBar]) -> bool {
        bars.len() >= self.min_bars
    }

    /// Fetch with retries, returning the best-populated history (possibly empty).
    pub fn fetch(
        &self,
        market: &dyn MarketData,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Vec<PriceBar> {
        let mut best: Vec<PriceBar> = Vec::new();
        for attempt in 1..=self.max_attempts.max(1) {
            match market.fetch_history(code, start, end, interval) {
                Ok(bars) => {
                    if bars.len() > best.len() {
                        best = bars;
                    }
                }
                Err(e) => {
                    debug!(provider = market.name(), code, attempt, error = %e, "history fetch failed");
                }
            }
            if self.accepts(&best) {
                break;
            }
        }
        best
    }
}
