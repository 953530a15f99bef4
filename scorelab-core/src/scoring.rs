//! Candidate scoring: universe + strategy context → ranked candidate list.
//!
//! Per instrument: fetch daily history ending at the signal date, run the
//! Indicator Engine, route the raw factors through the strategy branch and
//! build the candidate payload. An instrument whose fetch or evaluation fails
//! is skipped and logged; only invalid weights fail the whole request.
//!
//! The list is then deduplicated by code, sorted by score, balanced across
//! sectors and size buckets, and optionally passed through the sector
//! exposure cap.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calendar::{latest_trading_date, TradingCalendar};
use crate::config::ScoringConfig;
use crate::diversify::{apply_exposure_cap, balanced_sample, rerank, BalanceCaps, ExposureCap};
use crate::domain::{
    Candidate, FactorWeights, IntradayBranch, IntradayMode, Interval, PriceBar, RawWeights,
    SizeBucket, StrategyContext, StrategyKind, WeightError,
};
use crate::factors::{FactorError, FactorSnapshot, IndicatorEngine};
use crate::indicators::build_sparkline;
use crate::provider::{MarketData, NewsSource, NoNews};
use crate::strategy::{
    apply_close, apply_intraday, apply_premarket, load_bar_signals, overnight_changes,
    overnight_proxy_score, Adjustment, SessionQuote,
};
use crate::universe::{Instrument, Universe};

/// Points in a candidate sparkline.
pub const SPARKLINE_POINTS: usize = 60;

static NO_NEWS: NoNews = NoNews;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Weights(#[from] WeightError),
}

/// Why an instrument produced no candidate.
#[derive(Debug, Error)]
enum Skip {
    #[error("no price history")]
    NoHistory,
    #[error(transparent)]
    Factors(#[from] FactorError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRequest {
    pub context: StrategyContext,
    /// `None` uses the configured default weights.
    pub weights: Option<RawWeights>,
    pub diversify: bool,
    /// Narrower sector cap, when enabled.
    pub exposure_cap: Option<ExposureCap>,
}

impl ScoreRequest {
    pub fn new(context: StrategyContext) -> Self {
        Self {
            context,
            weights: None,
            diversify: true,
            exposure_cap: None,
        }
    }

    pub fn with_weights(mut self, weights: RawWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_diversify(mut self, diversify: bool) -> Self {
        self.diversify = diversify;
        self
    }

    pub fn with_exposure_cap(mut self, cap: ExposureCap) -> Self {
        self.exposure_cap = Some(cap);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub strategy: StrategyKind,
    pub session_date: NaiveDate,
    pub signal_date: NaiveDate,
    pub weights: FactorWeights,
    pub candidates: Vec<Candidate>,
    pub requested: usize,
    pub skipped: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diversification: Option<BalanceCaps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure_cap: Option<ExposureCap>,
}

/// Scores universes against injected collaborators.
pub struct Scorer<'a> {
    market: &'a dyn MarketData,
    news: &'a dyn NewsSource,
    calendar: &'a dyn TradingCalendar,
    config: ScoringConfig,
    engine: IndicatorEngine,
}

impl<'a> Scorer<'a> {
    pub fn new(
        market: &'a dyn MarketData,
        calendar: &'a dyn TradingCalendar,
        config: ScoringConfig,
    ) -> Self {
        let engine = IndicatorEngine::new().with_min_history(config.min_history);
        Self {
            market,
            news: &NO_NEWS,
            calendar,
            config,
            engine,
        }
    }

    pub fn with_news(mut self, news: &'a dyn NewsSource) -> Self {
        self.news = news;
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn calendar(&self) -> &dyn TradingCalendar {
        self.calendar
    }

    pub fn market(&self) -> &dyn MarketData {
        self.market
    }

    /// Pin the dates a context actually scores: close contexts snap to the
    /// latest trading date on or before the requested one.
    pub fn effective_context(&self, ctx: &StrategyContext) -> StrategyContext {
        match ctx.kind {
            StrategyKind::Close => {
                let date = latest_trading_date(self.calendar, ctx.signal_date);
                StrategyContext::same_day(StrategyKind::Close, date).with_branch(ctx.branch)
            }
            _ => ctx.clone(),
        }
    }

    fn history(&self, code: &str, signal_date: NaiveDate) -> Vec<PriceBar> {
        let start = signal_date - Duration::days(self.config.history_days - 1);
        let mut bars = self
            .config
            .retry
            .fetch(self.market, code, start, signal_date, Interval::Daily);
        bars.retain(|b| !b.is_void());
        bars
    }

    pub fn score_candidates(
        &self,
        universe: &Universe,
        request: &ScoreRequest,
    ) -> Result<ScoreResponse, ScoreError> {
        let weights = match &request.weights {
            Some(raw) => raw.normalize()?,
            None => self.config.default_weights()?,
        };
        let ctx = self.effective_context(&request.context);

        let overnight_proxy = match ctx.kind {
            StrategyKind::Premarket => {
                let changes = overnight_changes(
                    self.market,
                    &self.config.overnight_basket,
                    ctx.session_date,
                );
                overnight_proxy_score(&changes)
            }
            _ => 5.0,
        };

        let mut scored = Vec::with_capacity(universe.len());
        let mut skipped = 0usize;
        for instrument in universe.instruments() {
            match self.score_instrument(instrument, &ctx, &weights, overnight_proxy) {
                Ok(candidate) => scored.push(candidate),
                Err(reason) => {
                    skipped += 1;
                    debug!(code = %instrument.code, strategy = %ctx.kind, %reason, "instrument skipped");
                }
            }
        }

        let mut candidates = dedupe_by_code(scored);
        sort_by_score(&mut candidates);
        rerank(&mut candidates);
        if request.diversify {
            candidates = balanced_sample(candidates, &self.config.balance);
        }
        for c in &mut candidates {
            c.exposure_deferred = false;
        }
        if let Some(cap) = &request.exposure_cap {
            candidates = apply_exposure_cap(candidates, cap);
        }
        for c in &mut candidates {
            c.strong_recommendation = c.rank <= Candidate::STRONG_RANK;
        }

        debug!(
            strategy = %ctx.kind,
            signal_date = %ctx.signal_date,
            scored = candidates.len(),
            skipped,
            "scoring complete"
        );
        Ok(ScoreResponse {
            strategy: ctx.kind,
            session_date: ctx.session_date,
            signal_date: ctx.signal_date,
            weights,
            candidates,
            requested: universe.len(),
            skipped,
            diversification: request.diversify.then_some(self.config.balance),
            exposure_cap: request.exposure_cap,
        })
    }

    fn score_instrument(
        &self,
        instrument: &Instrument,
        ctx: &StrategyContext,
        weights: &FactorWeights,
        overnight_proxy: f64,
    ) -> Result<Candidate, Skip> {
        let code = instrument.code.as_str();
        let bars = self.history(code, ctx.signal_date);
        if bars.is_empty() {
            return Err(Skip::NoHistory);
        }
        let snapshot = self.engine.evaluate(&bars)?;
        let adjustment = self.adjust(code, ctx, weights, &snapshot, &bars, overnight_proxy);
        Ok(self.build_candidate(instrument, ctx, &snapshot, &bars, adjustment))
    }

    fn adjust(
        &self,
        code: &str,
        ctx: &StrategyContext,
        weights: &FactorWeights,
        snapshot: &FactorSnapshot,
        bars: &[PriceBar],
        overnight_proxy: f64,
    ) -> Adjustment {
        match ctx.kind {
            StrategyKind::Close => apply_close(snapshot.raw, weights),
            StrategyKind::Premarket => {
                let headlines = self.news.headlines(code).unwrap_or_else(|e| {
                    debug!(code, error = %e, "headlines unavailable");
                    Vec::new()
                });
                apply_premarket(snapshot.raw, weights, ctx, &headlines, overnight_proxy)
            }
            StrategyKind::Intraday => {
                let last = &bars[bars.len() - 1];
                let quote = SessionQuote::from_bar(last, snapshot.avg_volume_20);
                let wants_bars = self.config.intraday_mode == IntradayMode::Bars
                    && ctx.branch == IntradayBranch::Phase2;
                let bar_signals = if wants_bars {
                    load_bar_signals(self.market, code, ctx.session_date, bars)
                } else {
                    None
                };
                apply_intraday(
                    snapshot.raw,
                    weights,
                    &quote,
                    self.config.intraday_mode,
                    ctx.branch,
                    bar_signals,
                )
            }
        }
    }

    fn build_candidate(
        &self,
        instrument: &Instrument,
        ctx: &StrategyContext,
        snapshot: &FactorSnapshot,
        bars: &[PriceBar],
        adjustment: Adjustment,
    ) -> Candidate {
        let bucket = instrument
            .size_bucket
            .unwrap_or_else(|| SizeBucket::from_avg_volume(snapshot.avg_volume_20));
        let mut candidate = Candidate::new(
            &instrument.code,
            &instrument.name,
            instrument.sector_or_default(),
            bucket,
            adjustment.total,
        );

        let mut tags = vec![snapshot.style_tag().to_string()];
        if let Some(tag) = ctx.kind.tag() {
            tags.insert(0, tag.to_string());
        }
        let summary = match &adjustment.signals {
            Some(signals) => format!("{} {}", signals.digest(), snapshot.summary()),
            None => snapshot.summary(),
        };

        candidate.strategy = ctx.kind;
        candidate.session_date = ctx.session_date;
        candidate.signal_date = ctx.signal_date;
        candidate.raw = adjustment.raw;
        candidate.weighted = adjustment.weighted;
        candidate.signals = adjustment.signals;
        candidate.price = snapshot.price;
        candidate.change_rate = snapshot.change_rate();
        candidate.target_price = snapshot.target_price();
        candidate.stop_loss = snapshot.stop_loss();
        candidate.high60 = snapshot.high60;
        candidate.low10 = snapshot.low10;
        candidate.tags = tags;
        candidate.summary = summary;
        if self.config.include_sparkline {
            let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
            candidate.sparkline60 = build_sparkline(&closes, SPARKLINE_POINTS);
        }
        candidate
    }
}

/// Keep the highest-scoring candidate per code, in first-seen order.
pub fn dedupe_by_code(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for c in candidates {
        match index.get(&c.code) {
            Some(&i) => {
                if c.score > kept[i].score {
                    kept[i] = c;
                }
            }
            None => {
                index.insert(c.code.clone(), kept.len());
                kept.push(c);
            }
        }
    }
    kept
}

/// Stable descending sort by score.
pub fn sort_by_score(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}
