//! Intraday branch: opening range, VWAP deviation and relative volume.
//!
//! Two signal sources:
//! - **proxy**: the session's daily OHLCV. The opening-range score comes
//!   from the open drift and the close's position inside the day's range,
//!   VWAP is approximated by `(H + L + C) / 3`, and RVOL is today's volume
//!   over the 20-day average.
//! - **bars**: 5-minute bars restricted to 09:00–15:20. The opening range
//!   is the first three bars, VWAP is cumulative, and RVOL compares the
//!   cumulative volume with the same time of day on prior sessions. Bars
//!   also yield momentum, in-play and overnight-reversal scores.
//!
//! Bars are only consulted under the `phase2` branch in `bars` mode; when
//! none are usable the proxy signals are used and the mode label records it.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use super::Adjustment;
use crate::calendar::hhmm;
use crate::domain::{
    change_pct, clamp_score, round_to, BarSignalDetail, FactorScore, FactorWeights,
    IntradayBranch, IntradayMode, IntradaySignalMode, IntradaySignals, Interval, PriceBar,
    SignalDetail,
};
use crate::provider::MarketData;

/// Bars forming the opening range.
pub const OPENING_RANGE_BARS: usize = 3;

/// Calendar days of 5-minute history fetched for the RVOL baseline.
const BAR_LOOKBACK_DAYS: i64 = 13;

/// The session's daily bar, as seen mid-session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionQuote {
    pub open: f64,
    pub price: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub avg_volume_20: f64,
}

impl SessionQuote {
    pub fn from_bar(bar: &PriceBar, avg_volume_20: f64) -> Self {
        Self {
            open: bar.open,
            price: bar.close,
            high: bar.high,
            low: bar.low,
            volume: bar.volume,
            avg_volume_20,
        }
    }
}

// ─── Proxy signals ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProxySignals {
    pub orb_score: f64,
    pub vwap_score: f64,
    pub rvol_score: f64,
    pub vwap_price: f64,
    pub rvol_ratio: f64,
}

pub fn proxy_signals(q: &SessionQuote) -> ProxySignals {
    let range_span = (q.high - q.low).max((q.price * 0.005).max(1.0));
    let range_position = ((q.price - q.low) / range_span).clamp(0.0, 1.0);
    let open_drift = change_pct(q.open, q.price).unwrap_or(0.0);
    let orb_score = clamp_score(5.0 + open_drift * 1.4 + (range_position - 0.5) * 5.0);

    let vwap_price = (q.high + q.low + q.price) / 3.0;
    let vwap_dev = change_pct(vwap_price, q.price).unwrap_or(0.0);
    let vwap_score = clamp_score(5.0 + vwap_dev * 2.0);

    let rvol_ratio = q.volume / q.avg_volume_20.max(1.0);
    let rvol_score = clamp_score(5.0 + (rvol_ratio - 1.0) * 3.0);

    ProxySignals {
        orb_score,
        vwap_score,
        rvol_score,
        vwap_price,
        rvol_ratio,
    }
}

// ─── Bar signals ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BarSignals {
    pub orb_score: f64,
    pub vwap_score: f64,
    pub rvol_score: f64,
    pub detail: BarSignalDetail,
}

/// Last daily close strictly before `session`.
pub fn previous_close(daily: &[PriceBar], session: NaiveDate) -> Option<f64> {
    daily
        .iter()
        .rev()
        .find(|b| b.date() < session)
        .map(|b| b.close)
        .filter(|c| c.is_finite())
}

fn clean_volume(v: f64) -> f64 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}

/// Bar-derived signals for `session`, or `None` when fewer than three session
/// bars exist or the session has no volume.
pub fn bar_signals(
    bars: &[PriceBar],
    session: NaiveDate,
    prev_close: Option<f64>,
) -> Option<BarSignals> {
    let open_time = hhmm(9, 0);
    let cutoff = hhmm(15, 20);
    let in_hours: Vec<&PriceBar> = bars
        .iter()
        .filter(|b| !b.is_void() && b.time() >= open_time && b.time() <= cutoff)
        .collect();
    let today: Vec<&PriceBar> = in_hours.iter().copied().filter(|b| b.date() == session).collect();
    if today.len() < OPENING_RANGE_BARS {
        return None;
    }

    let opening = &today[..OPENING_RANGE_BARS];
    let orb_high = opening.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let orb_low = opening.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let session_open = today[0].open;
    let last = today[today.len() - 1];
    let last_close = last.close;
    let session_high = today.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let session_low = today.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

    let cum_volume: f64 = today.iter().map(|b| clean_volume(b.volume)).sum();
    if cum_volume <= 0.0 {
        return None;
    }
    let vwap = today
        .iter()
        .map(|b| b.typical_price() * clean_volume(b.volume))
        .sum::<f64>()
        / cum_volume;

    let orb_mid = (orb_high + orb_low) / 2.0;
    let orb_span = (orb_high - orb_low).max((session_open * 0.002).max(0.01));
    let orb_score = clamp_score(5.0 + (last_close - orb_mid) / orb_span * 2.4);

    let vwap_dev = change_pct(vwap, last_close).unwrap_or(0.0);
    let vwap_score = clamp_score(5.0 + vwap_dev * 2.0);

    // Cumulative volume up to the same time of day on prior sessions.
    let now = last.time();
    let mut prior: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for b in in_hours.iter().filter(|b| b.date() < session && b.time() <= now) {
        *prior.entry(b.date()).or_insert(0.0) += clean_volume(b.volume);
    }
    let baseline = if prior.is_empty() {
        0.0
    } else {
        prior.values().sum::<f64>() / prior.len() as f64
    };
    let rvol_ratio = if baseline > 0.0 {
        cum_volume / baseline
    } else {
        1.0
    };
    let rvol_score = clamp_score(5.0 + (rvol_ratio - 1.0) * 3.2);

    let overnight_return = prev_close
        .and_then(|prev| change_pct(prev, session_open))
        .unwrap_or(0.0);
    let intraday_return = change_pct(session_open, last_close).unwrap_or(0.0);
    let momentum = clamp_score(5.0 + intraday_return * 2.4);

    let reversal = overnight_return * intraday_return < 0.0;
    let magnitude = overnight_return.abs().min(intraday_return.abs());
    let swing = if reversal { 2.0 } else { -1.0 };
    let reversal_score = clamp_score(5.0 + swing + magnitude * 1.1);

    let range_pct = (session_high - session_low) / session_open.max(1e-9) * 100.0;
    let in_play = clamp_score(4.5 + range_pct * 1.1 + (rvol_ratio - 1.0) * 2.0);

    Some(BarSignals {
        orb_score,
        vwap_score,
        rvol_score,
        detail: BarSignalDetail {
            orb_high: round_to(orb_high, 3),
            orb_low: round_to(orb_low, 3),
            vwap_price: round_to(vwap, 3),
            in_play_score: in_play,
            intraday_momentum_score: momentum,
            overnight_reversal_score: reversal_score,
            rvol_profile_ratio: round_to(rvol_ratio, 3),
            overnight_return_pct: round_to(overnight_return, 3),
            intraday_return_pct: round_to(intraday_return, 3),
        },
    })
}

/// Fetch 5-minute bars around `session` and derive bar signals.
///
/// `daily` supplies the previous close for the overnight return.
pub fn load_bar_signals(
    market: &dyn MarketData,
    code: &str,
    session: NaiveDate,
    daily: &[PriceBar],
) -> Option<BarSignals> {
    let start = session - Duration::days(BAR_LOOKBACK_DAYS);
    let bars = match market.fetch_history(code, start, session, Interval::FiveMinute) {
        Ok(bars) => bars,
        Err(e) => {
            debug!(code, error = %e, "intraday bars unavailable");
            return None;
        }
    };
    let signals = bar_signals(&bars, session, previous_close(daily, session));
    if signals.is_none() {
        debug!(code, bars = bars.len(), "intraday bars unusable, using proxy");
    }
    signals
}

// ─── Blend ───────────────────────────────────────────────────────────

fn signal_mode(
    has_bars: bool,
    mode: IntradayMode,
    branch: IntradayBranch,
) -> IntradaySignalMode {
    match (has_bars, mode, branch) {
        (true, _, _) => IntradaySignalMode::BarsPhase2,
        (false, IntradayMode::Proxy, _) => IntradaySignalMode::Proxy,
        (false, IntradayMode::Bars, IntradayBranch::Phase2) => IntradaySignalMode::ProxyFallback,
        (false, IntradayMode::Bars, IntradayBranch::Baseline) => IntradaySignalMode::ProxyBaseline,
    }
}

/// Intraday blend. `bars` is ignored unless `mode` is bars and `branch` is
/// phase2.
pub fn apply_intraday(
    raw: FactorScore,
    weights: &FactorWeights,
    quote: &SessionQuote,
    mode: IntradayMode,
    branch: IntradayBranch,
    bars: Option<BarSignals>,
) -> Adjustment {
    let bars = bars.filter(|_| mode == IntradayMode::Bars && branch == IntradayBranch::Phase2);
    let proxy = proxy_signals(quote);

    let (adjusted, orb, vwap, rvol) = match &bars {
        Some(b) => {
            let d = &b.detail;
            let adjusted = FactorScore::new(
                clamp_score(
                    raw.ret * 0.35
                        + b.orb_score * 0.25
                        + b.vwap_score * 0.15
                        + d.intraday_momentum_score * 0.15
                        + d.in_play_score * 0.10,
                ),
                clamp_score(
                    raw.stability * 0.55
                        + (10.0 - (b.vwap_score - 5.0).abs()) * 0.15
                        + d.overnight_reversal_score * 0.15
                        + (10.0 - (d.intraday_momentum_score - 5.0).abs()) * 0.15,
                ),
                clamp_score(raw.market * 0.40 + b.rvol_score * 0.35 + d.in_play_score * 0.25),
            );
            (adjusted, b.orb_score, b.vwap_score, b.rvol_score)
        }
        None => {
            let adjusted = FactorScore::new(
                clamp_score(raw.ret * 0.45 + proxy.orb_score * 0.35 + proxy.vwap_score * 0.20),
                clamp_score(raw.stability * 0.70 + (10.0 - (proxy.vwap_score - 5.0).abs()) * 0.30),
                clamp_score(raw.market * 0.55 + proxy.rvol_score * 0.45),
            );
            (adjusted, proxy.orb_score, proxy.vwap_score, proxy.rvol_score)
        }
    };

    let signals = IntradaySignals {
        mode: signal_mode(bars.is_some(), mode, branch),
        signal_branch: branch,
        orb_score: orb,
        vwap_score: vwap,
        rvol_score: rvol,
        open_price: round_to(quote.open, 3),
        day_high: round_to(quote.high, 3),
        day_low: round_to(quote.low, 3),
        vwap_proxy_price: round_to(proxy.vwap_price, 3),
        rvol_ratio: round_to(proxy.rvol_ratio, 3),
        bars: bars.map(|b| b.detail),
    };
    Adjustment::finalize(adjusted, weights, Some(SignalDetail::Intraday(signals)))
}
