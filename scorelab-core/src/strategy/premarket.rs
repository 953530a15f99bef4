//! Premarket branch: headline sentiment and the overnight index proxy.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use super::Adjustment;
use crate::calendar::hhmm;
use crate::domain::{
    clamp_score, last_change_pct, round_to, FactorScore, FactorWeights, Interval,
    PremarketSignals, SignalDetail, StrategyContext,
};
use crate::provider::{Headline, MarketData};

const POSITIVE_KEYWORDS: &[&str] = &[
    "beat",
    "upgrade",
    "growth",
    "record",
    "partnership",
    "contract",
    "approval",
    "surge",
    "gain",
    "strong",
    "expansion",
    "ai",
    "new order",
    "raised guidance",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "miss",
    "downgrade",
    "lawsuit",
    "probe",
    "delay",
    "cut",
    "drop",
    "recall",
    "weak",
    "decline",
    "loss",
    "risk",
    "guidance cut",
];

/// Headlines analyzed per instrument.
pub const MAX_HEADLINES: usize = 5;

/// Global indices whose last session move stands in for overnight risk.
pub const OVERNIGHT_BASKET: [&str; 3] = ["^GSPC", "^IXIC", "^SOX"];

/// Calendar days of daily history fetched per basket index.
const OVERNIGHT_LOOKBACK_DAYS: i64 = 13;

const NEUTRAL: f64 = 5.0;

// ─── News window ─────────────────────────────────────────────────────

/// Headline window between the prior session close and the premarket start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewsWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl NewsWindow {
    /// `(signal_date 15:30, session_date 08:00]`.
    pub fn for_session(session_date: NaiveDate, signal_date: NaiveDate) -> Self {
        Self {
            start: signal_date.and_time(hhmm(15, 30)),
            end: session_date.and_time(hhmm(8, 0)),
        }
    }

    /// Start-exclusive, end-inclusive: a headline stamped exactly at the
    /// prior close is left out, one stamped exactly at 08:00 is kept.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts > self.start && ts <= self.end
    }

    /// The 24 hours up to the window end, both ends inclusive.
    pub fn in_fallback(&self, ts: NaiveDateTime) -> bool {
        ts >= self.end - Duration::hours(24) && ts <= self.end
    }
}

/// Up to [`MAX_HEADLINES`] titles from the primary window, else from the
/// fallback window. The flag reports whether the primary window was used.
pub fn select_headlines(headlines: &[Headline], window: &NewsWindow) -> (Vec<String>, bool) {
    let mut primary = Vec::new();
    let mut fallback = Vec::new();
    for h in headlines {
        let title = h.title.trim();
        if title.is_empty() {
            continue;
        }
        if window.contains(h.published_at) && primary.len() < MAX_HEADLINES {
            primary.push(title.to_string());
        }
        if window.in_fallback(h.published_at) && fallback.len() < MAX_HEADLINES {
            fallback.push(title.to_string());
        }
    }
    if !primary.is_empty() {
        (primary, true)
    } else {
        (fallback, false)
    }
}

/// Keyword polarity: `clamp(5 + 2.5·(pos − neg)/n)`. Each keyword counts at
/// most once per title and matches as a substring. No titles → 5.0.
pub fn sentiment_score<S: AsRef<str>>(titles: &[S]) -> f64 {
    if titles.is_empty() {
        return NEUTRAL;
    }
    let mut balance: i64 = 0;
    for title in titles {
        let lowered = title.as_ref().to_lowercase();
        let pos = POSITIVE_KEYWORDS.iter().filter(|kw| lowered.contains(*kw)).count();
        let neg = NEGATIVE_KEYWORDS.iter().filter(|kw| lowered.contains(*kw)).count();
        balance += pos as i64 - neg as i64;
    }
    clamp_score(NEUTRAL + balance as f64 / titles.len() as f64 * 2.5)
}

// ─── Overnight proxy ─────────────────────────────────────────────────

/// Last-session percent change of each basket index that has data.
pub fn overnight_changes<S: AsRef<str>>(
    market: &dyn MarketData,
    basket: &[S],
    session_date: NaiveDate,
) -> Vec<f64> {
    let start = session_date - Duration::days(OVERNIGHT_LOOKBACK_DAYS);
    basket
        .iter()
        .filter_map(|symbol| {
            let symbol = symbol.as_ref();
            match market.fetch_history(symbol, start, session_date, Interval::Daily) {
                Ok(bars) => last_change_pct(&bars),
                Err(e) => {
                    debug!(symbol, error = %e, "overnight index unavailable");
                    None
                }
            }
        })
        .collect()
}

/// `clamp(5 + 1.8·mean(changes))`; no data → 5.0.
pub fn overnight_proxy_score(changes: &[f64]) -> f64 {
    if changes.is_empty() {
        return NEUTRAL;
    }
    let mean = changes.iter().sum::<f64>() / changes.len() as f64;
    clamp_score(NEUTRAL + mean * 1.8)
}

// ─── Blend ───────────────────────────────────────────────────────────

/// Premarket blend. `overnight_proxy` is computed once per request and
/// shared across instruments.
pub fn apply_premarket(
    raw: FactorScore,
    weights: &FactorWeights,
    ctx: &StrategyContext,
    headlines: &[Headline],
    overnight_proxy: f64,
) -> Adjustment {
    let window = NewsWindow::for_session(ctx.session_date, ctx.signal_date);
    let (titles, used_primary_window) = select_headlines(headlines, &window);
    let news_sentiment = sentiment_score(&titles);

    let adjusted = FactorScore::new(
        clamp_score(raw.ret * 0.65 + news_sentiment * 0.35),
        clamp_score(raw.stability),
        clamp_score(raw.market * 0.70 + overnight_proxy * 0.30),
    );
    let signals = PremarketSignals {
        news_sentiment: round_to(news_sentiment, 3),
        overnight_proxy: round_to(overnight_proxy, 3),
        news_window_start: window.start,
        news_window_end: window.end,
        used_primary_window,
        analyzed_news_count: titles.len(),
    };
    Adjustment::finalize(adjusted, weights, Some(SignalDetail::Premarket(signals)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceBar;
    use crate::provider::ProviderError;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_time(hhmm(h, m))
    }

    fn headline(title: &str, published_at: NaiveDateTime) -> Headline {
        Headline {
            title: title.to_string(),
            published_at,
        }
    }

    fn window() -> NewsWindow {
        // Friday close → Monday open
        NewsWindow::for_session(d(2024, 3, 11), d(2024, 3, 8))
    }

    #[test]
    fn window_excludes_prior_close_and_includes_open() {
        let w = window();
        assert!(!w.contains(at(d(2024, 3, 8), 15, 30)));
        assert!(w.contains(at(d(2024, 3, 8), 15, 31)));
        assert!(w.contains(at(d(2024, 3, 11), 8, 0)));
        assert!(!w.contains(at(d(2024, 3, 11), 8, 1)));
    }

    #[test]
    fn primary_window_wins_and_is_capped() {
        let w = window();
        let mut news: Vec<Headline> = (0..7)
            .map(|i| headline(&format!("headline {i}"), at(d(2024, 3, 9), 10, i)))
            .collect();
        news.push(headline("   ", at(d(2024, 3, 9), 11, 0)));
        let (titles, primary) = select_headlines(&news, &w);
        assert!(primary);
        assert_eq!(titles.len(), MAX_HEADLINES);
        assert_eq!(titles[0], "headline 0");
    }

    #[test]
    fn falls_back_to_last_24_hours() {
        // Session-day window whose primary range is empty for this headline:
        // published exactly at the prior close.
        let w = NewsWindow::for_session(d(2024, 3, 12), d(2024, 3, 11));
        let news = vec![
            headline("at close", at(d(2024, 3, 11), 15, 30)),
            headline("too old", at(d(2024, 3, 10), 7, 0)),
        ];
        let (titles, primary) = select_headlines(&news, &w);
        assert!(!primary);
        assert_eq!(titles, vec!["at close".to_string()]);
    }

    #[test]
    fn nothing_in_either_window() {
        let news = vec![headline("stale", at(d(2024, 1, 2), 9, 0))];
        let (titles, primary) = select_headlines(&news, &window());
        assert!(titles.is_empty());
        assert!(!primary);
    }

    #[test]
    fn sentiment_counts_keyword_balance() {
        assert_eq!(sentiment_score::<&str>(&[]), 5.0);
        let titles = [
            "Samsung wins new order, record growth",
            "Chipmaker posts loss amid probe",
        ];
        // (3 − 2) / 2 · 2.5 = 1.25
        assert_eq!(sentiment_score(&titles), 6.25);
        assert_eq!(sentiment_score(&["Probe, lawsuit and recall: weak decline"]), 1.0);
    }

    #[test]
    fn overnight_proxy_maps_mean_change() {
        assert_eq!(overnight_proxy_score(&[]), 5.0);
        assert_eq!(overnight_proxy_score(&[1.0, 0.0, 2.0]), 6.8);
        assert_eq!(overnight_proxy_score(&[-5.0]), 1.0);
    }

    struct Indices;

    impl MarketData for Indices {
        fn name(&self) -> &str {
            "indices"
        }

        fn fetch_history(
            &self,
            code: &str,
            _start: NaiveDate,
            end: NaiveDate,
            _interval: Interval,
        ) -> Result<Vec<PriceBar>, ProviderError> {
            let closes: &[f64] = match code {
                "^GSPC" => &[100.0, 102.0],
                "^IXIC" => &[50.0],
                _ => {
                    return Err(ProviderError::SymbolNotFound {
                        symbol: code.to_string(),
                    })
                }
            };
            Ok(closes
                .iter()
                .map(|&c| PriceBar::daily(end, c, c, c, c, 0.0))
                .collect())
        }
    }

    #[test]
    fn overnight_changes_skip_missing_indices() {
        let changes = overnight_changes(&Indices, &OVERNIGHT_BASKET, d(2024, 3, 11));
        assert_eq!(changes.len(), 1);
        assert!((changes[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn premarket_blend_moves_return_and_market_only() {
        let ctx = StrategyContext::premarket(d(2024, 3, 11), d(2024, 3, 8));
        let news = vec![headline("Record contract win", at(d(2024, 3, 10), 20, 0))];
        let adj = apply_premarket(
            FactorScore::new(6.0, 7.0, 4.0),
            &FactorWeights::default(),
            &ctx,
            &news,
            8.0,
        );
        // sentiment: 5 + 2·2.5 = 10 → return 6·0.65 + 10·0.35 = 7.4
        assert_eq!(adj.raw.ret, 7.4);
        assert_eq!(adj.raw.stability, 7.0);
        // market 4·0.7 + 8·0.3 = 5.2
        assert_eq!(adj.raw.market, 5.2);
        match adj.signals {
            Some(SignalDetail::Premarket(ref s)) => {
                assert_eq!(s.news_sentiment, 10.0);
                assert!(s.used_primary_window);
                assert_eq!(s.analyzed_news_count, 1);
                assert_eq!(s.news_window_end, at(d(2024, 3, 11), 8, 0));
            }
            ref other => panic!("unexpected signals: {other:?}"),
        }
    }
}
