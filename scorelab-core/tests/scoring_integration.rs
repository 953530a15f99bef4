//! End-to-end scoring against the synthetic market: availability → context →
//! candidates → regime.

use chrono::NaiveDate;
use scorelab_core::calendar::{hhmm, WeekdayCalendar};
use scorelab_core::domain::{StrategyKind, SignalDetail};
use scorelab_core::regime::{market_overview, reference_index_changes};
use scorelab_core::{
    detect_regime, resolve_strategy_context, ScoreRequest, Scorer, ScoringConfig,
    SyntheticMarket, Universe,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn default_universe_is_fully_scored_and_diversified() {
    let market = SyntheticMarket::new(2024);
    let calendar = WeekdayCalendar::new();
    let scorer = Scorer::new(&market, &calendar, ScoringConfig::default());
    let universe = Universe::default_krx();

    let resolved = resolve_strategy_context(
        &calendar,
        None,
        Some(d(2024, 6, 14)),
        d(2024, 6, 17).and_time(hhmm(10, 0)),
    )
    .unwrap();
    assert_eq!(resolved.context.kind, StrategyKind::Close);

    let resp = scorer
        .score_candidates(&universe, &ScoreRequest::new(resolved.context))
        .unwrap();
    assert_eq!(resp.candidates.len(), universe.len());

    let top: Vec<_> = resp.candidates.iter().take(10).collect();
    for c in &top {
        assert!(!c.balance_deferred);
        let same_sector = top.iter().filter(|o| o.sector == c.sector).count();
        assert!(same_sector <= 2, "sector {} appears {same_sector} times", c.sector);
    }
    assert_eq!(
        resp.candidates.iter().filter(|c| c.strong_recommendation).count(),
        5
    );
}

#[test]
fn same_seed_gives_identical_rankings() {
    let calendar = WeekdayCalendar::new();
    let universe = Universe::default_krx();
    let request = ScoreRequest::new(scorelab_core::domain::StrategyContext::same_day(
        StrategyKind::Intraday,
        d(2024, 6, 14),
    ));

    let a = SyntheticMarket::new(5);
    let b = SyntheticMarket::new(5);
    let ra = Scorer::new(&a, &calendar, ScoringConfig::default())
        .score_candidates(&universe, &request)
        .unwrap();
    let rb = Scorer::new(&b, &calendar, ScoringConfig::default())
        .score_candidates(&universe, &request)
        .unwrap();
    assert_eq!(ra, rb);
    assert!(ra
        .candidates
        .iter()
        .all(|c| matches!(c.signals, Some(SignalDetail::Intraday(_)))));
}

#[test]
fn regime_over_scored_candidates() {
    let market = SyntheticMarket::new(77);
    let calendar = WeekdayCalendar::new();
    let scorer = Scorer::new(&market, &calendar, ScoringConfig::default());
    let date = d(2024, 6, 14);
    let resp = scorer
        .score_candidates(
            &Universe::default_krx(),
            &ScoreRequest::new(scorelab_core::domain::StrategyContext::same_day(
                StrategyKind::Close,
                date,
            )),
        )
        .unwrap();

    let indices = reference_index_changes(&market, date);
    assert_eq!(indices.len(), 3);
    let assessment = detect_regime(&resp.candidates, &indices);
    assert!((25.0..=95.0).contains(&assessment.confidence));
    assert!((assessment.suggested_weights.sum() - 1.0).abs() < 1e-9);

    let overview = market_overview(&resp.candidates, indices);
    assert_eq!(
        overview.up + overview.steady + overview.down,
        resp.candidates.len()
    );
    assert_eq!(overview.regime_recommendation, assessment);
}
