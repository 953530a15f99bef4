//! Property tests for scoring invariants.
//!
//! Uses proptest to verify:
//! 1. Weight normalization: valid triples sum to 1, invalid ones are rejected
//! 2. Market factor: non-decreasing in volume and never above 10
//! 3. Diversification: the top 10 respects sector and bucket caps whenever
//!    the pool can satisfy them, and no candidate is ever dropped
//! 4. Sparkline: bounded to 0..100

use std::collections::HashMap;

use proptest::prelude::*;
use scorelab_core::diversify::{apply_exposure_cap, balanced_sample, BalanceCaps, ExposureCap};
use scorelab_core::domain::{Candidate, FactorWeights, SizeBucket, WeightError};
use scorelab_core::factors::market_score;
use scorelab_core::indicators::build_sparkline;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_weight() -> impl Strategy<Value = f64> {
    0.0..100.0_f64
}

/// Sector index and score. The bucket is a function of the sector, which
/// is how real universes behave (a sector's members share a size class in
/// these fixtures) and makes cap feasibility exactly computable.
fn arb_pool() -> impl Strategy<Value = Vec<(u8, f64)>> {
    prop::collection::vec((0u8..7, 1.0..10.0_f64), 10..40)
}

fn bucket_of(sector: u8) -> SizeBucket {
    match sector % 3 {
        0 => SizeBucket::Mega,
        1 => SizeBucket::Large,
        _ => SizeBucket::Mid,
    }
}

fn build_pool(raw: &[(u8, f64)]) -> Vec<Candidate> {
    let mut pool: Vec<Candidate> = raw
        .iter()
        .enumerate()
        .map(|(i, &(sector, score))| {
            let score = (score * 10.0).round() / 10.0;
            Candidate::new(&format!("C{i:03}"), "x", &format!("S{sector}"), bucket_of(sector), score)
        })
        .collect();
    pool.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    pool
}

/// Largest cap-respecting selection the pool admits.
fn capacity(raw: &[(u8, f64)], caps: &BalanceCaps) -> usize {
    let mut per_sector: HashMap<u8, usize> = HashMap::new();
    for &(sector, _) in raw {
        *per_sector.entry(sector).or_insert(0) += 1;
    }
    let mut per_bucket: HashMap<SizeBucket, usize> = HashMap::new();
    for (sector, n) in per_sector {
        *per_bucket.entry(bucket_of(sector)).or_insert(0) += n.min(caps.max_per_sector);
    }
    per_bucket.values().map(|&n| n.min(caps.max_per_bucket)).sum()
}

// ── 1. Weight normalization ──────────────────────────────────────────

proptest! {
    #[test]
    fn normalized_weights_sum_to_one(r in arb_weight(), s in arb_weight(), m in arb_weight()) {
        prop_assume!(r + s + m > 0.0);
        let w = FactorWeights::normalize(r, s, m).unwrap();
        prop_assert!((w.sum() - 1.0).abs() < 1e-6);
        prop_assert!(w.ret >= 0.0 && w.stability >= 0.0 && w.market >= 0.0);
    }

    #[test]
    fn negative_component_is_rejected(r in arb_weight(), s in arb_weight(), neg in 0.001..50.0_f64) {
        let err = FactorWeights::normalize(r, s, -neg).unwrap_err();
        let is_negative = matches!(err, WeightError::Negative { component: "market", .. });
        prop_assert!(is_negative);
    }
}

// ── 2. Market factor ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn market_score_is_monotonic_and_bounded(a in 1.0..1e13_f64, b in 1.0..1e13_f64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(market_score(lo) <= market_score(hi));
        prop_assert!(market_score(hi) <= 10.0);
        prop_assert!(market_score(lo) >= 1.0);
    }
}

// ── 3. Diversification ───────────────────────────────────────────────

proptest! {
    #[test]
    fn balanced_top_ten_respects_caps_when_feasible(raw in arb_pool()) {
        let caps = BalanceCaps::default();
        let pool = build_pool(&raw);
        let out = balanced_sample(pool.clone(), &caps);

        prop_assert_eq!(out.len(), pool.len());
        for (i, c) in out.iter().enumerate() {
            prop_assert_eq!(c.rank, i + 1);
        }

        if capacity(&raw, &caps) >= caps.top_n {
            let mut sectors: HashMap<&str, usize> = HashMap::new();
            let mut buckets: HashMap<SizeBucket, usize> = HashMap::new();
            for c in out.iter().take(caps.top_n) {
                *sectors.entry(c.sector.as_str()).or_insert(0) += 1;
                *buckets.entry(c.size_bucket).or_insert(0) += 1;
            }
            prop_assert!(sectors.values().all(|&n| n <= caps.max_per_sector));
            prop_assert!(buckets.values().all(|&n| n <= caps.max_per_bucket));
        }
    }

    #[test]
    fn exposure_cap_keeps_every_candidate(raw in arb_pool(), top_n in 1usize..8, max in 1usize..3) {
        let pool = build_pool(&raw);
        let out = apply_exposure_cap(pool.clone(), &ExposureCap { top_n, max_per_sector: max });
        prop_assert_eq!(out.len(), pool.len());
        let mut codes: Vec<&str> = out.iter().map(|c| c.code.as_str()).collect();
        codes.sort_unstable();
        let mut expected: Vec<&str> = pool.iter().map(|c| c.code.as_str()).collect();
        expected.sort_unstable();
        prop_assert_eq!(codes, expected);
    }
}

// ── 4. Sparkline ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn sparkline_is_bounded(values in prop::collection::vec(1.0..1e6_f64, 1..120)) {
        let line = build_sparkline(&values, 60);
        prop_assert_eq!(line.len(), values.len().min(60));
        prop_assert!(line.iter().all(|v| (0.0..=100.0).contains(v)));
    }
}
