//! Diversification Sampler.
//!
//! Two pure stages over a score-sorted candidate list:
//!
//! - **Balanced sampling** walks the list and admits candidates into the top
//!   `top_n` while neither their sector nor their size bucket has reached its
//!   cap; the rest are deferred. Any shortfall is backfilled from the deferred
//!   pool by the key `(sector_used, bucket_used, -score)`, first under the
//!   caps and then, only if nothing fits, with the caps relaxed. Ties on the
//!   key keep the earliest (highest-ranked) deferred candidate.
//! - **Sector exposure cap** applies the same admit/defer walk on sector only
//!   to a narrower top N, then rescues the earliest deferred candidates into
//!   any slots still open.
//!
//! Both stages return `selected ++ deferred` re-ranked by position, so no
//! candidate is ever dropped.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Candidate, SizeBucket};

/// Caps for balanced sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceCaps {
    pub top_n: usize,
    pub max_per_sector: usize,
    pub max_per_bucket: usize,
}

impl Default for BalanceCaps {
    fn default() -> Self {
        Self {
            top_n: 10,
            max_per_sector: 2,
            max_per_bucket: 4,
        }
    }
}

/// Narrower sector-only exposure cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureCap {
    pub top_n: usize,
    pub max_per_sector: usize,
}

impl Default for ExposureCap {
    fn default() -> Self {
        Self {
            top_n: 5,
            max_per_sector: 2,
        }
    }
}

// ─── Usage bookkeeping ───────────────────────────────────────────────

#[derive(Debug, Default)]
struct Usage {
    sectors: HashMap<String, usize>,
    buckets: HashMap<SizeBucket, usize>,
}

impl Usage {
    fn sector(&self, sector: &str) -> usize {
        self.sectors.get(sector).copied().unwrap_or(0)
    }

    fn bucket(&self, bucket: SizeBucket) -> usize {
        self.buckets.get(&bucket).copied().unwrap_or(0)
    }

    fn record(&mut self, c: &Candidate) {
        *self.sectors.entry(c.sector.clone()).or_insert(0) += 1;
        *self.buckets.entry(c.size_bucket).or_insert(0) += 1;
    }
}

pub(crate) fn rerank(candidates: &mut [Candidate]) {
    for (idx, c) in candidates.iter_mut().enumerate() {
        c.rank = idx + 1;
    }
}

// ─── Balanced sampling ───────────────────────────────────────────────

type BackfillKey = (usize, usize, f64);

fn compare_key(a: &BackfillKey, b: &BackfillKey) -> Ordering {
    a.0.cmp(&b.0)
        .then(a.1.cmp(&b.1))
        .then(a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
}

/// Index of the deferred candidate with the smallest backfill key. Only a
/// strictly smaller key replaces the current choice.
fn pick_backfill(
    deferred: &[Candidate],
    usage: &Usage,
    caps: &BalanceCaps,
    strict: bool,
) -> Option<usize> {
    let mut chosen: Option<(usize, BackfillKey)> = None;
    for (idx, c) in deferred.iter().enumerate() {
        let sector_used = usage.sector(&c.sector);
        let bucket_used = usage.bucket(c.size_bucket);
        if strict && (sector_used >= caps.max_per_sector || bucket_used >= caps.max_per_bucket) {
            continue;
        }
        let key = (sector_used, bucket_used, -c.score);
        let better = match &chosen {
            None => true,
            Some((_, best)) => compare_key(&key, best) == Ordering::Less,
        };
        if better {
            chosen = Some((idx, key));
        }
    }
    chosen.map(|(idx, _)| idx)
}

/// Re-order a score-sorted list under sector and size-bucket caps.
pub fn balanced_sample(candidates: Vec<Candidate>, caps: &BalanceCaps) -> Vec<Candidate> {
    if candidates.is_empty() {
        return candidates;
    }

    let mut selected: Vec<Candidate> = Vec::with_capacity(candidates.len());
    let mut deferred: Vec<Candidate> = Vec::new();
    let mut usage = Usage::default();

    for mut c in candidates {
        let sector_limited = usage.sector(&c.sector) >= caps.max_per_sector;
        let bucket_limited = usage.bucket(c.size_bucket) >= caps.max_per_bucket;
        let defer = selected.len() < caps.top_n && (sector_limited || bucket_limited);
        c.balance_deferred = defer;
        if defer {
            deferred.push(c);
            continue;
        }
        if selected.len() < caps.top_n {
            usage.record(&c);
        }
        selected.push(c);
    }

    while selected.len() < caps.top_n && !deferred.is_empty() {
        let pick = pick_backfill(&deferred, &usage, caps, true)
            .or_else(|| pick_backfill(&deferred, &usage, caps, false));
        let Some(idx) = pick else { break };
        let mut c = deferred.remove(idx);
        c.balance_deferred = false;
        usage.record(&c);
        selected.push(c);
    }

    selected.extend(deferred);
    rerank(&mut selected);
    selected
}

// ─── Sector exposure cap ─────────────────────────────────────────────

/// Cap per-sector exposure inside the top N, flagging deferred candidates.
pub fn apply_exposure_cap(candidates: Vec<Candidate>, cap: &ExposureCap) -> Vec<Candidate> {
    if candidates.is_empty() || cap.max_per_sector == 0 {
        return candidates;
    }

    let mut selected: Vec<Candidate> = Vec::with_capacity(candidates.len());
    let mut deferred: Vec<Candidate> = Vec::new();
    let mut sector_count: HashMap<String, usize> = HashMap::new();

    for mut c in candidates {
        let used = sector_count.get(&c.sector).copied().unwrap_or(0);
        let capped = selected.len() < cap.top_n && used >= cap.max_per_sector;
        c.exposure_deferred = capped;
        if capped {
            deferred.push(c);
            continue;
        }
        if selected.len() < cap.top_n {
            *sector_count.entry(c.sector.clone()).or_insert(0) += 1;
        }
        selected.push(c);
    }

    if selected.len() < cap.top_n && !deferred.is_empty() {
        let need = (cap.top_n - selected.len()).min(deferred.len());
        let rest = deferred.split_off(need);
        for mut c in deferred {
            c.exposure_deferred = false;
            selected.push(c);
        }
        deferred = rest;
    }

    selected.extend(deferred);
    rerank(&mut selected);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(code: &str, sector: &str, bucket: SizeBucket, score: f64) -> Candidate {
        Candidate::new(code, code, sector, bucket, score)
    }

    fn codes(list: &[Candidate]) -> Vec<&str> {
        list.iter().map(|c| c.code.as_str()).collect()
    }

    #[test]
    fn empty_input_is_returned_unchanged() {
        assert!(balanced_sample(Vec::new(), &BalanceCaps::default()).is_empty());
        assert!(apply_exposure_cap(Vec::new(), &ExposureCap::default()).is_empty());
    }

    #[test]
    fn sector_cap_defers_third_member() {
        let pool = vec![
            cand("a1", "A", SizeBucket::Mega, 9.0),
            cand("a2", "A", SizeBucket::Large, 8.5),
            cand("a3", "A", SizeBucket::Mid, 8.0),
            cand("b1", "B", SizeBucket::Mid, 7.0),
            cand("c1", "C", SizeBucket::Mid, 6.0),
        ];
        let caps = BalanceCaps {
            top_n: 3,
            max_per_sector: 2,
            max_per_bucket: 4,
        };
        let out = balanced_sample(pool, &caps);
        assert_eq!(codes(&out), vec!["a1", "a2", "b1", "c1", "a3"]);
        assert!(out[4].balance_deferred);
        assert!(!out[3].balance_deferred);
        let ranks: Vec<usize> = out.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn bucket_cap_applies_independently() {
        let pool: Vec<Candidate> = (0..6)
            .map(|i| cand(&format!("m{i}"), &format!("S{i}"), SizeBucket::Mega, 10.0 - i as f64))
            .chain(std::iter::once(cand("x", "X", SizeBucket::Mid, 1.0)))
            .collect();
        let out = balanced_sample(pool, &BalanceCaps::default());
        // Four megas, then the mid, then the capped megas backfilled.
        assert_eq!(codes(&out)[..5], ["m0", "m1", "m2", "m3", "x"]);
        assert_eq!(out.len(), 7);
    }

    #[test]
    fn backfill_prefers_least_used_then_score() {
        let pool = vec![
            cand("a10", "A", SizeBucket::Mid, 10.0),
            cand("a9", "A", SizeBucket::Mid, 9.0),
            cand("b8", "B", SizeBucket::Mid, 8.0),
            cand("b7", "B", SizeBucket::Mid, 7.0),
            cand("a6", "A", SizeBucket::Mid, 6.0),
        ];
        let caps = BalanceCaps {
            top_n: 4,
            max_per_sector: 1,
            max_per_bucket: 10,
        };
        let out = balanced_sample(pool, &caps);
        assert_eq!(codes(&out), vec!["a10", "b8", "a9", "b7", "a6"]);
        // Relaxed backfill clears the flag; the leftover stays deferred.
        assert!(!out[2].balance_deferred);
        assert!(!out[3].balance_deferred);
        assert!(out[4].balance_deferred);
    }

    #[test]
    fn backfill_tie_keeps_first_seen() {
        let pool = vec![
            cand("lead", "A", SizeBucket::Mid, 9.0),
            cand("first", "A", SizeBucket::Mid, 8.0),
            cand("second", "A", SizeBucket::Mid, 8.0),
        ];
        let caps = BalanceCaps {
            top_n: 2,
            max_per_sector: 1,
            max_per_bucket: 10,
        };
        let out = balanced_sample(pool, &caps);
        assert_eq!(codes(&out), vec!["lead", "first", "second"]);
        assert!(out[2].balance_deferred);
    }

    #[test]
    fn unsatisfiable_pool_keeps_score_order() {
        let pool: Vec<Candidate> = (0..12)
            .map(|i| cand(&format!("s{i:02}"), "Semi", SizeBucket::Mega, 20.0 - i as f64))
            .collect();
        let out = balanced_sample(pool, &BalanceCaps::default());
        let expected: Vec<String> = (0..12).map(|i| format!("s{i:02}")).collect();
        assert_eq!(codes(&out), expected.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(out[..10].iter().all(|c| !c.balance_deferred));
        assert!(out[10..].iter().all(|c| c.balance_deferred));
    }

    #[test]
    fn exposure_cap_defers_beyond_sector_limit() {
        let pool = vec![
            cand("a1", "A", SizeBucket::Mid, 9.0),
            cand("a2", "A", SizeBucket::Mid, 8.9),
            cand("a3", "A", SizeBucket::Mid, 8.8),
            cand("b", "B", SizeBucket::Mid, 8.0),
            cand("c", "C", SizeBucket::Mid, 7.0),
            cand("d", "D", SizeBucket::Mid, 6.0),
            cand("e", "E", SizeBucket::Mid, 5.0),
        ];
        let out = apply_exposure_cap(pool, &ExposureCap::default());
        assert_eq!(codes(&out), vec!["a1", "a2", "b", "c", "d", "e", "a3"]);
        assert!(out[6].exposure_deferred);
        assert_eq!(out[6].rank, 7);
    }

    #[test]
    fn exposure_cap_rescues_when_short() {
        let pool = vec![
            cand("a1", "A", SizeBucket::Mid, 9.0),
            cand("a2", "A", SizeBucket::Mid, 8.0),
            cand("a3", "A", SizeBucket::Mid, 7.0),
            cand("a4", "A", SizeBucket::Mid, 6.0),
            cand("a5", "A", SizeBucket::Mid, 5.5),
            cand("a6", "A", SizeBucket::Mid, 5.2),
            cand("b", "B", SizeBucket::Mid, 5.0),
        ];
        let out = apply_exposure_cap(pool, &ExposureCap::default());
        assert_eq!(codes(&out), vec!["a1", "a2", "b", "a3", "a4", "a5", "a6"]);
        assert!(out[..5].iter().all(|c| !c.exposure_deferred));
        assert!(out[5].exposure_deferred);
    }

    #[test]
    fn zero_exposure_cap_is_a_no_op() {
        let pool = vec![cand("a", "A", SizeBucket::Mid, 1.0), cand("b", "A", SizeBucket::Mid, 0.5)];
        let cap = ExposureCap {
            top_n: 5,
            max_per_sector: 0,
        };
        let out = apply_exposure_cap(pool.clone(), &cap);
        assert_eq!(out, pool);
    }
}
