//! Structured result-cache key and the cache capability trait.
//!
//! Scoring and validation never consult a cache themselves. A serving layer
//! builds a [`CacheKey`] per request and owns whatever [`ResultCache`] it
//! likes; [`InMemoryCache`] is the reference implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{FactorWeights, IntradayBranch, StrategyKind};
use crate::universe::Universe;

/// Identity of a cached candidate list or validation summary.
///
/// Weights are stored at six decimals so that keys are hashable and two
/// requests with the same normalized weights share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub strategy: StrategyKind,
    pub date: NaiveDate,
    /// Only meaningful for intraday.
    pub branch: Option<IntradayBranch>,
    pub weights: String,
    pub universe_hash: String,
}

impl CacheKey {
    pub fn new(
        strategy: StrategyKind,
        date: NaiveDate,
        branch: IntradayBranch,
        weights: &FactorWeights,
        universe: &Universe,
    ) -> Self {
        Self {
            strategy,
            date,
            branch: (strategy == StrategyKind::Intraday).then_some(branch),
            weights: format!(
                "{:.6},{:.6},{:.6}",
                weights.ret, weights.stability, weights.market
            ),
            universe_hash: universe.fingerprint(),
        }
    }

    /// Stable BLAKE3 digest of the key, for external stores keyed by string.
    pub fn digest(&self) -> String {
        let canonical = serde_json::json!({
            "strategy": self.strategy.as_str(),
            "date": self.date.to_string(),
            "branch": self.branch.map(|b| b.as_str()),
            "weights": &self.weights,
            "universe": &self.universe_hash,
        });
        blake3::hash(canonical.to_string().as_bytes())
            .to_hex()
            .to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.strategy, self.date)?;
        if let Some(branch) = self.branch {
            write!(f, ":{branch}")?;
        }
        write!(f, ":{}", &self.universe_hash[..self.universe_hash.len().min(12)])
    }
}

/// Keyed get/put/invalidate store.
pub trait ResultCache<V>: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<V>;
    fn put(&self, key: CacheKey, value: V);
    /// Returns whether an entry was removed.
    fn invalidate(&self, key: &CacheKey) -> bool;
}

/// Process-local cache behind a mutex.
#[derive(Debug)]
pub struct InMemoryCache<V> {
    entries: Mutex<HashMap<CacheKey, V>>,
}

impl<V> Default for InMemoryCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> InMemoryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every entry for `date`, returning how many were removed.
    pub fn invalidate_date(&self, date: NaiveDate) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|k, _| k.date != date);
        before - entries.len()
    }
}

impl<V: Clone + Send> ResultCache<V> for InMemoryCache<V> {
    fn get(&self, key: &CacheKey) -> Option<V> {
        self.lock().get(key).cloned()
    }

    fn put(&self, key: CacheKey, value: V) {
        self.lock().insert(key, value);
    }

    fn invalidate(&self, key: &CacheKey) -> bool {
        self.lock().remove(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::Instrument;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn universe(codes: &[&str]) -> Universe {
        Universe::new(codes.iter().map(|c| Instrument::new(c, c)))
    }

    fn key(strategy: StrategyKind, branch: IntradayBranch) -> CacheKey {
        CacheKey::new(
            strategy,
            d(11),
            branch,
            &FactorWeights::default(),
            &universe(&["005930", "000660"]),
        )
    }

    #[test]
    fn branch_only_distinguishes_intraday() {
        assert_eq!(
            key(StrategyKind::Close, IntradayBranch::Baseline),
            key(StrategyKind::Close, IntradayBranch::Phase2)
        );
        assert_ne!(
            key(StrategyKind::Intraday, IntradayBranch::Baseline),
            key(StrategyKind::Intraday, IntradayBranch::Phase2)
        );
    }

    #[test]
    fn universe_order_does_not_matter() {
        let w = FactorWeights::default();
        let a = CacheKey::new(StrategyKind::Close, d(11), IntradayBranch::Phase2, &w, &universe(&["a", "b"]));
        let b = CacheKey::new(StrategyKind::Close, d(11), IntradayBranch::Phase2, &w, &universe(&["b", "a"]));
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn weights_change_the_digest() {
        let u = universe(&["a"]);
        let a = CacheKey::new(StrategyKind::Close, d(11), IntradayBranch::Phase2, &FactorWeights::default(), &u);
        let w = FactorWeights::normalize(1.0, 1.0, 1.0).unwrap();
        let b = CacheKey::new(StrategyKind::Close, d(11), IntradayBranch::Phase2, &w, &u);
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.weights, "0.400000,0.300000,0.300000");
    }

    #[test]
    fn in_memory_get_put_invalidate() {
        let cache: InMemoryCache<Vec<String>> = InMemoryCache::new();
        let k = key(StrategyKind::Close, IntradayBranch::Phase2);
        assert!(cache.get(&k).is_none());
        cache.put(k.clone(), vec!["005930".to_string()]);
        assert_eq!(cache.get(&k).unwrap(), vec!["005930".to_string()]);
        assert!(cache.invalidate(&k));
        assert!(!cache.invalidate(&k));
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_by_date() {
        let cache: InMemoryCache<u32> = InMemoryCache::new();
        cache.put(key(StrategyKind::Close, IntradayBranch::Phase2), 1);
        cache.put(key(StrategyKind::Intraday, IntradayBranch::Phase2), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.invalidate_date(d(12)), 0);
        assert_eq!(cache.invalidate_date(d(11)), 2);
    }

    #[test]
    fn display_is_compact() {
        let k = key(StrategyKind::Intraday, IntradayBranch::Baseline);
        let s = k.to_string();
        assert!(s.starts_with("intraday:2024-03-11:baseline:"));
    }
}
