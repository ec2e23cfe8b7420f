use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use copydesk_core::AnalysisResult;

/// Upper bound on retained results.
const MAX_ENTRIES: usize = 100;

struct CacheEntry {
    result: Arc<AnalysisResult>,
    inserted_at: Instant,
}

struct CacheInner {
    entries: HashMap<u64, CacheEntry>,
    // Front is the oldest insertion; lookups never reorder it.
    order: VecDeque<u64>,
    // Bumped by clear; an insert stamped with an older epoch is dropped.
    epoch: u64,
}

/// Bounded fingerprint-to-result store with age-based expiry.
///
/// When full, the oldest insertion is evicted to make room. Re-inserting an
/// existing fingerprint counts as a fresh insertion. Expired entries are
/// evicted on lookup. Each [`clear`](Self::clear) starts a new epoch, and an
/// insert carrying an earlier one is dropped, so a computation that straddles
/// a clear cannot repopulate the store. Memory-only; nothing survives the
/// process.
pub struct ResultCache {
    inner: Mutex<CacheInner>,
    max_entries: usize,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_max_entries(MAX_ENTRIES)
    }

    /// Capacity below one is raised to one; an insert always admits the
    /// newest entry.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                epoch: 0,
            }),
            max_entries: max_entries.max(1),
        }
    }

    /// Returns the cached result unless it is older than `max_age`; an
    /// expired entry is removed before returning `None`.
    pub fn get(&self, fingerprint: u64, max_age: Duration) -> Option<Arc<AnalysisResult>> {
        let mut inner = self.lock();
        let expired = match inner.entries.get(&fingerprint) {
            Some(entry) => entry.inserted_at.elapsed() > max_age,
            None => return None,
        };
        if expired {
            inner.entries.remove(&fingerprint);
            inner.order.retain(|key| *key != fingerprint);
            return None;
        }
        inner
            .entries
            .get(&fingerprint)
            .map(|entry| entry.result.clone())
    }

    /// Epoch to stamp on an [`insert`](Self::insert); capture it when the
    /// computation producing the result begins.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Stores a result, unless a clear has started a newer epoch than the
    /// one stamped on it.
    pub fn insert(&self, fingerprint: u64, result: Arc<AnalysisResult>, epoch: u64) {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            return;
        }
        if inner.entries.remove(&fingerprint).is_some() {
            inner.order.retain(|key| *key != fingerprint);
        } else if inner.entries.len() >= self.max_entries {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        inner.order.push_back(fingerprint);
        inner.entries.insert(
            fingerprint,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use copydesk_core::{
        AnalysisResult, AnnotatedContent, ProcessingInfo, QualityMetrics,
    };

    use super::ResultCache;

    fn sample_result(marker: &str) -> Arc<AnalysisResult> {
        Arc::new(AnalysisResult {
            annotated: AnnotatedContent {
                html: marker.to_string(),
                issues: Vec::new(),
            },
            sentences: Vec::new(),
            metrics: QualityMetrics {
                overall_score: 1.0,
                clarity_score: 1.0,
                grammar_score: 1.0,
                word_count: 1,
            },
            processing: ProcessingInfo {
                model_version: "test".to_string(),
                duration_ms: 1,
            },
        })
    }

    const LONG: Duration = Duration::from_secs(3600);

    #[test]
    fn miss_on_unknown_fingerprint() {
        let cache = ResultCache::new();
        assert!(cache.get(1, LONG).is_none());
    }

    #[test]
    fn fresh_entry_is_returned() {
        let cache = ResultCache::new();
        cache.insert(1, sample_result("a"), cache.epoch());
        let hit = cache.get(1, LONG).unwrap();
        assert_eq!(hit.annotated.html, "a");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_entry_is_evicted_on_lookup() {
        let cache = ResultCache::new();
        cache.insert(1, sample_result("a"), cache.epoch());
        std::thread::sleep(Duration::from_millis(1));
        assert!(cache.get(1, Duration::ZERO).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn oldest_insertion_is_evicted_at_capacity() {
        let cache = ResultCache::with_max_entries(2);
        cache.insert(1, sample_result("a"), cache.epoch());
        cache.insert(2, sample_result("b"), cache.epoch());
        cache.insert(3, sample_result("c"), cache.epoch());

        assert_eq!(cache.len(), 2);
        assert!(cache.get(1, LONG).is_none());
        assert!(cache.get(2, LONG).is_some());
        assert!(cache.get(3, LONG).is_some());
    }

    #[test]
    fn reinsert_counts_as_fresh_insertion() {
        let cache = ResultCache::with_max_entries(2);
        cache.insert(1, sample_result("a"), cache.epoch());
        cache.insert(2, sample_result("b"), cache.epoch());
        cache.insert(1, sample_result("a2"), cache.epoch());
        cache.insert(3, sample_result("c"), cache.epoch());

        // 2 was the oldest insertion once 1 was refreshed.
        assert!(cache.get(2, LONG).is_none());
        assert_eq!(cache.get(1, LONG).unwrap().annotated.html, "a2");
        assert!(cache.get(3, LONG).is_some());
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = ResultCache::new();
        cache.insert(1, sample_result("a"), cache.epoch());
        cache.insert(2, sample_result("b"), cache.epoch());
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert!(cache.get(1, LONG).is_none());
    }

    #[test]
    fn insert_from_before_a_clear_is_dropped() {
        let cache = ResultCache::new();
        let epoch = cache.epoch();
        cache.insert(1, sample_result("a"), epoch);
        cache.clear();

        cache.insert(2, sample_result("b"), epoch);
        assert_eq!(cache.len(), 0);
        assert!(cache.get(2, LONG).is_none());

        cache.insert(2, sample_result("b"), cache.epoch());
        assert_eq!(cache.get(2, LONG).unwrap().annotated.html, "b");
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let cache = ResultCache::with_max_entries(0);
        assert_eq!(cache.max_entries(), 1);

        cache.insert(1, sample_result("a"), cache.epoch());
        cache.insert(2, sample_result("b"), cache.epoch());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(1, LONG).is_none());
        assert_eq!(cache.get(2, LONG).unwrap().annotated.html, "b");
    }
}
