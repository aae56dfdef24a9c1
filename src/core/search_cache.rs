// src/core/search_cache.rs — Run-scoped memoization of search units

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::types::SearchOutcome;

/// Exact-match key: the same query with a different result count is a miss.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    pub query: String,
    pub result_count: u32,
}

impl SearchKey {
    pub fn new(query: impl Into<String>, result_count: u32) -> Self {
        Self {
            query: query.into(),
            result_count,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Shared by every unit of every wave in a run (wrap in `Arc`).
/// Entries are never evicted. Only successful outcomes are stored.
#[derive(Default)]
pub struct SearchCache {
    entries: Mutex<HashMap<SearchKey, SearchOutcome>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a processed outcome. Counts a hit or a miss.
    pub fn get(&self, key: &SearchKey) -> Option<SearchOutcome> {
        let found = self
            .entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned());
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Store `outcome` unless the key is already present, atomically per key.
    /// Returns the value that ends up cached (the earlier one on a race).
    pub fn insert_if_absent(&self, key: SearchKey, outcome: SearchOutcome) -> SearchOutcome {
        match self.entries.lock() {
            Ok(mut entries) => entries.entry(key).or_insert(outcome).clone(),
            // A poisoned map still lets the caller use its own result
            Err(_) => outcome,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TokenUsage;
    use std::sync::Arc;

    fn outcome(query: &str, text: &str) -> SearchOutcome {
        SearchOutcome {
            query: query.into(),
            ordinal: 0,
            text: text.into(),
            sources: vec![],
            error: None,
            usage: TokenUsage::default(),
        }
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = SearchCache::new();
        let key = SearchKey::new("rust release", 3);
        assert!(cache.get(&key).is_none());
        cache.insert_if_absent(key.clone(), outcome("rust release", "2015"));
        assert_eq!(cache.get(&key).unwrap().text, "2015");
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn test_key_sensitive_to_query_and_count() {
        let cache = SearchCache::new();
        cache.insert_if_absent(SearchKey::new("q", 3), outcome("q", "x"));
        assert!(cache.get(&SearchKey::new("q", 5)).is_none());
        assert!(cache.get(&SearchKey::new("Q", 3)).is_none());
        assert!(cache.get(&SearchKey::new("q", 3)).is_some());
    }

    #[test]
    fn test_first_writer_wins() {
        let cache = SearchCache::new();
        let key = SearchKey::new("q", 3);
        let first = cache.insert_if_absent(key.clone(), outcome("q", "first"));
        let second = cache.insert_if_absent(key.clone(), outcome("q", "second"));
        assert_eq!(first.text, "first");
        assert_eq!(second.text, "first");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_inserts_keep_one_value() {
        let cache = Arc::new(SearchCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    cache.insert_if_absent(SearchKey::new("q", 3), outcome("q", &i.to_string()))
                })
            })
            .collect();
        let results: Vec<SearchOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0].text == w[1].text));
        assert_eq!(cache.len(), 1);
    }
}
