//! Memoized correction results keyed by `(column hint, normalized value)`.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use crate::engine::CorrectionResult;
use crate::text::normalize_key;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    column: Option<String>,
    value: String,
}

impl CacheKey {
    fn new(column_hint: Option<&str>, value: &str) -> Self {
        Self {
            column: column_hint.map(str::to_string),
            value: normalize_key(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Unbounded; use one instance per dataset, since column hints are dataset-specific.
#[derive(Debug, Default)]
pub struct CorrectionCache {
    entries: DashMap<CacheKey, CorrectionResult>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CorrectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column_hint: Option<&str>, value: &str) -> Option<CorrectionResult> {
        self.entries
            .get(&CacheKey::new(column_hint, value))
            .map(|entry| entry.value().clone())
    }

    /// Stored result for the key, computing and storing it on a miss.
    ///
    /// `compute` runs without any shard lock held. If two workers miss on the same
    /// key at once, both compute and the first stored result is returned to both.
    pub fn get_or_compute<F>(&self, column_hint: Option<&str>, value: &str, compute: F) -> CorrectionResult
    where
        F: FnOnce() -> CorrectionResult,
    {
        let key = CacheKey::new(column_hint, value);
        if let Some(hit) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return hit.value().clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let computed = compute();
        self.entries.entry(key).or_insert(computed).value().clone()
    }

    /// Drop every entry for a value, whatever its column.
    pub fn invalidate_value(&self, value: &str) {
        let normalized = normalize_key(value);
        self.entries.retain(|key, _| key.value != normalized);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
