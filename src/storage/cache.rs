//! Feature value cache keyed by (segment identity, feature name)

use crate::core::feature::FeatureValue;
use crate::error::Result;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

type CacheKey = (String, String);

/// Cache of feature columns read from the store
///
/// Entries are immutable once inserted and never evicted. Cloning the cache
/// yields a handle to the same entries, so segments built from one tag can
/// share the columns they read.
#[derive(Debug, Clone, Default)]
pub struct FeatureCache {
    entries: Arc<DashMap<CacheKey, Arc<FeatureValue>>>,
}

impl FeatureCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn key(segment_id: &str, feature: &str) -> CacheKey {
        (segment_id.to_string(), feature.to_string())
    }

    /// Check if an entry exists
    pub fn contains(&self, segment_id: &str, feature: &str) -> bool {
        self.entries.contains_key(&Self::key(segment_id, feature))
    }

    /// Get a cached value
    pub fn get(&self, segment_id: &str, feature: &str) -> Option<Arc<FeatureValue>> {
        let found = self
            .entries
            .get(&Self::key(segment_id, feature))
            .map(|entry| Arc::clone(entry.value()));
        debug!(
            segment = segment_id,
            feature,
            hit = found.is_some(),
            "feature cache lookup"
        );
        found
    }

    /// Insert a value unless the key is already present; returns the stored value
    pub fn put(&self, segment_id: &str, feature: &str, value: FeatureValue) -> Arc<FeatureValue> {
        debug!(segment = segment_id, feature, "feature cache insert");
        let entry = self
            .entries
            .entry(Self::key(segment_id, feature))
            .or_insert_with(|| Arc::new(value));
        Arc::clone(entry.value())
    }

    /// Return the cached value or fetch and insert it
    ///
    /// The fetch runs without holding any lock. Two concurrent misses for the
    /// same key may both fetch; the first insert wins and both callers get it.
    pub fn get_or_fetch<F>(
        &self,
        segment_id: &str,
        feature: &str,
        fetch: F,
    ) -> Result<Arc<FeatureValue>>
    where
        F: FnOnce() -> Result<FeatureValue>,
    {
        if let Some(value) = self.get(segment_id, feature) {
            return Ok(value);
        }
        let value = fetch()?;
        Ok(self.put(segment_id, feature, value))
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
