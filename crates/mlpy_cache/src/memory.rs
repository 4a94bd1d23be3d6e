//! In-process LRU tier (spec.md `3`: "Stored in-memory (LRU)"; `4.8`:
//! "bounded count"). A thin `Mutex<lru::LruCache<..>>` wrapper: the
//! `lru` crate already gives O(1) get/insert with bounded eviction, so
//! there is nothing here beyond making it `Send`/`Sync`-shareable
//! behind `Arc<CompiledArtifact>` values, matching the facade's need to
//! hand the same artifact to multiple readers without cloning
//! `emitted_source`.

use crate::artifact::CompiledArtifact;
use lru::LruCache;
use mlpy_span::ContentHash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

pub struct MemoryTier {
    inner: Mutex<LruCache<ContentHash, Arc<CompiledArtifact>>>,
}

impl MemoryTier {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    pub fn get(&self, hash: ContentHash) -> Option<Arc<CompiledArtifact>> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).get(&hash).cloned()
    }

    pub fn insert(&self, hash: ContentHash, artifact: Arc<CompiledArtifact>) {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).put(hash, artifact);
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mlpy_sourcemap::SourceMap;

    fn artifact(text: &str) -> Arc<CompiledArtifact> {
        Arc::new(CompiledArtifact::new(ContentHash::of(text), text.to_string(), SourceMap::new(), Vec::new()))
    }

    #[test]
    fn insert_then_get_round_trips() {
        let tier = MemoryTier::new(NonZeroUsize::new(4).unwrap());
        let hash = ContentHash::of("x");
        tier.insert(hash, artifact("x"));
        assert!(tier.get(hash).is_some());
    }

    #[test]
    fn capacity_bound_evicts_least_recently_used() {
        let tier = MemoryTier::new(NonZeroUsize::new(1).unwrap());
        let a = ContentHash::of("a");
        let b = ContentHash::of("b");
        tier.insert(a, artifact("a"));
        tier.insert(b, artifact("b"));
        assert!(tier.get(a).is_none());
        assert!(tier.get(b).is_some());
    }

    #[test]
    fn clear_empties_the_tier() {
        let tier = MemoryTier::new(NonZeroUsize::new(4).unwrap());
        tier.insert(ContentHash::of("x"), artifact("x"));
        tier.clear();
        assert!(tier.is_empty());
    }
}
