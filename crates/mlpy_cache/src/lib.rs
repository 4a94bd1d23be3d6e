//! Two-tier transpilation cache (spec.md `3`, `4.8`): an in-process LRU
//! tier backed by an optional filesystem sibling-file tier, keyed by
//! [`ContentHash`] rather than path or mtime.
//!
//! Concurrent compiles of the same source (spec.md `5`: "Two threads
//! request compilation of the same source concurrently ... exactly one
//! compile runs; the other blocks and receives the same artifact") are
//! de-duplicated through [`Cache::get_or_compile`]'s in-flight map,
//! grounded on a condvar-guarded slot rather than a channel: the
//! second-and-later callers need to *wait for a value*, not consume a
//! stream, so a `Condvar` paired with a `Mutex<Option<T>>` is the
//! narrower tool.

mod artifact;
mod disk;
mod diagnostics;
mod memory;

pub use artifact::{ArtifactMetadata, CompiledArtifact, COMPILER_VERSION};
pub use disk::{DiskCacheStats, DiskTier};
pub use diagnostics::CacheError;
pub use memory::MemoryTier;

use mlpy_span::ContentHash;
use rustc_hash::FxHashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Default in-memory LRU capacity, chosen generously: one entry per
/// compiled file in a project is the common case, and a few hundred
/// compiled artifacts are a trivial amount of memory next to the host
/// process compiling them.
pub const DEFAULT_MEMORY_CAPACITY: usize = 256;

struct InFlight {
    result: Mutex<Option<Result<Arc<CompiledArtifact>, String>>>,
    done: Condvar,
}

impl InFlight {
    fn new() -> Arc<Self> {
        Arc::new(Self { result: Mutex::new(None), done: Condvar::new() })
    }

    fn publish(&self, result: Result<Arc<CompiledArtifact>, String>) {
        let mut slot = self.result.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Some(result);
        self.done.notify_all();
    }

    fn wait(&self) -> Result<Arc<CompiledArtifact>, String> {
        let guard = self.result.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut guard = self.done.wait_while(guard, |slot| slot.is_none()).unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.take().expect("condvar woke with no result published")
    }
}

/// The two-tier cache (spec.md `3`, `4.8`). The filesystem tier is
/// optional: a cache with no `disk` tier still gives in-process callers
/// (the REPL, a long-lived LSP session) memory-only caching.
pub struct Cache {
    memory: MemoryTier,
    disk: Option<DiskTier>,
    in_flight: Mutex<FxHashMap<ContentHash, Arc<InFlight>>>,
    compile_invocations: AtomicUsize,
}

impl Cache {
    pub fn new(memory_capacity: NonZeroUsize, disk: Option<DiskTier>) -> Self {
        Self { memory: MemoryTier::new(memory_capacity), disk, in_flight: Mutex::new(FxHashMap::default()), compile_invocations: AtomicUsize::new(0) }
    }

    pub fn memory_only(memory_capacity: NonZeroUsize) -> Self {
        Self::new(memory_capacity, None)
    }

    pub fn with_disk_tier(dir: impl Into<PathBuf>, host_ext: impl Into<String>) -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_MEMORY_CAPACITY).expect("nonzero literal"), Some(DiskTier::new(dir, host_ext)))
    }

    /// Number of times `compile_fn` has actually run, i.e. cache misses
    /// plus `force` bypasses. Exposed for tests exercising spec.md `8`
    /// scenario 6 ("the transpiler is not invoked a second time").
    pub fn compile_invocations(&self) -> usize {
        self.compile_invocations.load(Ordering::SeqCst)
    }

    /// Looks up `source` by content hash, falling back memory → disk →
    /// `compile_fn`, and writes back into whichever tiers missed.
    /// `force` bypasses both tiers' read path but still writes through
    /// on success (spec.md `4.8`: "force-recompile ... write-through").
    ///
    /// Concurrent calls with the same `ContentHash` collapse to one
    /// `compile_fn` invocation; the rest block on [`InFlight::wait`]
    /// and receive the same `Arc<CompiledArtifact>`.
    pub fn get_or_compile(
        &self,
        source: &str,
        source_path: &Path,
        force: bool,
        compile_fn: impl FnOnce() -> Result<CompiledArtifact, String>,
    ) -> Result<Arc<CompiledArtifact>, String> {
        let hash = ContentHash::of(source);

        if !force {
            if let Some(hit) = self.memory.get(hash) {
                return Ok(hit);
            }
            if let Some(disk) = &self.disk {
                if let Some(artifact) = disk.load(source_path, hash) {
                    let artifact = Arc::new(artifact);
                    self.memory.insert(hash, Arc::clone(&artifact));
                    return Ok(artifact);
                }
            }
        }

        let (owner, slot) = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(existing) = in_flight.get(&hash) {
                (false, Arc::clone(existing))
            } else {
                let slot = InFlight::new();
                in_flight.insert(hash, Arc::clone(&slot));
                (true, slot)
            }
        };

        if !owner {
            return slot.wait();
        }

        self.compile_invocations.fetch_add(1, Ordering::SeqCst);
        let outcome = compile_fn().map(Arc::new);

        if let Ok(artifact) = &outcome {
            self.memory.insert(hash, Arc::clone(artifact));
            if let Some(disk) = &self.disk {
                if let Err(err) = disk.store(source_path, artifact) {
                    tracing::warn!(error = %err, "failed to write transpilation cache to disk");
                }
            }
        }

        self.in_flight.lock().unwrap_or_else(std::sync::PoisonError::into_inner).remove(&hash);
        slot.publish(outcome.clone());
        outcome
    }

    /// `cache clear` (spec.md `6`).
    pub fn clear(&self) -> Result<(), CacheError> {
        self.memory.clear();
        if let Some(disk) = &self.disk {
            disk.clear()?;
        }
        Ok(())
    }

    /// `cache stats` (spec.md `6`).
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let disk = self.disk.as_ref().map(DiskTier::stats).transpose()?.unwrap_or_default();
        Ok(CacheStats { memory_entries: self.memory.len(), disk })
    }

    /// `cache prune` (spec.md `6`): no-op if this cache has no disk tier.
    pub fn prune(&self) -> Result<usize, CacheError> {
        self.disk.as_ref().map(DiskTier::prune).transpose().map(|n| n.unwrap_or(0))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub disk: DiskCacheStats,
}

#[cfg(test)]
mod test {
    use super::*;
    use mlpy_sourcemap::SourceMap;
    use std::sync::Barrier;
    use std::thread;
    use tempfile::tempdir;

    fn make_artifact(text: &str) -> CompiledArtifact {
        CompiledArtifact::new(ContentHash::of(text), format!("print({text:?})"), SourceMap::new(), Vec::new())
    }

    #[test]
    fn second_lookup_is_served_from_memory_without_recompiling() {
        let cache = Cache::memory_only(NonZeroUsize::new(4).unwrap());
        let path = PathBuf::from("main.ml");

        let first = cache.get_or_compile("hello", &path, false, || Ok(make_artifact("hello"))).unwrap();
        let second = cache.get_or_compile("hello", &path, false, || panic!("must not recompile on a hit")).unwrap();

        assert_eq!(first.emitted_source, second.emitted_source);
        assert_eq!(cache.compile_invocations(), 1);
    }

    #[test]
    fn force_bypasses_the_cache_but_still_writes_through() {
        let cache = Cache::memory_only(NonZeroUsize::new(4).unwrap());
        let path = PathBuf::from("main.ml");

        cache.get_or_compile("hello", &path, false, || Ok(make_artifact("hello"))).unwrap();
        cache.get_or_compile("hello", &path, true, || Ok(make_artifact("hello"))).unwrap();
        assert_eq!(cache.compile_invocations(), 2);

        let after = cache.get_or_compile("hello", &path, false, || panic!("must not recompile after force write-through")).unwrap();
        assert_eq!(after.emitted_source, "print(\"hello\")");
    }

    #[test]
    fn touching_source_without_changing_content_stays_a_disk_hit() {
        let dir = tempdir().unwrap();
        let cache = Cache::with_disk_tier(dir.path(), "py");
        let path = dir.path().join("main.ml");

        cache.get_or_compile("hello", &path, false, || Ok(make_artifact("hello"))).unwrap();
        assert_eq!(cache.compile_invocations(), 1);

        // Drop the fresh process's view of the world: a new `Cache`
        // sharing the same disk tier but an empty memory tier still
        // must not recompile (spec.md `8`, scenario 6).
        let reopened = Cache::with_disk_tier(dir.path(), "py");
        reopened.get_or_compile("hello", &path, false, || panic!("disk tier must serve this hit")).unwrap();
        assert_eq!(reopened.compile_invocations(), 0);
    }

    #[test]
    fn concurrent_compiles_of_the_same_source_run_compile_fn_exactly_once() {
        let cache = Arc::new(Cache::memory_only(NonZeroUsize::new(4).unwrap()));
        let path = PathBuf::from("main.ml");
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_or_compile("hello", &path, false, || {
                        thread::sleep(std::time::Duration::from_millis(20));
                        Ok(make_artifact("hello"))
                    })
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(cache.compile_invocations(), 1);
    }

    #[test]
    fn clear_drops_memory_and_disk_entries() {
        let dir = tempdir().unwrap();
        let cache = Cache::with_disk_tier(dir.path(), "py");
        let path = dir.path().join("main.ml");
        cache.get_or_compile("hello", &path, false, || Ok(make_artifact("hello"))).unwrap();

        cache.clear().unwrap();
        assert_eq!(cache.stats().unwrap().memory_entries, 0);
        assert_eq!(cache.stats().unwrap().disk.entries, 0);
    }
}
