//! Filesystem sibling-file tier (spec.md `4.8`, `6`): one emitted file
//! per source file, named `<stem>.<host-ext>`, whose first line is
//! `// compiler=<version> source_hash=<hex>` (spec.md `6`), plus a
//! `.map` sibling holding the encoded source map and a JSON index the
//! `cache stats`/`cache prune` CLI subcommands read.
//!
//! Invalidation is hash-based, not mtime-based (spec.md `8`, scenario
//! 6: "Touch source S ... cache is still valid"): [`DiskTier::load`]
//! only ever rejects a hit on a header hash mismatch or a missing/
//! unreadable file, never on file modification time.

use crate::artifact::{ArtifactMetadata, CompiledArtifact};
use crate::diagnostics::CacheError;
use mlpy_registry::CapabilityName;
use mlpy_sourcemap::SourceMap;
use mlpy_span::ContentHash;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct DiskTier {
    dir: PathBuf,
    host_ext: String,
}

impl DiskTier {
    pub fn new(dir: impl Into<PathBuf>, host_ext: impl Into<String>) -> Self {
        Self { dir: dir.into(), host_ext: host_ext.into() }
    }

    fn stem(source_path: &Path) -> String {
        source_path.file_stem().map_or_else(|| "source".to_string(), |s| s.to_string_lossy().into_owned())
    }

    fn emitted_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{}", self.host_ext))
    }

    fn map_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{}.map", self.host_ext))
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("index.json")
    }

    fn read_index(&self) -> Result<FxHashMap<String, ArtifactMetadata>, CacheError> {
        match fs::read_to_string(self.index_path()) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(FxHashMap::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_index(&self, index: &FxHashMap<String, ArtifactMetadata>) -> Result<(), CacheError> {
        let text = serde_json::to_string_pretty(index)?;
        fs::write(self.index_path(), text)?;
        Ok(())
    }

    /// Loads a cached artifact for `source_path`, validating it against
    /// `expected_hash` (spec.md `4.8`). Any I/O error, parse failure, or
    /// hash mismatch is treated as a cache miss: callers recompile
    /// rather than propagate (spec.md `7`: "Cache errors downgrade to
    /// 'cache miss'").
    pub fn load(&self, source_path: &Path, expected_hash: ContentHash) -> Option<CompiledArtifact> {
        let stem = Self::stem(source_path);
        let emitted_path = self.emitted_path(&stem);
        let text = fs::read_to_string(&emitted_path).ok()?;
        let (header, body) = text.split_once('\n')?;
        let recorded_hash = header.rsplit("source_hash=").next()?;
        if recorded_hash != expected_hash.to_hex() {
            tracing::debug!(path = %emitted_path.display(), "disk cache entry stale: hash mismatch");
            return None;
        }
        let source_map = fs::read_to_string(self.map_path(&stem)).ok().and_then(|text| SourceMap::decode(&text).ok()).unwrap_or_default();

        let index = self.read_index().ok()?;
        let metadata = index.get(&expected_hash.to_hex())?;
        let required_capabilities = metadata.required_capabilities.iter().map(CapabilityName::new).collect();

        Some(CompiledArtifact {
            source_hash: expected_hash,
            emitted_source: body.to_string(),
            source_map,
            required_capabilities,
            diagnostics: metadata.diagnostics.clone(),
            compiler_version: metadata.compiler_version.clone(),
        })
    }

    /// Writes `artifact` alongside `source_path`, then write-through
    /// updates the index (spec.md `4.8`: "a `--force-transpile`-style
    /// override ... must still write-through on success").
    pub fn store(&self, source_path: &Path, artifact: &CompiledArtifact) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let stem = Self::stem(source_path);
        let emitted_path = self.emitted_path(&stem);
        let map_path = self.map_path(&stem);

        let mut contents = artifact.header_line();
        contents.push('\n');
        contents.push_str(&artifact.emitted_source);
        fs::write(&emitted_path, contents)?;
        fs::write(&map_path, artifact.source_map.encode())?;

        let stored_at_epoch_secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        let mut index = self.read_index()?;
        index.insert(
            artifact.source_hash.to_hex(),
            ArtifactMetadata {
                source_hash: artifact.source_hash.to_hex(),
                emitted_path: emitted_path.to_string_lossy().into_owned(),
                source_map_path: map_path.to_string_lossy().into_owned(),
                compiler_version: artifact.compiler_version.clone(),
                stored_at_epoch_secs,
                required_capabilities: artifact.required_capabilities.iter().map(CapabilityName::to_string).collect(),
                diagnostics: artifact.diagnostics.clone(),
            },
        );
        self.write_index(&index)?;
        Ok(())
    }

    /// `cache clear` (spec.md `6`): removes every file this tier wrote,
    /// including the index.
    pub fn clear(&self) -> Result<(), CacheError> {
        let index = self.read_index()?;
        for metadata in index.values() {
            let _ = fs::remove_file(&metadata.emitted_path);
            let _ = fs::remove_file(&metadata.source_map_path);
        }
        let _ = fs::remove_file(self.index_path());
        Ok(())
    }

    /// `cache stats` (spec.md `6`).
    pub fn stats(&self) -> Result<DiskCacheStats, CacheError> {
        let index = self.read_index()?;
        let mut total_bytes = 0u64;
        for metadata in index.values() {
            if let Ok(meta) = fs::metadata(&metadata.emitted_path) {
                total_bytes += meta.len();
            }
        }
        Ok(DiskCacheStats { entries: index.len(), total_bytes })
    }

    /// `cache prune` (spec.md `6`): drops index entries whose emitted
    /// file is gone or unreadable. Returns the number of entries
    /// removed.
    pub fn prune(&self) -> Result<usize, CacheError> {
        let mut index = self.read_index()?;
        let stale: Vec<String> = index.iter().filter(|(_, metadata)| !Path::new(&metadata.emitted_path).is_file()).map(|(hash, _)| hash.clone()).collect();
        for hash in &stale {
            index.remove(hash);
        }
        self.write_index(&index)?;
        Ok(stale.len())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCacheStats {
    pub entries: usize,
    pub total_bytes: u64,
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    fn artifact(text: &str) -> CompiledArtifact {
        CompiledArtifact::new(ContentHash::of(text), format!("print({text:?})"), SourceMap::new(), vec![CapabilityName::new("io.print")])
    }

    #[test]
    fn store_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let tier = DiskTier::new(dir.path(), "py");
        let source_path = dir.path().join("main.ml");
        let written = artifact("hello");

        tier.store(&source_path, &written).unwrap();
        let loaded = tier.load(&source_path, written.source_hash).expect("cache hit");
        assert_eq!(loaded.emitted_source, written.emitted_source);
        assert_eq!(loaded.required_capabilities, written.required_capabilities);
    }

    #[test]
    fn hash_mismatch_is_a_miss() {
        let dir = tempdir().unwrap();
        let tier = DiskTier::new(dir.path(), "py");
        let source_path = dir.path().join("main.ml");
        tier.store(&source_path, &artifact("hello")).unwrap();

        let other_hash = ContentHash::of("different text entirely");
        assert!(tier.load(&source_path, other_hash).is_none());
    }

    #[test]
    fn touching_mtime_without_changing_content_stays_a_hit() {
        let dir = tempdir().unwrap();
        let tier = DiskTier::new(dir.path(), "py");
        let source_path = dir.path().join("main.ml");
        let written = artifact("hello");
        tier.store(&source_path, &written).unwrap();

        // Simulate "touch": re-set the emitted file's mtime without
        // touching its bytes. Loading must still hit (spec.md `8`,
        // scenario 6: hash-based, not mtime-based invalidation).
        let emitted_path = tier.emitted_path("main");
        let contents = fs::read(&emitted_path).unwrap();
        fs::write(&emitted_path, contents).unwrap();

        assert!(tier.load(&source_path, written.source_hash).is_some());
    }

    #[test]
    fn clear_removes_every_written_file() {
        let dir = tempdir().unwrap();
        let tier = DiskTier::new(dir.path(), "py");
        let source_path = dir.path().join("main.ml");
        tier.store(&source_path, &artifact("hello")).unwrap();

        tier.clear().unwrap();
        assert!(!tier.emitted_path("main").exists());
    }

    #[test]
    fn prune_drops_entries_whose_emitted_file_is_gone() {
        let dir = tempdir().unwrap();
        let tier = DiskTier::new(dir.path(), "py");
        let source_path = dir.path().join("main.ml");
        let written = artifact("hello");
        tier.store(&source_path, &written).unwrap();
        fs::remove_file(tier.emitted_path("main")).unwrap();

        let pruned = tier.prune().unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(tier.stats().unwrap().entries, 0);
    }

    #[test]
    fn stats_reports_entry_count_and_total_bytes() {
        let dir = tempdir().unwrap();
        let tier = DiskTier::new(dir.path(), "py");
        tier.store(&dir.path().join("a.ml"), &artifact("a")).unwrap();
        tier.store(&dir.path().join("b.ml"), &artifact("b")).unwrap();

        let stats = tier.stats().unwrap();
        assert_eq!(stats.entries, 2);
        assert!(stats.total_bytes > 0);
    }
}
