//! Compiled Artifact (spec.md `3`): the record produced by a successful
//! compilation, stored by the cache and later consumed by the sandbox.
//!
//! `emitted_source` and `source_map` come straight out of
//! `mlpy_codegen::generate`; `required_capabilities` is the union
//! computed by the deep analyzer's capability-requirements inference
//! (spec.md `4.4`). Diagnostics are flattened to their rendered text
//! here rather than kept as `miette::Error`, since an artifact is a
//! cache value that has to round-trip through the filesystem tier's
//! JSON index — a `miette::Error` has no stable serialized form, and
//! the cache only ever needs to *report* diagnostics that travelled
//! with a cached artifact, never to re-inspect their structure.

use mlpy_registry::CapabilityName;
use mlpy_sourcemap::SourceMap;
use mlpy_span::ContentHash;
use serde::{Deserialize, Serialize};

/// `compiler_version` is stamped into both the in-memory artifact and
/// the first line of every emitted sibling file (spec.md `6`), so a
/// cache built by a different compiler build is trivially detected as
/// stale without needing a dedicated version field in the index.
pub const COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `Compiled Artifact{source_hash, emitted_source, source_map,
/// required_capabilities, diagnostics, compiler_version}` (spec.md `3`).
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    pub source_hash: ContentHash,
    pub emitted_source: String,
    pub source_map: SourceMap,
    pub required_capabilities: Vec<CapabilityName>,
    pub diagnostics: Vec<String>,
    pub compiler_version: String,
}

impl CompiledArtifact {
    pub fn new(source_hash: ContentHash, emitted_source: String, source_map: SourceMap, required_capabilities: Vec<CapabilityName>) -> Self {
        Self { source_hash, emitted_source, source_map, required_capabilities, diagnostics: Vec::new(), compiler_version: COMPILER_VERSION.to_string() }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Vec<String>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// The first line written to the emitted sibling file (spec.md `6`:
    /// `// compiler=<version> source_hash=<hex>`), used by
    /// [`crate::disk::DiskTier::load`] to validate a cache hit without
    /// re-reading the whole file.
    pub fn header_line(&self) -> String {
        format!("// compiler={} source_hash={}", self.compiler_version, self.source_hash.to_hex())
    }
}

/// The metadata half of an artifact, persisted in the filesystem tier's
/// JSON index (spec.md `4.8`) so `cache stats`/`cache prune` can answer
/// questions about what is on disk without decoding every emitted file
/// and source map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub source_hash: String,
    pub emitted_path: String,
    pub source_map_path: String,
    pub compiler_version: String,
    pub stored_at_epoch_secs: u64,
    pub required_capabilities: Vec<String>,
    pub diagnostics: Vec<String>,
}
