use sha2::{Digest, Sha256};
use std::{fmt, sync::Arc};

/// A stable identifier for a logical source file. Two `SourceUnit`s with
/// the same path share a `FileId`; the id is what cross-file diagnostics
/// and source maps key on, rather than the (possibly relocatable) path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(Arc<str>);

impl FileId {
    pub fn new(path: impl Into<Arc<str>>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 256-bit digest of a source unit's text, used as the cache key and as
/// the invalidation check for on-disk compiled artifacts. Two source
/// units with identical text have identical hashes regardless of file
/// identity, which is what gives the cache its content-addressed
/// semantics (spec.md `4.8`: hash-based, not mtime-based invalidation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn to_hex(self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An immutable `(file_id, text, content_hash)` triple (spec.md `3`).
///
/// `SourceUnit`s are cheap to clone: `text` is reference counted, so
/// handing a copy to the parser, the cache and the diagnostics renderer
/// does not re-allocate the source text.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    file_id: FileId,
    text: Arc<str>,
    content_hash: ContentHash,
}

impl SourceUnit {
    pub fn new(file_id: FileId, text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let content_hash = ContentHash::of(&text);
        Self { file_id, text, content_hash }
    }

    pub fn file_id(&self) -> &FileId {
        &self.file_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identical_text_hashes_equal_regardless_of_file() {
        let a = SourceUnit::new(FileId::new("a.ml"), "x = 1;");
        let b = SourceUnit::new(FileId::new("b.ml"), "x = 1;");
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn one_byte_change_changes_hash() {
        let a = SourceUnit::new(FileId::new("a.ml"), "x = 1;");
        let b = SourceUnit::new(FileId::new("a.ml"), "x = 2;");
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
