//! Source spans and source units for the mlpy compiler.
//!
//! A [`Span`] is a half-open byte range into a [`SourceUnit`]'s text, plus
//! the line/column at which it starts. [`SourceUnit`] is the immutable
//! `(file_id, text, content_hash)` triple described in the data model: it
//! is created once when a file is read and never mutated afterwards.

mod source_unit;

pub use source_unit::{ContentHash, FileId, SourceUnit};

use miette::SourceSpan;

/// A byte range into some [`SourceUnit`]'s text, together with the human
/// facing line/column of its start. `start <= end` always holds; an empty
/// span (e.g. end-of-file) has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: u32,
    pub end: u32,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub const fn new(start: u32, end: u32, line: u32, column: u32) -> Self {
        Self { start, end, line, column }
    }

    /// A zero-width span at the origin, used for synthetic nodes that have
    /// no real source position (e.g. an empty program after a fatal parse
    /// error).
    pub const fn dummy() -> Self {
        Self { start: 0, end: 0, line: 1, column: 1 }
    }

    pub const fn size(&self) -> u32 {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `self` fully contains `other`, used by the source map to
    /// find the smallest enclosing node for a lookup position.
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Merge two spans into the smallest span covering both. Used when a
    /// parent node's span is derived from its first and last children.
    pub fn merge(&self, other: Span) -> Self {
        let (start, line, column) =
            if self.start <= other.start { (self.start, self.line, self.column) } else { (other.start, other.line, other.column) };
        Self { start, end: self.end.max(other.end), line, column }
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        (span.start as usize, span.size() as usize).into()
    }
}
