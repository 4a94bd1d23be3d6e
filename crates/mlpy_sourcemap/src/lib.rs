//! Source map model (spec.md `3`, `4.5` point 8): a sorted array of
//! emitted-position → source-position mappings plus a symbol table for
//! identifiers the code generator renamed.
//!
//! Grounded on `oxc_sourcemap`'s separation of an in-memory model from
//! an on-disk encoding, simplified to the one encoding spec.md actually
//! names: "one mapping per line: `emit_line,emit_col,src_file,src_line,src_col`"
//! (spec.md `6`), rather than VLQ-encoded mappings strings. mlpy never
//! ships its source maps to a browser devtools consumer, so there is no
//! reason to match the standard source-map-v3 wire format.

use mlpy_span::{FileId, Span};
use rustc_hash::FxHashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// One emitted-range → source-span mapping (spec.md `4.5` point 8). The
/// code generator emits one of these per statement or expression whose
/// span survives into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub emitted_start: Position,
    pub emitted_end: Position,
    pub source_file: FileId,
    pub source_span: Span,
}

impl Mapping {
    fn contains(&self, pos: Position) -> bool {
        self.emitted_start <= pos && pos <= self.emitted_end
    }

    fn emitted_width(&self) -> (u32, u32) {
        (self.emitted_end.line.saturating_sub(self.emitted_start.line), self.emitted_end.column.saturating_sub(self.emitted_start.column))
    }
}

/// The result of a successful [`SourceMap::lookup`]: the source file
/// and span that most tightly encloses the queried emitted position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    pub source_file: FileId,
    pub source_span: Span,
}

/// A complete source map for one compiled artifact (spec.md `3`). Not
/// itself sorted in memory — `mappings` is kept in emission order,
/// which is document order, and `lookup` does a linear scan since an ML
/// script's mapping count is in the hundreds, not the millions.
#[derive(Debug, Default, Clone)]
pub struct SourceMap {
    mappings: Vec<Mapping>,
    /// Renamed-identifier table (spec.md `3`): original ML name →
    /// emitted host name, for identifiers the generator had to mangle
    /// (spec.md `4.5`, reserved-word/keyword collisions).
    symbol_table: FxHashMap<String, String>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mapping(&mut self, mapping: Mapping) {
        self.mappings.push(mapping);
    }

    pub fn rename(&mut self, original: impl Into<String>, emitted: impl Into<String>) {
        self.symbol_table.insert(original.into(), emitted.into());
    }

    pub fn emitted_name_of(&self, original: &str) -> Option<&str> {
        self.symbol_table.get(original).map(String::as_str)
    }

    /// Returns the source position inside the smallest mapping whose
    /// emitted range contains `pos` (spec.md `4.5` point 8, `8`
    /// "Round trip"). Ties (two mappings of identical emitted width)
    /// resolve to whichever was added first, i.e. the outer one the
    /// generator visited before descending into it.
    pub fn lookup(&self, pos: Position) -> Option<SourcePosition> {
        self.mappings
            .iter()
            .filter(|mapping| mapping.contains(pos))
            .min_by_key(|mapping| mapping.emitted_width())
            .map(|mapping| SourcePosition { source_file: mapping.source_file.clone(), source_span: mapping.source_span })
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Encodes to the sibling-file textual format named in spec.md `6`:
    /// one mapping per line, `emit_line,emit_col,src_file,src_line,src_col`.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for mapping in &self.mappings {
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                mapping.emitted_start.line,
                mapping.emitted_start.column,
                mapping.source_file.as_str(),
                mapping.source_span.line,
                mapping.source_span.column,
            ));
        }
        out
    }

    /// Decodes the format `encode` writes. Each mapping's emitted end
    /// is reconstructed as equal to its start: the decoded map is
    /// usable for exact-position lookups (what a DAP-style `resolve`
    /// caller needs) but loses the original span widths, which this
    /// textual sibling-file format never stores in the first place.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let mut map = Self::new();
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            let [emit_line, emit_col, src_file, src_line, src_col] = fields.as_slice() else {
                return Err(DecodeError { line: line_no + 1 });
            };
            let parse = |s: &str| s.parse::<u32>().map_err(|_| DecodeError { line: line_no + 1 });
            let emit_line = parse(emit_line)?;
            let emit_col = parse(emit_col)?;
            let src_line = parse(src_line)?;
            let src_col = parse(src_col)?;
            let position = Position::new(emit_line, emit_col);
            map.add_mapping(Mapping {
                emitted_start: position,
                emitted_end: position,
                source_file: FileId::new((*src_file).to_string()),
                source_span: Span::new(0, 0, src_line, src_col),
            });
        }
        Ok(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    pub line: usize,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed source map entry on line {}", self.line)
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod test {
    use super::*;

    fn mapping(el: u32, ec: u32, ee_l: u32, ee_c: u32, sl: u32, sc: u32) -> Mapping {
        Mapping { emitted_start: Position::new(el, ec), emitted_end: Position::new(ee_l, ee_c), source_file: FileId::new("main.ml"), source_span: Span::new(0, 0, sl, sc) }
    }

    #[test]
    fn lookup_returns_smallest_enclosing_mapping() {
        let mut map = SourceMap::new();
        map.add_mapping(mapping(1, 0, 5, 0, 1, 0)); // whole statement
        map.add_mapping(mapping(2, 4, 2, 10, 2, 4)); // nested expression
        let found = map.lookup(Position::new(2, 6)).unwrap();
        assert_eq!(found.source_span.line, 2);
    }

    #[test]
    fn lookup_outside_every_mapping_is_none() {
        let mut map = SourceMap::new();
        map.add_mapping(mapping(1, 0, 1, 10, 1, 0));
        assert!(map.lookup(Position::new(5, 0)).is_none());
    }

    #[test]
    fn symbol_table_round_trips_renames() {
        let mut map = SourceMap::new();
        map.rename("class", "class_");
        assert_eq!(map.emitted_name_of("class"), Some("class_"));
        assert_eq!(map.emitted_name_of("unrelated"), None);
    }

    #[test]
    fn encode_then_decode_preserves_lookup_positions() {
        let mut map = SourceMap::new();
        map.add_mapping(mapping(3, 2, 3, 2, 7, 1));
        let encoded = map.encode();
        let decoded = SourceMap::decode(&encoded).unwrap();
        let found = decoded.lookup(Position::new(3, 2)).unwrap();
        assert_eq!(found.source_span.line, 7);
        assert_eq!(found.source_span.column, 1);
    }

    #[test]
    fn decode_rejects_malformed_lines() {
        let err = SourceMap::decode("1,2,main.ml,3\n").unwrap_err();
        assert_eq!(err.line, 1);
    }
}
