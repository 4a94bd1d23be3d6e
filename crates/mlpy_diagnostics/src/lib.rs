//! Diagnostic plumbing shared by every stage of the mlpy pipeline.
//!
//! Individual stages (parser, validator, analyzer, generator, cache,
//! sandbox) define their own `#[derive(Debug, Error, Diagnostic)]` structs
//! local to that crate (see e.g. `mlpy_parser::diagnostics`) and convert
//! them into the pipeline-wide [`Error`] / [`Result`] via `.into()`. This
//! crate only owns the shared taxonomy (spec.md `7`) and the flattened,
//! serializable [`DiagnosticRecord`] shape that LSP/DAP-style consumers
//! read instead of a terminal-rendered report.

use mlpy_span::Span;
use std::fmt;

/// The pipeline-wide error type. A boxed [`miette::Report`], matching
/// `oxc_diagnostics::Error`: every stage-local diagnostic struct derives
/// `miette::Diagnostic` and is converted with `.into()`.
pub type Error = miette::Error;

/// The pipeline-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error taxonomy (spec.md `7`). Every [`DiagnosticRecord`] is
/// tagged with exactly one of these so that callers (CLI exit codes,
/// LSP severities) can dispatch without string-matching messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Parse,
    Validation,
    Security,
    CodeGen,
    Cache,
    Sandbox,
    Runtime,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parse => "parse",
            Self::Validation => "validation",
            Self::Security => "security",
            Self::CodeGen => "codegen",
            Self::Cache => "cache",
            Self::Sandbox => "sandbox",
            Self::Runtime => "runtime",
        };
        f.write_str(s)
    }
}

/// Severity grades used by the deep security analyzer and by validation
/// (spec.md `4.4`). `Critical` aborts the pipeline in strict mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// The flattened, user-visible shape of a diagnostic (spec.md `7`,
/// "User-visible formatting"): `file`, `line`, `column`, `kind` and
/// `message` are required; `severity`, `hint` and `related_spans` are
/// optional. This is what `mlpy::diagnose` hands back to an LSP-shaped
/// caller, as opposed to a terminal-rendered [`miette::Report`].
#[derive(Debug, Clone)]
pub struct DiagnosticRecord {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub kind: DiagnosticKind,
    pub message: String,
    pub severity: Severity,
    pub hint: Option<String>,
    pub related_spans: Vec<Span>,
}

impl DiagnosticRecord {
    pub fn new(file: impl Into<String>, span: Span, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: span.line,
            column: span.column,
            kind,
            message: message.into(),
            severity: Severity::Critical,
            hint: None,
            related_spans: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}: {} [{}]", self.file, self.line, self.column, self.message, self.kind)
    }
}

/// A list of diagnostics gathered during one stage. Stages never collapse
/// an internal exception into an empty success (spec.md `7`): an empty
/// `Diagnostics` alongside a `None` artifact is a bug, not a valid state,
/// and pipeline code is written so that this cannot happen (see
/// `mlpy::pipeline::PipelineState`).
#[derive(Debug, Default, Clone)]
pub struct Diagnostics(Vec<Error>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: impl Into<Error>) {
        self.0.push(error.into());
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Error> {
        self.0
    }
}

impl FromIterator<Error> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Error>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
