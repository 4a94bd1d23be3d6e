//! The compilation pipeline (spec.md `3`, Lifecycle; `6`, "Contract
//! surface consumed from external collaborators"): the one place that
//! wires parser → validator → security analyzers → code generator →
//! cache into the handful of entry points the CLI, a REPL, an LSP, and
//! a DAP each need.
//!
//! Grounded on `oxc`'s own split between a `Linter`/`Compiler` facade
//! and its constituent passes: each pass crate stays ignorant of the
//! others, and this module is the only place that sequences them.

use crate::{bridges, capabilities, records};
use mlpy_ast::ast::{IdentifierRef, Program};
use mlpy_ast::Visit;
use mlpy_cache::{Cache, CompiledArtifact};
use mlpy_codegen::GeneratedOutput;
use mlpy_diagnostics::{DiagnosticRecord, Diagnostics, Severity};
use mlpy_parser::{Parser, ParserReturn};
pub use mlpy_semantic::{AnalysisMode, DeepAnalysis};
use mlpy_registry::Registry;
use mlpy_sourcemap::{Position, SourceMap, SourcePosition};
use mlpy_span::SourceUnit;
use std::path::Path;
use std::sync::Arc;

/// Options shared by every `compile*` entry point.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub deep_analysis: DeepAnalysis,
    /// `--force` / `--force-transpile` (spec.md `4.8`): bypass cache
    /// reads, but the result still writes through on success.
    pub force: bool,
    /// `--no-source-maps`: skip building the source map even on a
    /// successful compile. The artifact's `source_map` is simply empty
    /// rather than absent, since `CompiledArtifact` has no `Option`
    /// around the field.
    pub emit_source_maps: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { deep_analysis: DeepAnalysis::Skip, force: false, emit_source_maps: true }
    }
}

/// Result of [`compile`]/[`compile_incremental`]. `Failure` carries a
/// rendered message rather than structured [`Diagnostics`], since a
/// cache hit never re-runs the pipeline and so never reconstructs
/// them — a caller that needs the full structured diagnostics for a
/// failed compile should call [`diagnose`] instead, which always runs
/// fresh.
#[derive(Debug, Clone)]
pub enum CompileOutcome {
    Success(Arc<CompiledArtifact>),
    Failure(String),
}

impl CompileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Tracks how far one (uncached) run of the pipeline got. Exactly one
/// variant means "no artifact", and that variant always carries at
/// least one diagnostic — an empty `Diagnostics` alongside a missing
/// artifact is a bug, not a valid state, and this type makes that
/// state unrepresentable rather than leaving callers to check for it.
enum PipelineState {
    Succeeded { output: GeneratedOutput, program: Program, diagnostics: Diagnostics },
    Failed(Diagnostics),
}

/// Runs parse → validate → shallow/deep security → codegen over
/// `source`, stopping at the first stage that produces a fatal result.
/// Non-fatal findings accumulated along the way (e.g. permissive-mode
/// deep-security warnings) ride along on [`PipelineState::Succeeded`]
/// so a caller can still surface them.
fn run_pipeline(source: &SourceUnit, deep_analysis: DeepAnalysis) -> PipelineState {
    let ParserReturn { program, errors, panicked } = Parser::new(source.text()).parse();
    let mut diagnostics: Diagnostics = errors.into_iter().collect();
    if panicked || !diagnostics.is_empty() {
        return PipelineState::Failed(diagnostics);
    }

    let report = mlpy_semantic::analyze(&program, deep_analysis);
    let fatal = report.is_fatal(deep_analysis);
    diagnostics.extend(report.validation);
    diagnostics.extend(report.shallow_security);
    diagnostics.extend(report.deep_security);
    if fatal {
        return PipelineState::Failed(diagnostics);
    }

    let generated = mlpy_codegen::generate(&program, source.file_id().clone());
    if !generated.diagnostics.is_empty() {
        diagnostics.extend(generated.diagnostics);
        return PipelineState::Failed(diagnostics);
    }

    PipelineState::Succeeded { output: generated, program, diagnostics }
}

fn render(diagnostics: &Diagnostics) -> String {
    diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

fn compile_uncached(source: &SourceUnit, registry: &Registry, options: &CompileOptions) -> Result<CompiledArtifact, String> {
    match run_pipeline(source, options.deep_analysis) {
        PipelineState::Succeeded { output, program, diagnostics } => {
            let required = capabilities::required_capabilities(&program, registry);
            let source_map = if options.emit_source_maps { output.source_map } else { SourceMap::new() };
            let rendered: Vec<String> = diagnostics.iter().map(ToString::to_string).collect();
            Ok(CompiledArtifact::new(source.content_hash(), output.source, source_map, required).with_diagnostics(rendered))
        }
        PipelineState::Failed(diagnostics) => Err(render(&diagnostics)),
    }
}

/// `compile(S)` (spec.md `3`, `4.8`): cache-aware compilation against
/// the given registry. Identical `source` text served from the cache
/// never re-runs parse/analyze/codegen (spec.md `8`, "Cache
/// idempotence").
pub fn compile(source: &SourceUnit, source_path: &Path, cache: &Cache, registry: &Registry, options: &CompileOptions) -> CompileOutcome {
    match cache.get_or_compile(source.text(), source_path, options.force, || compile_uncached(source, registry, options)) {
        Ok(artifact) => CompileOutcome::Success(artifact),
        Err(message) => CompileOutcome::Failure(message),
    }
}

/// `compile_incremental(previous_context, new_source)` (spec.md `6`):
/// the REPL's entry point. `previous_context` is accepted for parity
/// with the external contract but unused — the cache is already keyed
/// by content hash, so a REPL re-submitting a line it has seen before
/// gets the same no-recompile behavior `compile` already provides
/// without needing separate incremental-compilation state (recorded as
/// an open-question resolution in `DESIGN.md`).
pub fn compile_incremental(
    _previous_context: Option<&CompiledArtifact>,
    source: &SourceUnit,
    source_path: &Path,
    cache: &Cache,
    registry: &Registry,
    options: &CompileOptions,
) -> CompileOutcome {
    compile(source, source_path, cache, registry, options)
}

/// `diagnose(source)` (spec.md `6`): the LSP's entry point. Always
/// runs fresh (never consults the cache) and collects every
/// diagnostic reachable without aborting early, so an editor can
/// underline more than one problem per keystroke.
pub fn diagnose(source: &SourceUnit, deep_analysis: DeepAnalysis) -> Vec<DiagnosticRecord> {
    let file = source.file_id().as_str();
    let mut out = Vec::new();

    let ParserReturn { program, errors, panicked } = Parser::new(source.text()).parse();
    out.extend(errors.iter().map(|e| records::to_diagnostic_record(file, e, records::PARSE)));
    if panicked {
        return out;
    }

    let report = mlpy_semantic::analyze(&program, deep_analysis);
    out.extend(report.validation.iter().map(|e| records::to_diagnostic_record(file, e, records::VALIDATION)));
    out.extend(report.shallow_security.iter().map(|e| records::to_diagnostic_record(file, e, records::SECURITY)));
    out.extend(report.deep_security.iter().map(|e| records::to_diagnostic_record(file, e, records::SECURITY)));
    if report.is_fatal(deep_analysis) {
        return out;
    }

    let generated = mlpy_codegen::generate(&program, source.file_id().clone());
    out.extend(generated.diagnostics.iter().map(|e| records::to_diagnostic_record(file, e, records::CODEGEN)));
    out
}

/// One token's worth of hover information (spec.md `6`): the LSP's
/// `hover(file, pos)` contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverInfo {
    pub name: String,
    pub span: mlpy_span::Span,
}

struct IdentifierFinder {
    offset: u32,
    found: Option<HoverInfo>,
}

impl Visit for IdentifierFinder {
    fn visit_identifier(&mut self, ident: &IdentifierRef) {
        if ident.span.start <= self.offset && self.offset <= ident.span.end {
            self.found = Some(HoverInfo { name: ident.name.clone(), span: ident.span });
        }
    }
}

/// Converts a 1-based `(line, column)` position into a byte offset
/// into `text`. Returns `None` if `position` names a line past the
/// end of `text`.
fn byte_offset_of(text: &str, position: Position) -> Option<u32> {
    let mut line_no = 1u32;
    let mut offset = 0u32;
    for line in text.split_inclusive('\n') {
        if line_no == position.line {
            let col = position.column.saturating_sub(1) as usize;
            let within = line.char_indices().nth(col).map_or(line.len(), |(i, _)| i);
            return Some(offset + within as u32);
        }
        offset += line.len() as u32;
        line_no += 1;
    }
    None
}

/// `hover(file, pos)` (spec.md `6`): the innermost identifier whose
/// span contains `position`, or `None` if `position` doesn't land on
/// one (whitespace, a literal, a parse failure).
pub fn hover(source: &SourceUnit, position: Position) -> Option<HoverInfo> {
    let offset = byte_offset_of(source.text(), position)?;
    let ParserReturn { program, panicked, .. } = Parser::new(source.text()).parse();
    if panicked {
        return None;
    }
    let mut finder = IdentifierFinder { offset, found: None };
    finder.visit_program(&program);
    finder.found
}

/// `resolve(emitted_pos) → source_pos` (spec.md `6`): the DAP's entry
/// point, a thin wrapper over [`SourceMap::lookup`].
pub fn resolve(source_map: &SourceMap, emitted_pos: Position) -> Option<SourcePosition> {
    source_map.lookup(emitted_pos)
}

/// `audit <file>` (spec.md `6`): parse plus deep analysis only, no
/// code generation. Every diagnostic reachable is reported regardless
/// of severity, but whether the audit counts as passing is narrower
/// than [`mlpy_semantic::AnalysisReport::is_fatal`]: an audit only
/// fails on a genuinely `Severity::Critical` finding (e.g. `setattr`),
/// not on the `Warning`/`Info`-level findings (`getattr`, `hasattr`)
/// that `is_fatal` would already treat as pipeline-aborting in strict
/// mode. `is_fatal` answers "should compilation stop here"; an audit
/// answers "is this program dangerous", and those are different
/// questions (recorded in `DESIGN.md`).
#[derive(Debug, Clone)]
pub struct AuditReport {
    pub diagnostics: Vec<DiagnosticRecord>,
}

impl AuditReport {
    pub fn has_critical_findings(&self) -> bool {
        self.diagnostics.iter().any(|record| record.severity == Severity::Critical)
    }
}

pub fn audit(source: &SourceUnit, mode: AnalysisMode) -> AuditReport {
    let file = source.file_id().as_str();
    let mut diagnostics = Vec::new();

    let ParserReturn { program, errors, panicked } = Parser::new(source.text()).parse();
    diagnostics.extend(errors.iter().map(|e| records::to_diagnostic_record(file, e, records::PARSE)));
    if panicked {
        return AuditReport { diagnostics };
    }

    let report = mlpy_semantic::analyze(&program, DeepAnalysis::Run(mode));
    diagnostics.extend(report.validation.iter().map(|e| records::to_diagnostic_record(file, e, records::VALIDATION)));
    diagnostics.extend(report.shallow_security.iter().map(|e| records::to_diagnostic_record(file, e, records::SECURITY)));
    diagnostics.extend(report.deep_security.iter().map(|e| records::to_diagnostic_record(file, e, records::SECURITY)));
    AuditReport { diagnostics }
}

/// The registry `mlpy run`/`mlpy audit` fall back to when the caller
/// configures none of their own (spec.md `1`: bridge-module
/// bodies/contracts are externally registered).
pub fn default_registry() -> Registry {
    bridges::default_registry()
}

#[cfg(test)]
mod test {
    use super::*;
    use mlpy_span::FileId;
    use std::num::NonZeroUsize;

    fn source_unit(text: &str) -> SourceUnit {
        SourceUnit::new(FileId::new("main.ml"), text)
    }

    #[test]
    fn hello_world_compiles_cleanly() {
        let source = source_unit("name = \"World\"; print(\"Hello, \" + name);");
        let cache = Cache::memory_only(NonZeroUsize::new(4).unwrap());
        let registry = default_registry();
        let outcome = compile(&source, Path::new("main.ml"), &cache, &registry, &CompileOptions::default());
        assert!(outcome.is_success());
    }

    #[test]
    fn dangerous_identifier_fails_compilation() {
        let source = source_unit("x = __class__;");
        let cache = Cache::memory_only(NonZeroUsize::new(4).unwrap());
        let registry = default_registry();
        let outcome = compile(&source, Path::new("main.ml"), &cache, &registry, &CompileOptions::default());
        assert!(!outcome.is_success());
    }

    #[test]
    fn repeated_compile_of_identical_source_hits_the_cache() {
        let source = source_unit("print(\"hi\");");
        let cache = Cache::memory_only(NonZeroUsize::new(4).unwrap());
        let registry = default_registry();
        let path = Path::new("main.ml");
        compile(&source, path, &cache, &registry, &CompileOptions::default());
        compile(&source, path, &cache, &registry, &CompileOptions::default());
        assert_eq!(cache.compile_invocations(), 1);
    }

    #[test]
    fn diagnose_reports_parse_errors_without_panicking() {
        let source = source_unit("x = ;");
        let records = diagnose(&source, DeepAnalysis::Skip);
        assert!(!records.is_empty());
    }

    #[test]
    fn diagnose_reports_permissive_deep_findings_as_non_fatal() {
        let source = source_unit("hasattr(obj, name);");
        let records = diagnose(&source, DeepAnalysis::Run(AnalysisMode::Permissive));
        assert!(records.iter().any(|r| r.severity == Severity::Info));
    }

    #[test]
    fn hover_finds_the_identifier_at_a_position() {
        let source = source_unit("name = \"World\";");
        let info = hover(&source, Position::new(1, 1)).expect("identifier at column 1");
        assert_eq!(info.name, "name");
    }

    #[test]
    fn hover_outside_any_identifier_returns_none() {
        let source = source_unit("name = \"World\";");
        assert!(hover(&source, Position::new(99, 1)).is_none());
    }

    #[test]
    fn audit_passes_clean_programs() {
        let source = source_unit("print(\"hello\");");
        let report = audit(&source, AnalysisMode::Strict);
        assert!(!report.has_critical_findings());
    }

    #[test]
    fn audit_fails_only_on_a_critical_finding() {
        let permissive_only = source_unit("hasattr(obj, name);");
        let report = audit(&permissive_only, AnalysisMode::Strict);
        assert!(!report.has_critical_findings(), "hasattr is Info severity, not Critical");

        let critical = source_unit("setattr(obj, name, value);");
        let report = audit(&critical, AnalysisMode::Strict);
        assert!(report.has_critical_findings());
    }
}
