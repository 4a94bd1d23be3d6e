//! Flattens stage-local `miette::Error` diagnostics into the
//! serializable [`DiagnosticRecord`] shape spec.md `7` names ("Every
//! error has `file`, `line`, `column`, `kind`, and `message`").
//!
//! Each stage derives its own `#[derive(Error, Diagnostic)]` struct
//! local to that crate; this module is the one place that knows the
//! full list and downcasts against it, so that `pipeline::diagnose`
//! never needs to match on rendered message text.

use mlpy_diagnostics::{DiagnosticKind, DiagnosticRecord, Error, Severity};
use mlpy_span::Span;

/// Converts one stage diagnostic into a [`DiagnosticRecord`], tagging
/// it with `kind` and recovering whatever span/severity the concrete
/// struct behind `error` carries.
///
/// Falls back to [`Span::dummy`] and [`Severity::Critical`] for a
/// diagnostic type this module doesn't recognize — this can only
/// happen if a new stage-local struct is added without a matching
/// `downcast_ref` arm here, which a reviewer should treat as a bug in
/// this file rather than in the caller.
pub fn to_diagnostic_record(file: &str, error: &Error, kind: DiagnosticKind) -> DiagnosticRecord {
    let (span, severity) = extract(error);
    DiagnosticRecord::new(file, span, kind, error.to_string()).with_severity(severity)
}

/// Recovers `(Span, Severity)` from whichever concrete diagnostic
/// struct `error` wraps. Severity defaults to `Critical` for every
/// struct that doesn't carry its own (parse/validation/codegen
/// diagnostics are all unconditionally fatal; only
/// `mlpy_semantic::diagnostics::SecurityFinding` varies).
fn extract(error: &Error) -> (Span, Severity) {
    use mlpy_codegen::diagnostics::{RefusedDunderEmission, UnsupportedNestedAssignment};
    use mlpy_parser::diagnostics::{InvalidEscape, InvalidNumber, UnexpectedToken, UnterminatedString};
    use mlpy_semantic::diagnostics::{
        DangerousIdentifier, DuplicateParameter, ForbiddenName, InvalidAssignmentTarget, JumpOutsideLoop, ReturnOutsideFunction, SecurityFinding,
    };

    if let Some(d) = error.downcast_ref::<UnexpectedToken>() {
        return (d.0, Severity::Critical);
    }
    if let Some(d) = error.downcast_ref::<UnterminatedString>() {
        return (d.0, Severity::Critical);
    }
    if let Some(d) = error.downcast_ref::<InvalidEscape>() {
        return (d.0, Severity::Critical);
    }
    if let Some(d) = error.downcast_ref::<InvalidNumber>() {
        return (d.0, Severity::Critical);
    }
    if let Some(d) = error.downcast_ref::<DuplicateParameter>() {
        return (d.0, Severity::Critical);
    }
    if let Some(d) = error.downcast_ref::<ReturnOutsideFunction>() {
        return (d.0, Severity::Critical);
    }
    if let Some(d) = error.downcast_ref::<JumpOutsideLoop>() {
        return (d.0, Severity::Critical);
    }
    if let Some(d) = error.downcast_ref::<InvalidAssignmentTarget>() {
        return (d.0, Severity::Critical);
    }
    if let Some(d) = error.downcast_ref::<DangerousIdentifier>() {
        return (d.0, Severity::Critical);
    }
    if let Some(d) = error.downcast_ref::<ForbiddenName>() {
        return (d.0, Severity::Critical);
    }
    if let Some(d) = error.downcast_ref::<SecurityFinding>() {
        return (d.0, d.1);
    }
    if let Some(d) = error.downcast_ref::<RefusedDunderEmission>() {
        return (d.0, Severity::Critical);
    }
    if let Some(d) = error.downcast_ref::<UnsupportedNestedAssignment>() {
        return (d.0, Severity::Critical);
    }

    (Span::dummy(), Severity::Critical)
}

/// `DiagnosticKind` for every diagnostic produced while running the
/// security passes: shallow findings are always `Security`, deep
/// findings are `Security` as well — the split that matters (shallow
/// vs. deep) is already visible in which `Diagnostics` list the error
/// came from, not in the record itself.
pub const VALIDATION: DiagnosticKind = DiagnosticKind::Validation;
pub const SECURITY: DiagnosticKind = DiagnosticKind::Security;
pub const PARSE: DiagnosticKind = DiagnosticKind::Parse;
pub const CODEGEN: DiagnosticKind = DiagnosticKind::CodeGen;

#[cfg(test)]
mod test {
    use super::*;
    use mlpy_ast::ast::Program;
    use mlpy_parser::Parser;
    use mlpy_semantic::{analyze, DeepAnalysis};

    fn parse(source: &str) -> Program {
        Parser::new(source).parse().program
    }

    #[test]
    fn parse_error_recovers_its_span() {
        let ret = Parser::new("x = ;").parse();
        assert!(!ret.errors.is_empty());
        let record = to_diagnostic_record("main.ml", &ret.errors[0], PARSE);
        assert_eq!(record.kind, PARSE);
        assert_eq!(record.severity, Severity::Critical);
    }

    #[test]
    fn dangerous_identifier_is_critical() {
        let program = parse("x = __class__;");
        let report = analyze(&program, DeepAnalysis::Skip);
        assert!(!report.shallow_security.is_empty());
        let error = report.shallow_security.iter().next().unwrap();
        let record = to_diagnostic_record("main.ml", error, SECURITY);
        assert_eq!(record.severity, Severity::Critical);
    }

    #[test]
    fn deep_security_finding_preserves_its_own_severity() {
        use mlpy_semantic::AnalysisMode;
        let program = parse("hasattr(obj, name);");
        let report = analyze(&program, DeepAnalysis::Run(AnalysisMode::Permissive));
        assert!(!report.deep_security.is_empty());
        let error = report.deep_security.iter().next().unwrap();
        let record = to_diagnostic_record("main.ml", error, SECURITY);
        assert_eq!(record.severity, Severity::Info);
    }

    #[test]
    fn unrecognized_diagnostic_falls_back_to_dummy_span() {
        let error: Error = miette::miette!("boom");
        let record = to_diagnostic_record("main.ml", &error, CODEGEN);
        assert_eq!(record.line, 1);
        assert_eq!(record.column, 1);
    }
}
