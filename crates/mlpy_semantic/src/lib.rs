//! AST validation and capability-aware security analysis (spec.md `4.2`
//! through `4.4`). Three independent passes share one entry point,
//! [`analyze`]: the [`AstValidator`] (structural invariants I1-I5), the
//! [`security_shallow::ShallowSecurityAnalyzer`] (blanket dunder and
//! forbidden-name rejection, always on), and the
//! [`security_deep::DeepSecurityAnalyzer`] (pattern/taint analysis, only
//! run when the caller opts into deep analysis).

pub mod diagnostics;
pub mod security_deep;
pub mod security_shallow;
pub mod validator;

pub use security_deep::{AnalysisMode, DeepSecurityAnalyzer};
pub use security_shallow::ShallowSecurityAnalyzer;
pub use validator::AstValidator;

use mlpy_ast::ast::Program;
use mlpy_diagnostics::Diagnostics;

/// Whether to run the deep analyzer at all, and if so under which mode.
/// `None` skips `4.4` entirely — used by callers (e.g. a fast
/// syntax-check-only CLI invocation) that only need structural and
/// shallow-security validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepAnalysis {
    Skip,
    Run(AnalysisMode),
}

/// The combined result of running all three passes in sequence. Mirrors
/// the pipeline's stage-by-stage structure (spec.md `3`, Lifecycle):
/// validation runs first because a structurally invalid program makes
/// the security passes meaningless, then the two security passes run
/// independently of each other (spec.md `4.4` does not depend on `4.3`'s
/// findings; `4.3`'s rejection of a dunder is final regardless of what
/// `4.4` would have said about the same span).
#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub validation: Diagnostics,
    pub shallow_security: Diagnostics,
    pub deep_security: Diagnostics,
}

impl AnalysisReport {
    pub fn is_clean(&self) -> bool {
        self.validation.is_empty() && self.shallow_security.is_empty() && self.deep_security.is_empty()
    }

    /// Whether this report should abort compilation outright. Validation
    /// and shallow-security findings are always fatal; deep-security
    /// findings are fatal only in strict mode (spec.md `4.4`).
    pub fn is_fatal(&self, deep_mode: DeepAnalysis) -> bool {
        if !self.validation.is_empty() || !self.shallow_security.is_empty() {
            return true;
        }
        match deep_mode {
            DeepAnalysis::Skip => false,
            DeepAnalysis::Run(mode) => security_deep::has_fatal_finding(&self.deep_security, mode),
        }
    }
}

/// Runs validation and both security passes over `program`, in that
/// order. This is the one function the facade crate calls; it does not
/// decide what a fatal result means for the pipeline overall, that's
/// [`AnalysisReport::is_fatal`]'s job, so that callers which only want a
/// report (e.g. `mlpy::diagnose`) can still see every finding.
pub fn analyze(program: &Program, deep_analysis: DeepAnalysis) -> AnalysisReport {
    let validation = AstValidator::new().validate(program);
    let shallow_security = ShallowSecurityAnalyzer::new().analyze(program);
    let deep_security = match deep_analysis {
        DeepAnalysis::Skip => Diagnostics::new(),
        DeepAnalysis::Run(mode) => DeepSecurityAnalyzer::new(mode).analyze(program),
    };
    AnalysisReport { validation, shallow_security, deep_security }
}

#[cfg(test)]
mod test {
    use super::*;
    use mlpy_parser::Parser;

    fn parse(source: &str) -> Program {
        let ret = Parser::new(source).parse();
        assert!(ret.errors.is_empty());
        ret.program
    }

    #[test]
    fn clean_program_produces_no_findings() {
        let program = parse(r#"name = "World"; print("Hello, " + name);"#);
        let report = analyze(&program, DeepAnalysis::Skip);
        assert!(report.is_clean());
        assert!(!report.is_fatal(DeepAnalysis::Skip));
    }

    #[test]
    fn dunder_use_is_fatal_even_when_deep_analysis_is_skipped() {
        let program = parse("x = __class__;");
        let report = analyze(&program, DeepAnalysis::Skip);
        assert!(report.is_fatal(DeepAnalysis::Skip));
    }

    #[test]
    fn deep_finding_is_fatal_only_in_strict_mode() {
        let program = parse("setattr(obj, name, value);");
        let permissive = analyze(&program, DeepAnalysis::Run(AnalysisMode::Permissive));
        assert!(!permissive.is_fatal(DeepAnalysis::Run(AnalysisMode::Permissive)));

        let strict = analyze(&program, DeepAnalysis::Run(AnalysisMode::Strict));
        assert!(strict.is_fatal(DeepAnalysis::Run(AnalysisMode::Strict)));
    }
}
