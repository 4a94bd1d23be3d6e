//! Shallow security analyzer (spec.md `4.3`): rejects ML source that
//! could name host-internal constructs, before code generation ever
//! runs. Always on, in both strict and permissive mode.

use crate::diagnostics::{DangerousIdentifier, ForbiddenName};
use mlpy_ast::ast::*;
use mlpy_ast::visit::walk_expr;
use mlpy_ast::Visit;
use mlpy_diagnostics::Diagnostics;
use mlpy_registry::FORBIDDEN_NAMES;
use mlpy_span::Span;

pub struct ShallowSecurityAnalyzer {
    diagnostics: Diagnostics,
}

impl ShallowSecurityAnalyzer {
    pub fn new() -> Self {
        Self { diagnostics: Diagnostics::new() }
    }

    pub fn analyze(mut self, program: &Program) -> Diagnostics {
        self.visit_program(program);
        self.diagnostics
    }

    /// Applies to every syntactic position a bare name can occupy:
    /// variable read, variable write, parameter name, function name,
    /// attribute name, member-access right-hand side, call target,
    /// import path segment, and capability block name. Unconditional;
    /// admits no exceptions (spec.md `4.3`).
    fn check_name(&mut self, name: &str, span: Span) {
        if name.starts_with("__") {
            self.diagnostics.push(DangerousIdentifier(span, name.to_string()));
            return;
        }
        if FORBIDDEN_NAMES.contains(&name) {
            self.diagnostics.push(ForbiddenName(span, name.to_string()));
        }
    }
}

impl Default for ShallowSecurityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Visit for ShallowSecurityAnalyzer {
    fn visit_identifier(&mut self, ident: &IdentifierRef) {
        self.check_name(&ident.name, ident.span);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Member(member) = expr {
            self.check_name(&member.property, member.property_span);
        }
        walk_expr(self, expr);
    }

    fn visit_function_def(&mut self, func: &FunctionDef) {
        self.check_name(&func.name, func.span);
        for param in &func.params {
            self.check_name(&param.name, param.span);
        }
        mlpy_ast::visit::walk_function_def(self, func);
    }

    fn visit_arrow(&mut self, arrow: &ArrowFunctionExpr) {
        for param in &arrow.params {
            self.check_name(&param.name, param.span);
        }
        mlpy_ast::visit::walk_arrow(self, arrow);
    }

    fn visit_import(&mut self, import: &ImportStmt) {
        for segment in &import.path {
            self.check_name(segment, import.span);
        }
    }

    fn visit_capability(&mut self, capability: &CapabilityStmt) {
        self.check_name(&capability.name, capability.span);
        mlpy_ast::visit::walk_capability(self, capability);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mlpy_parser::Parser;

    fn analyze(source: &str) -> Diagnostics {
        let ret = Parser::new(source).parse();
        assert!(ret.errors.is_empty(), "parse errors: {:?}", ret.errors.iter().map(ToString::to_string).collect::<Vec<_>>());
        ShallowSecurityAnalyzer::new().analyze(&ret.program)
    }

    #[test]
    fn dunder_variable_read_is_rejected() {
        let diagnostics = analyze("x = __class__;");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn dunder_attribute_access_is_rejected() {
        let diagnostics = analyze("y = obj.__dict__;");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn dunder_parameter_name_is_rejected() {
        let diagnostics = analyze("fn f(__secret) { return __secret; }");
        // Both the parameter declaration and its use are flagged.
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn forbidden_call_target_is_rejected() {
        let diagnostics = analyze("x = eval(\"1\");");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn ordinary_identifiers_are_untouched() {
        let diagnostics = analyze(r#"name = "World"; print("Hello, " + name);"#);
        assert!(diagnostics.is_empty());
    }

    /// Known compile-time gap, documented in spec.md `4.3` and `9`: a
    /// string literal that spells a dunder is not caught here. This is
    /// compensated for at runtime by `safe_attr_access`'s unconditional
    /// leading-underscore rejection (`mlpy_codegen::runtime`), not by
    /// this analyzer.
    #[test]
    #[ignore = "documented compile-time gap: string-literal dunders are not caught by the shallow analyzer"]
    fn string_literal_dunder_is_not_caught_xfail() {
        let diagnostics = analyze(r#"x = getattr(obj, "__class__");"#);
        assert!(!diagnostics.is_empty(), "this is expected to fail: the gap is real");
    }
}
