//! AST Validator (spec.md `4.2`): walks the parsed AST and enforces
//! invariants I1-I5 plus light structural checks. A fatal validation
//! error aborts the pipeline before the security analyzer runs.

use crate::diagnostics::{DuplicateParameter, InvalidAssignmentTarget, JumpOutsideLoop, ReturnOutsideFunction};
use mlpy_ast::ast::*;
use mlpy_ast::visit::{walk_arrow, walk_block, walk_function_def, walk_stmt};
use mlpy_ast::Visit;
use mlpy_diagnostics::Diagnostics;
use rustc_hash::FxHashSet;

pub struct AstValidator {
    diagnostics: Diagnostics,
    in_function_depth: u32,
    in_loop_depth: u32,
}

impl AstValidator {
    pub fn new() -> Self {
        Self { diagnostics: Diagnostics::new(), in_function_depth: 0, in_loop_depth: 0 }
    }

    pub fn validate(mut self, program: &Program) -> Diagnostics {
        self.visit_program(program);
        self.diagnostics
    }

    fn check_params(&mut self, params: &[Param]) {
        let mut seen = FxHashSet::default();
        for param in params {
            if !seen.insert(param.name.clone()) {
                self.diagnostics.push(DuplicateParameter(param.span, param.name.clone()));
            }
        }
    }

    fn check_assignment_target(&mut self, expr: &Expr) {
        if !expr.is_assignment_target() {
            self.diagnostics.push(InvalidAssignmentTarget(expr.span()));
        }
    }
}

impl Default for AstValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Visit for AstValidator {
    fn visit_function_def(&mut self, func: &FunctionDef) {
        self.check_params(&func.params);
        self.in_function_depth += 1;
        // `break`/`continue` cannot reach through a function boundary
        // into an enclosing loop, so loop-depth is reset for the body.
        let outer_loop_depth = std::mem::replace(&mut self.in_loop_depth, 0);
        walk_function_def(self, func);
        self.in_loop_depth = outer_loop_depth;
        self.in_function_depth -= 1;
    }

    fn visit_arrow(&mut self, arrow: &ArrowFunctionExpr) {
        self.check_params(&arrow.params);
        self.in_function_depth += 1;
        let outer_loop_depth = std::mem::replace(&mut self.in_loop_depth, 0);
        walk_arrow(self, arrow);
        self.in_loop_depth = outer_loop_depth;
        self.in_function_depth -= 1;
    }

    fn visit_assignment(&mut self, assignment: &AssignmentExpr) {
        self.check_assignment_target(&assignment.target);
        self.visit_expr(&assignment.target);
        self.visit_expr(&assignment.value);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::While(s) => {
                self.visit_expr(&s.test);
                self.in_loop_depth += 1;
                walk_block(self, &s.body);
                self.in_loop_depth -= 1;
            }
            Stmt::ForIn(s) => {
                self.visit_expr(&s.iterable);
                self.in_loop_depth += 1;
                walk_block(self, &s.body);
                self.in_loop_depth -= 1;
            }
            Stmt::Break(s) => {
                if self.in_loop_depth == 0 {
                    self.diagnostics.push(JumpOutsideLoop(s.span, "break"));
                }
            }
            Stmt::Continue(s) => {
                if self.in_loop_depth == 0 {
                    self.diagnostics.push(JumpOutsideLoop(s.span, "continue"));
                }
            }
            Stmt::Return(s) => {
                if self.in_function_depth == 0 {
                    self.diagnostics.push(ReturnOutsideFunction(s.span));
                }
                if let Some(arg) = &s.argument {
                    self.visit_expr(arg);
                }
            }
            _ => walk_stmt(self, stmt),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mlpy_parser::Parser;

    fn validate(source: &str) -> Diagnostics {
        let ret = Parser::new(source).parse();
        assert!(ret.errors.is_empty(), "parse errors: {:?}", ret.errors.iter().map(ToString::to_string).collect::<Vec<_>>());
        AstValidator::new().validate(&ret.program)
    }

    #[test]
    fn return_inside_function_is_fine() {
        let diagnostics = validate("fn f() { return 1; }");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn return_at_top_level_is_rejected() {
        let diagnostics = validate("return 1;");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn break_inside_while_is_fine() {
        let diagnostics = validate("while (true) { break; }");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn break_at_top_level_is_rejected() {
        let diagnostics = validate("if (true) { break; }");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn duplicate_parameter_names_are_rejected() {
        let diagnostics = validate("fn f(a, a) { return a; }");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn break_inside_nested_function_within_loop_is_still_rejected() {
        // A function body is not itself a loop, even when lexically
        // nested inside one.
        let diagnostics = validate("while (true) { fn f() { break; } }");
        assert_eq!(diagnostics.len(), 1);
    }
}
