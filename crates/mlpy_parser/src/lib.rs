//! Grammar-driven lexer and recursive-descent parser for mlpy source
//! (spec.md `4.1`).
//!
//! # Usage
//!
//! ```
//! use mlpy_parser::Parser;
//!
//! let ret = Parser::new("name = \"World\";").parse();
//! assert!(ret.errors.is_empty());
//! ```
//!
//! The parser never silently drops an error: on an unrecoverable failure
//! it returns an empty [`Program`][mlpy_ast::Program] *and* pushes a
//! diagnostic into `errors`. The historical bug this guards against
//! returned `(None, [], None)` on a parse exception — a silently empty
//! result with no diagnostic at all (spec.md `4.1`).

mod cursor;
mod diagnostics;
mod expr;
mod lexer;
mod stmt;

use cursor::Cursor;
use mlpy_ast::ast::Program;
use mlpy_diagnostics::Error;
use mlpy_span::Span;

/// Return value of [`Parser::parse`]: the AST plus every diagnostic
/// accumulated while producing it.
pub struct ParserReturn {
    pub program: Program,
    pub errors: Vec<Error>,
    /// `true` when the parser could not recover and fell back to an
    /// empty program. `errors` is guaranteed non-empty whenever this is
    /// `true` (spec.md `8`: "`parse(S)` either returns an AST or returns
    /// at least one diagnostic; never both empty").
    pub panicked: bool,
}

/// Recursive descent parser. See [`Parser::parse`] for the entry point.
pub struct Parser {
    cursor: Cursor,
    errors: Vec<Error>,
    source_len: u32,
}

impl Parser {
    pub fn new(source_text: &str) -> Self {
        let (tokens, lex_errors) = lexer::Lexer::new(source_text).tokenize();
        Self { cursor: Cursor::new(tokens), errors: lex_errors, source_len: source_text.len() as u32 }
    }

    /// Parse the whole source. Deterministic, whitespace-insensitive
    /// except inside string literals.
    pub fn parse(mut self) -> ParserReturn {
        let body = self.parse_program_body();
        let program = Program { span: Span::new(0, self.source_len, 1, 1), body };
        let panicked = program.is_empty() && !self.errors.is_empty();
        ParserReturn { program, errors: self.errors, panicked }
    }

    pub(crate) fn error(&mut self, error: Error) {
        self.errors.push(error);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mlpy_ast::ast::*;
    use mlpy_ast::Visit;

    #[test]
    fn smoke_test_empty_source() {
        let ret = Parser::new("").parse();
        assert!(ret.program.is_empty());
        assert!(ret.errors.is_empty());
        assert!(!ret.panicked);
    }

    #[test]
    fn never_returns_both_empty() {
        let ret = Parser::new("x = ;").parse();
        assert!(!ret.errors.is_empty());
    }

    #[test]
    fn hello_world_parses_cleanly() {
        let ret = Parser::new(r#"name = "World"; print("Hello, " + name);"#).parse();
        assert!(ret.errors.is_empty(), "errors: {:?}", ret.errors.iter().map(ToString::to_string).collect::<Vec<_>>());
        assert_eq!(ret.program.body.len(), 2);
    }

    #[test]
    fn assignment_is_right_associative() {
        let ret = Parser::new("x = y = 1;").parse();
        assert!(ret.errors.is_empty());
        let Stmt::Expr(stmt) = &ret.program.body[0] else { panic!("expected expr stmt") };
        let Expr::Assignment(outer) = &stmt.expr else { panic!("expected assignment") };
        assert!(matches!(outer.value, Expr::Assignment(_)));
    }

    #[test]
    fn chained_comparison_without_parens_is_rejected() {
        let ret = Parser::new("x = 1 < 2 < 3;").parse();
        assert!(!ret.errors.is_empty());
    }

    #[test]
    fn chained_comparison_with_parens_is_accepted() {
        let ret = Parser::new("x = (1 < 2) < 3;").parse();
        assert!(ret.errors.is_empty(), "errors: {:?}", ret.errors.iter().map(ToString::to_string).collect::<Vec<_>>());
    }

    #[test]
    fn invalid_assignment_target_is_rejected() {
        let ret = Parser::new("1 + 1 = 2;").parse();
        assert!(!ret.errors.is_empty());
    }

    #[test]
    fn bodyless_arrow_is_an_expression() {
        let ret = Parser::new("f = fn(x) => x + 1;").parse();
        assert!(ret.errors.is_empty(), "errors: {:?}", ret.errors.iter().map(ToString::to_string).collect::<Vec<_>>());
        let Stmt::Expr(stmt) = &ret.program.body[0] else { panic!() };
        let Expr::Assignment(assign) = &stmt.expr else { panic!() };
        let Expr::Arrow(arrow) = &assign.value else { panic!("expected arrow function") };
        assert!(matches!(arrow.body, ArrowBody::Expr(_)));
    }

    #[test]
    fn braced_arrow_body_is_a_block() {
        let ret = Parser::new("f = fn(x) => { return x; };").parse();
        assert!(ret.errors.is_empty());
        let Stmt::Expr(stmt) = &ret.program.body[0] else { panic!() };
        let Expr::Assignment(assign) = &stmt.expr else { panic!() };
        let Expr::Arrow(arrow) = &assign.value else { panic!() };
        assert!(matches!(arrow.body, ArrowBody::Block(_)));
    }

    #[test]
    fn elif_chain_nests_as_if_statements() {
        let ret = Parser::new("if (a) { x = 1; } elif (b) { x = 2; } else { x = 3; }").parse();
        assert!(ret.errors.is_empty(), "errors: {:?}", ret.errors.iter().map(ToString::to_string).collect::<Vec<_>>());
        let Stmt::If(outer) = &ret.program.body[0] else { panic!() };
        let Some(alt) = &outer.alternate else { panic!("expected elif branch") };
        assert!(matches!(**alt, Stmt::If(_)));
    }

    #[test]
    fn capability_block_parses() {
        let ret = Parser::new(r#"capability file { x = read("a.txt"); }"#).parse();
        assert!(ret.errors.is_empty(), "errors: {:?}", ret.errors.iter().map(ToString::to_string).collect::<Vec<_>>());
        assert!(matches!(ret.program.body[0], Stmt::Capability(_)));
    }

    #[test]
    fn try_except_finally_parses() {
        let source = "try { x = 1; } except (e) { x = 2; } finally { x = 3; }";
        let ret = Parser::new(source).parse();
        assert!(ret.errors.is_empty(), "errors: {:?}", ret.errors.iter().map(ToString::to_string).collect::<Vec<_>>());
        let Stmt::Try(stmt) = &ret.program.body[0] else { panic!() };
        assert!(stmt.handler.is_some());
        assert!(stmt.finalizer.is_some());
    }

    #[test]
    fn every_span_is_within_source_bounds() {
        let source = r#"
            x = 1;
            fn add(a, b) { return a + b; }
            if (x > 0) { print(x); } else { print(0 - x); }
        "#;
        let ret = Parser::new(source).parse();
        assert!(ret.errors.is_empty(), "errors: {:?}", ret.errors.iter().map(ToString::to_string).collect::<Vec<_>>());
        struct SpanCheck {
            len: u32,
        }
        impl mlpy_ast::Visit for SpanCheck {
            fn visit_expr(&mut self, expr: &Expr) {
                let span = expr.span();
                assert!(span.start <= span.end && span.end <= self.len);
                mlpy_ast::visit::walk_expr(self, expr);
            }
            fn visit_stmt(&mut self, stmt: &Stmt) {
                let span = stmt.span();
                assert!(span.start <= span.end && span.end <= self.len);
                mlpy_ast::visit::walk_stmt(self, stmt);
            }
        }
        let mut checker = SpanCheck { len: source.len() as u32 };
        checker.visit_program(&ret.program);
    }
}
