//! Code generator (spec.md `4.5`): AST → host source plus a source map.
//!
//! Every call, attribute read, attribute write, and method call is
//! wrapped through the runtime prelude's `safe_*` functions; direct
//! host operators are emitted only for the pure arithmetic/comparison/
//! boolean operators already expressed as [`mlpy_ast::ast::BinaryExpr`]/
//! [`mlpy_ast::ast::UnaryExpr`] nodes, never for a bare [`CallExpr`].
//! Grounded on `oxc_codegen`'s split between a cursor-tracking buffer
//! (`builder`) and a tree-walking generator that writes into it.

mod builder;
pub mod diagnostics;
mod keywords;
pub mod runtime;

use builder::CodeBuilder;
use diagnostics::{RefusedDunderEmission, UnsupportedNestedAssignment};
use mlpy_ast::ast::*;
use mlpy_ast::{BinaryOperator, UnaryOperator};
use mlpy_diagnostics::Diagnostics;
use mlpy_sourcemap::{Mapping, SourceMap};
use mlpy_span::{FileId, Span};
use rustc_hash::FxHashMap;

/// The result of generating one compiled artifact's host source.
pub struct GeneratedOutput {
    pub source: String,
    pub source_map: SourceMap,
    pub diagnostics: Diagnostics,
}

pub fn generate(program: &Program, file_id: FileId) -> GeneratedOutput {
    let mut generator = Generator::new(file_id);
    generator.builder.print_str(runtime::PRELUDE.trim_start());
    generator.builder.newline();
    generator.builder.newline();
    for stmt in &program.body {
        generator.gen_stmt(stmt);
    }
    generator.finish()
}

struct Generator {
    builder: CodeBuilder,
    source_map: SourceMap,
    diagnostics: Diagnostics,
    file_id: FileId,
    renames: FxHashMap<String, String>,
    closure_counter: u32,
    /// Arrow spans already hoisted to a preceding `def`, mapped to the
    /// synthesized name referenced at the original call site.
    hoisted_closures: FxHashMap<Span, String>,
}

impl Generator {
    fn new(file_id: FileId) -> Self {
        Self { builder: CodeBuilder::new(), source_map: SourceMap::new(), diagnostics: Diagnostics::new(), file_id, renames: FxHashMap::default(), closure_counter: 0, hoisted_closures: FxHashMap::default() }
    }

    fn finish(self) -> GeneratedOutput {
        GeneratedOutput { source: self.builder.finish(), source_map: self.source_map, diagnostics: self.diagnostics }
    }

    fn mark(&mut self, span: Span, start: mlpy_sourcemap::Position) {
        let end = self.builder.position();
        self.source_map.add_mapping(Mapping { emitted_start: start, emitted_end: end, source_file: self.file_id.clone(), source_span: span });
    }

    /// Resolves an ML identifier to its emitted name, renaming it (and
    /// recording the rename in the source map's symbol table, spec.md
    /// `3`) the first time it collides with a host keyword.
    fn resolve_name(&mut self, name: &str) -> String {
        if let Some(renamed) = self.renames.get(name) {
            return renamed.clone();
        }
        if keywords::is_reserved(name) {
            let renamed = format!("{name}_");
            self.source_map.rename(name, &renamed);
            self.renames.insert(name.to_string(), renamed.clone());
            renamed
        } else {
            name.to_string()
        }
    }

    /// Belt-and-suspenders dunder refusal at emission time (spec.md
    /// `4.5` point 9). The security analyzer should already have
    /// rejected this; reaching here means that check was skipped, so
    /// this only records a fatal diagnostic rather than trying to
    /// rewrite the identifier into something safe.
    fn refuse_if_dunder(&mut self, name: &str, span: Span) {
        if name.starts_with("__") {
            self.diagnostics.push(RefusedDunderEmission(span, name.to_string()));
        }
    }

    // -- statements ------------------------------------------------

    fn gen_stmt(&mut self, stmt: &Stmt) {
        self.hoist_block_arrows(stmt);
        let start = self.builder.position();
        match stmt {
            Stmt::Expr(s) => self.gen_expr_stmt(s),
            Stmt::FunctionDef(s) => self.gen_function_def(s),
            Stmt::If(s) => self.gen_if(s, false),
            Stmt::While(s) => self.gen_while(s),
            Stmt::ForIn(s) => self.gen_for_in(s),
            Stmt::Break(_) => self.line("break"),
            Stmt::Continue(_) => self.line("continue"),
            Stmt::Return(s) => self.gen_return(s),
            Stmt::Try(s) => self.gen_try(s),
            Stmt::Throw(s) => self.gen_throw(s),
            Stmt::Import(s) => self.gen_import(s),
            Stmt::Capability(s) => self.gen_capability(s),
            Stmt::Block(s) => {
                for inner in &s.body {
                    self.gen_stmt(inner);
                }
            }
        }
        self.mark(stmt.span(), start);
    }

    fn line(&mut self, text: &str) {
        self.builder.print_indent();
        self.builder.print_str(text);
        self.builder.newline();
    }

    fn gen_expr_stmt(&mut self, s: &ExprStmt) {
        if let Expr::Assignment(assignment) = &s.expr {
            self.gen_assignment_stmt(assignment);
        } else {
            self.builder.print_indent();
            self.gen_expr(&s.expr);
            self.builder.newline();
        }
    }

    /// `target = value` emitted as a plain statement (not the nested
    /// walrus form `gen_expr` falls back to), since every ML assignment
    /// reachable here is the top-level expression of an `ExprStmt`.
    fn gen_assignment_stmt(&mut self, assignment: &AssignmentExpr) {
        self.builder.print_indent();
        match &assignment.target {
            Expr::Identifier(ident) => {
                self.refuse_if_dunder(&ident.name, ident.span);
                let name = self.resolve_name(&ident.name);
                self.builder.print_str(&name);
                self.builder.print_str(" = ");
                self.gen_expr(&assignment.value);
                self.builder.newline();
            }
            Expr::Member(member) => {
                self.refuse_if_dunder(&member.property, member.property_span);
                self.builder.print_str("safe_attr_set(");
                self.gen_expr(&member.object);
                self.builder.print_str(", ");
                self.builder.print_str(&python_string_literal(&member.property));
                self.builder.print_str(", ");
                self.gen_expr(&assignment.value);
                self.builder.print_str(")");
                self.builder.newline();
            }
            Expr::Index(index) => {
                self.gen_expr(&index.object);
                self.builder.print_str("[");
                self.gen_expr(&index.index);
                self.builder.print_str("] = ");
                self.gen_expr(&assignment.value);
                self.builder.newline();
            }
            // The validator rejects every other target (invariant I2)
            // before code generation ever runs.
            _ => unreachable!("invalid assignment target reached codegen"),
        }
    }

    fn gen_suite(&mut self, block: &BlockStmt) {
        self.builder.indent();
        if block.body.is_empty() {
            self.line("pass");
        } else {
            for stmt in &block.body {
                self.gen_stmt(stmt);
            }
        }
        self.builder.dedent();
    }

    fn gen_params(&mut self, params: &[Param]) {
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.builder.print_str(", ");
            }
            self.refuse_if_dunder(&param.name, param.span);
            let name = self.resolve_name(&param.name);
            self.builder.print_str(&name);
        }
    }

    fn gen_function_def(&mut self, func: &FunctionDef) {
        self.refuse_if_dunder(&func.name, func.span);
        let name = self.resolve_name(&func.name);
        self.builder.print_indent();
        self.builder.print_str("def ");
        self.builder.print_str(&name);
        self.builder.print_str("(");
        self.gen_params(&func.params);
        self.builder.print_str("):");
        self.builder.newline();
        self.gen_suite(&func.body);
    }

    fn gen_if(&mut self, stmt: &IfStmt, is_elif: bool) {
        self.builder.print_indent();
        self.builder.print_str(if is_elif { "elif " } else { "if " });
        self.gen_expr(&stmt.test);
        self.builder.print_str(":");
        self.builder.newline();
        self.gen_suite(&stmt.consequent);
        match stmt.alternate.as_deref() {
            Some(Stmt::If(inner)) => self.gen_if(inner, true),
            Some(Stmt::Block(block)) => {
                self.line("else:");
                self.gen_suite(block);
            }
            Some(_) => unreachable!("parser only produces If or Block as an else-branch"),
            None => {}
        }
    }

    fn gen_while(&mut self, stmt: &WhileStmt) {
        self.builder.print_indent();
        self.builder.print_str("while ");
        self.gen_expr(&stmt.test);
        self.builder.print_str(":");
        self.builder.newline();
        self.gen_suite(&stmt.body);
    }

    fn gen_for_in(&mut self, stmt: &ForInStmt) {
        self.builder.print_indent();
        self.builder.print_str("for ");
        let name = self.resolve_name(&stmt.binding);
        self.builder.print_str(&name);
        self.builder.print_str(" in ");
        self.gen_expr(&stmt.iterable);
        self.builder.print_str(":");
        self.builder.newline();
        self.gen_suite(&stmt.body);
    }

    fn gen_return(&mut self, stmt: &ReturnStmt) {
        self.builder.print_indent();
        self.builder.print_str("return");
        if let Some(arg) = &stmt.argument {
            self.builder.print_str(" ");
            self.gen_expr(arg);
        }
        self.builder.newline();
    }

    fn gen_throw(&mut self, stmt: &ThrowStmt) {
        self.builder.print_indent();
        self.builder.print_str("raise ");
        self.gen_expr(&stmt.argument);
        self.builder.newline();
    }

    fn gen_try(&mut self, stmt: &TryStmt) {
        self.line("try:");
        self.gen_suite(&stmt.block);
        if let Some(handler) = &stmt.handler {
            self.builder.print_indent();
            match &handler.param {
                Some(name) => {
                    let resolved = self.resolve_name(name);
                    self.builder.print_str("except Exception as ");
                    self.builder.print_str(&resolved);
                    self.builder.print_str(":");
                }
                None => self.builder.print_str("except Exception:"),
            }
            self.builder.newline();
            self.gen_suite(&handler.body);
        }
        if let Some(finalizer) = &stmt.finalizer {
            self.line("finally:");
            self.gen_suite(finalizer);
        }
    }

    fn gen_import(&mut self, stmt: &ImportStmt) {
        for segment in &stmt.path {
            self.refuse_if_dunder(segment, stmt.span);
        }
        let binding = self.resolve_name(stmt.module_name());
        self.builder.print_indent();
        self.builder.print_str(&binding);
        self.builder.print_str(" = safe_import(");
        self.builder.print_str(&python_string_literal(&stmt.dotted_name()));
        self.builder.print_str(")");
        self.builder.newline();
    }

    fn gen_capability(&mut self, stmt: &CapabilityStmt) {
        self.refuse_if_dunder(&stmt.name, stmt.span);
        self.builder.print_indent();
        self.builder.print_str("_cap_ctx.push(_resolve_capability_tokens(");
        self.builder.print_str(&python_string_literal(&stmt.name));
        self.builder.print_str("))");
        self.builder.newline();
        // Push/pop is always emitted as a try/finally pair so every
        // exit path — normal fallthrough, `return`, `break`/`continue`
        // to an outer scope, or a thrown error — pops exactly the
        // frame pushed above (spec.md `4.5` point 6).
        self.line("try:");
        self.gen_suite(&stmt.body);
        self.line("finally:");
        self.builder.indent();
        self.line("_cap_ctx.pop()");
        self.builder.dedent();
    }

    // -- expressions -------------------------------------------------

    fn gen_expr(&mut self, expr: &Expr) {
        let start = self.builder.position();
        self.gen_expr_inner(expr);
        self.mark(expr.span(), start);
    }

    fn gen_expr_inner(&mut self, expr: &Expr) {
        match expr {
            Expr::NumberLiteral(n) => self.builder.print_str(&number_literal(n.value)),
            Expr::StringLiteral(s) => self.builder.print_str(&python_string_literal(&s.value)),
            Expr::BoolLiteral(b) => self.builder.print_str(if b.value { "True" } else { "False" }),
            Expr::NullLiteral(_) => self.builder.print_str("None"),
            Expr::Identifier(ident) => {
                self.refuse_if_dunder(&ident.name, ident.span);
                let name = self.resolve_name(&ident.name);
                self.builder.print_str(&name);
            }
            Expr::Unary(e) => self.gen_unary(e),
            Expr::Binary(e) => self.gen_binary(e),
            Expr::Ternary(e) => self.gen_ternary(e),
            Expr::Assignment(e) => self.gen_assignment_expr(e),
            Expr::Member(e) => self.gen_member_read(e),
            Expr::Index(e) => self.gen_index(e),
            Expr::Call(e) => self.gen_call(e),
            Expr::Array(e) => self.gen_array(e),
            Expr::Object(e) => self.gen_object(e),
            Expr::Arrow(e) => self.gen_arrow(e),
        }
    }

    fn gen_unary(&mut self, e: &UnaryExpr) {
        self.builder.print_str(match e.operator {
            UnaryOperator::Not => "not ",
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
        });
        self.gen_expr(&e.argument);
    }

    fn gen_binary(&mut self, e: &BinaryExpr) {
        let op = match e.operator {
            BinaryOperator::LogicalAnd => "and",
            BinaryOperator::LogicalOr => "or",
            other => other.as_str(),
        };
        self.builder.print_str("(");
        self.gen_expr(&e.left);
        self.builder.print_str(" ");
        self.builder.print_str(op);
        self.builder.print_str(" ");
        self.gen_expr(&e.right);
        self.builder.print_str(")");
    }

    fn gen_ternary(&mut self, e: &TernaryExpr) {
        self.builder.print_str("(");
        self.gen_expr(&e.consequent);
        self.builder.print_str(" if ");
        self.gen_expr(&e.test);
        self.builder.print_str(" else ");
        self.gen_expr(&e.alternate);
        self.builder.print_str(")");
    }

    /// An assignment nested inside a larger expression. A plain
    /// identifier target can use the host's walrus operator; any other
    /// target has no expression-level equivalent in the host language
    /// (spec.md `4.5` doesn't define one), so this is recorded as a
    /// diagnostic rather than guessed at.
    fn gen_assignment_expr(&mut self, e: &AssignmentExpr) {
        match &e.target {
            Expr::Identifier(ident) => {
                self.refuse_if_dunder(&ident.name, ident.span);
                let name = self.resolve_name(&ident.name);
                self.builder.print_str("(");
                self.builder.print_str(&name);
                self.builder.print_str(" := ");
                self.gen_expr(&e.value);
                self.builder.print_str(")");
            }
            _ => {
                self.diagnostics.push(UnsupportedNestedAssignment(e.span));
                self.builder.print_str("None");
            }
        }
    }

    fn gen_member_read(&mut self, e: &MemberExpr) {
        self.refuse_if_dunder(&e.property, e.property_span);
        self.builder.print_str("safe_attr_access(");
        self.gen_expr(&e.object);
        self.builder.print_str(", ");
        self.builder.print_str(&python_string_literal(&e.property));
        self.builder.print_str(")");
    }

    fn gen_index(&mut self, e: &IndexExpr) {
        self.gen_expr(&e.object);
        self.builder.print_str("[");
        self.gen_expr(&e.index);
        self.builder.print_str("]");
    }

    fn gen_call(&mut self, e: &CallExpr) {
        if let Expr::Member(member) = &e.callee {
            self.refuse_if_dunder(&member.property, member.property_span);
            self.builder.print_str("safe_method_call(");
            self.gen_expr(&member.object);
            self.builder.print_str(", ");
            self.builder.print_str(&python_string_literal(&member.property));
            for arg in &e.arguments {
                self.builder.print_str(", ");
                self.gen_expr(arg);
            }
            self.builder.print_str(")");
        } else {
            self.builder.print_str("safe_call(");
            self.gen_expr(&e.callee);
            for arg in &e.arguments {
                self.builder.print_str(", ");
                self.gen_expr(arg);
            }
            self.builder.print_str(")");
        }
    }

    fn gen_array(&mut self, e: &ArrayExpr) {
        self.builder.print_str("[");
        for (i, element) in e.elements.iter().enumerate() {
            if i > 0 {
                self.builder.print_str(", ");
            }
            self.gen_expr(element);
        }
        self.builder.print_str("]");
    }

    fn gen_object(&mut self, e: &ObjectExpr) {
        self.builder.print_str("{");
        for (i, prop) in e.properties.iter().enumerate() {
            if i > 0 {
                self.builder.print_str(", ");
            }
            self.builder.print_str(&python_string_literal(&prop.key));
            self.builder.print_str(": ");
            self.gen_expr(&prop.value);
        }
        self.builder.print_str("}");
    }

    fn gen_arrow(&mut self, e: &ArrowFunctionExpr) {
        match &e.body {
            ArrowBody::Expr(body) => {
                self.builder.print_str("(lambda ");
                self.gen_params(&e.params);
                self.builder.print_str(": ");
                self.gen_expr(body);
                self.builder.print_str(")");
            }
            ArrowBody::Block(_) => {
                let name = self.hoisted_closures.get(&e.span).cloned().expect("block-bodied arrow must be hoisted before its enclosing statement is generated");
                self.builder.print_str(&name);
            }
        }
    }

    // -- closure hoisting ---------------------------------------------

    /// Finds every block-bodied arrow directly reachable from `stmt`
    /// (without crossing into a nested statement's own block, which
    /// gets its own hoisting pass when it is generated) and emits each
    /// as a preceding `def` at the current indent, so the lexical
    /// scope it closes over is exactly the one it appeared in
    /// (spec.md `4.5` point 7: capture by reference, not by value).
    fn hoist_block_arrows(&mut self, stmt: &Stmt) {
        let mut found = Vec::new();
        for root in expr_roots(stmt) {
            collect_block_arrows(root, &mut found);
        }
        for arrow in found {
            if self.hoisted_closures.contains_key(&arrow.span) {
                continue;
            }
            let name = format!("_closure_{}", self.closure_counter);
            self.closure_counter += 1;
            self.hoisted_closures.insert(arrow.span, name.clone());
            self.builder.print_indent();
            self.builder.print_str("def ");
            self.builder.print_str(&name);
            self.builder.print_str("(");
            self.gen_params(&arrow.params);
            self.builder.print_str("):");
            self.builder.newline();
            let ArrowBody::Block(block) = &arrow.body else { unreachable!("only block-bodied arrows are collected") };
            self.gen_suite(block);
        }
    }
}

fn expr_roots(stmt: &Stmt) -> Vec<&Expr> {
    match stmt {
        Stmt::Expr(s) => vec![&s.expr],
        Stmt::If(s) => vec![&s.test],
        Stmt::While(s) => vec![&s.test],
        Stmt::ForIn(s) => vec![&s.iterable],
        Stmt::Return(s) => s.argument.iter().collect(),
        Stmt::Throw(s) => vec![&s.argument],
        Stmt::FunctionDef(_) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Try(_) | Stmt::Import(_) | Stmt::Capability(_) | Stmt::Block(_) => vec![],
    }
}

fn collect_block_arrows<'a>(expr: &'a Expr, out: &mut Vec<&'a ArrowFunctionExpr>) {
    match expr {
        Expr::Arrow(arrow) => match &arrow.body {
            ArrowBody::Block(_) => out.push(arrow),
            ArrowBody::Expr(inner) => collect_block_arrows(inner, out),
        },
        Expr::Unary(e) => collect_block_arrows(&e.argument, out),
        Expr::Binary(e) => {
            collect_block_arrows(&e.left, out);
            collect_block_arrows(&e.right, out);
        }
        Expr::Ternary(e) => {
            collect_block_arrows(&e.test, out);
            collect_block_arrows(&e.consequent, out);
            collect_block_arrows(&e.alternate, out);
        }
        Expr::Assignment(e) => {
            collect_block_arrows(&e.target, out);
            collect_block_arrows(&e.value, out);
        }
        Expr::Member(e) => collect_block_arrows(&e.object, out),
        Expr::Index(e) => {
            collect_block_arrows(&e.object, out);
            collect_block_arrows(&e.index, out);
        }
        Expr::Call(e) => {
            collect_block_arrows(&e.callee, out);
            for arg in &e.arguments {
                collect_block_arrows(arg, out);
            }
        }
        Expr::Array(e) => {
            for el in &e.elements {
                collect_block_arrows(el, out);
            }
        }
        Expr::Object(e) => {
            for prop in &e.properties {
                collect_block_arrows(&prop.value, out);
            }
        }
        Expr::NumberLiteral(_) | Expr::StringLiteral(_) | Expr::BoolLiteral(_) | Expr::NullLiteral(_) | Expr::Identifier(_) => {}
    }
}

fn number_literal(value: NumberValue) -> String {
    match value {
        NumberValue::Int(i) => i.to_string(),
        NumberValue::Float(f) => {
            let text = format!("{f:?}");
            if text.contains('.') || text.contains('e') || text.contains("inf") || text.contains("nan") {
                text
            } else {
                format!("{text}.0")
            }
        }
    }
}

fn python_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use mlpy_parser::Parser;

    fn generate_source(source: &str) -> String {
        let ret = Parser::new(source).parse();
        assert!(ret.errors.is_empty(), "parse errors: {:?}", ret.errors.iter().map(ToString::to_string).collect::<Vec<_>>());
        let output = generate(&ret.program, FileId::new("main.ml"));
        assert!(output.diagnostics.is_empty(), "unexpected codegen diagnostics");
        output.source
    }

    #[test]
    fn call_is_wrapped_in_safe_call() {
        let source = generate_source("print(\"hi\");");
        assert!(source.contains(r#"safe_call(print, "hi")"#));
    }

    #[test]
    fn attribute_read_is_wrapped() {
        let source = generate_source("y = obj.label;");
        assert!(source.contains(r#"safe_attr_access(obj, "label")"#));
    }

    #[test]
    fn method_call_is_wrapped_distinctly_from_a_free_call() {
        let source = generate_source("obj.greet(\"hi\");");
        assert!(source.contains(r#"safe_method_call(obj, "greet", "hi")"#));
    }

    #[test]
    fn attribute_assignment_uses_safe_attr_set() {
        let source = generate_source("obj.label = \"x\";");
        assert!(source.contains(r#"safe_attr_set(obj, "label", "x")"#));
    }

    #[test]
    fn plain_identifier_assignment_is_not_wrapped() {
        let source = generate_source("x = 1;");
        assert!(source.contains("\nx = 1\n"));
    }

    #[test]
    fn capability_block_emits_balanced_push_and_pop() {
        let source = generate_source("capability net { print(\"ok\"); }");
        assert!(source.contains(r#"_cap_ctx.push(_resolve_capability_tokens("net"))"#));
        assert!(source.contains("_cap_ctx.pop()"));
    }

    #[test]
    fn expr_bodied_arrow_becomes_a_lambda() {
        let source = generate_source("double = fn(x) => x * 2;");
        assert!(source.contains("lambda x:"));
    }

    #[test]
    fn block_bodied_arrow_is_hoisted_to_a_def_before_its_statement() {
        let source = generate_source("make_adder = fn(x) => { return x + 1; };");
        let def_pos = source.find("def _closure_0(x):").expect("hoisted def not found");
        let use_pos = source.find("make_adder = _closure_0").expect("closure reference not found");
        assert!(def_pos < use_pos);
    }

    #[test]
    fn dunder_identifier_is_refused_at_emission() {
        let ret = Parser::new("x = __class__;").parse();
        let output = generate(&ret.program, FileId::new("main.ml"));
        assert!(!output.diagnostics.is_empty());
    }

    #[test]
    fn source_map_round_trips_a_statement_position() {
        let ret = Parser::new("x = 1;").parse();
        let output = generate(&ret.program, FileId::new("main.ml"));
        assert!(!output.source_map.mappings().is_empty());
    }
}
