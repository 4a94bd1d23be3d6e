//! Traversal infrastructure. `Visit` gives every pass (validator, shallow
//! and deep security analyzers, capability inference, code generator) a
//! single place to express "walk the whole tree, do something at these
//! node kinds" without hand-rolling recursion each time.
//!
//! There is deliberately no `VisitMut`: the AST is immutable after
//! validation (spec.md `3`), so passes that need to record findings
//! accumulate them in `self` rather than writing back into the tree.

use crate::ast::*;

/// Depth-first AST visitor. Every `visit_*` method has a default
/// implementation that walks into children via the matching `walk_*`
/// free function; override only the node kinds a given pass cares about.
pub trait Visit {
    fn visit_program(&mut self, program: &Program) {
        walk_program(self, program);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_block(&mut self, block: &BlockStmt) {
        walk_block(self, block);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_identifier(&mut self, _ident: &IdentifierRef) {}

    fn visit_function_def(&mut self, func: &FunctionDef) {
        walk_function_def(self, func);
    }

    fn visit_arrow(&mut self, arrow: &ArrowFunctionExpr) {
        walk_arrow(self, arrow);
    }

    fn visit_call(&mut self, call: &CallExpr) {
        walk_call(self, call);
    }

    fn visit_member(&mut self, member: &MemberExpr) {
        walk_member(self, member);
    }

    fn visit_assignment(&mut self, assignment: &AssignmentExpr) {
        walk_assignment(self, assignment);
    }

    fn visit_import(&mut self, _import: &ImportStmt) {}

    fn visit_capability(&mut self, capability: &CapabilityStmt) {
        walk_capability(self, capability);
    }
}

pub fn walk_program<V: Visit + ?Sized>(visitor: &mut V, program: &Program) {
    for stmt in &program.body {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_block<V: Visit + ?Sized>(visitor: &mut V, block: &BlockStmt) {
    for stmt in &block.body {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visit + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Expr(s) => visitor.visit_expr(&s.expr),
        Stmt::FunctionDef(s) => visitor.visit_function_def(s),
        Stmt::If(s) => {
            visitor.visit_expr(&s.test);
            visitor.visit_block(&s.consequent);
            if let Some(alt) = &s.alternate {
                visitor.visit_stmt(alt);
            }
        }
        Stmt::While(s) => {
            visitor.visit_expr(&s.test);
            visitor.visit_block(&s.body);
        }
        Stmt::ForIn(s) => {
            visitor.visit_expr(&s.iterable);
            visitor.visit_block(&s.body);
        }
        Stmt::Break(_) | Stmt::Continue(_) => {}
        Stmt::Return(s) => {
            if let Some(arg) = &s.argument {
                visitor.visit_expr(arg);
            }
        }
        Stmt::Try(s) => {
            visitor.visit_block(&s.block);
            if let Some(handler) = &s.handler {
                visitor.visit_block(&handler.body);
            }
            if let Some(finalizer) = &s.finalizer {
                visitor.visit_block(finalizer);
            }
        }
        Stmt::Throw(s) => visitor.visit_expr(&s.argument),
        Stmt::Import(s) => visitor.visit_import(s),
        Stmt::Capability(s) => visitor.visit_capability(s),
        Stmt::Block(s) => visitor.visit_block(s),
    }
}

pub fn walk_function_def<V: Visit + ?Sized>(visitor: &mut V, func: &FunctionDef) {
    visitor.visit_block(&func.body);
}

pub fn walk_capability<V: Visit + ?Sized>(visitor: &mut V, capability: &CapabilityStmt) {
    visitor.visit_block(&capability.body);
}

pub fn walk_arrow<V: Visit + ?Sized>(visitor: &mut V, arrow: &ArrowFunctionExpr) {
    match &arrow.body {
        ArrowBody::Expr(expr) => visitor.visit_expr(expr),
        ArrowBody::Block(block) => visitor.visit_block(block),
    }
}

pub fn walk_call<V: Visit + ?Sized>(visitor: &mut V, call: &CallExpr) {
    visitor.visit_expr(&call.callee);
    for arg in &call.arguments {
        visitor.visit_expr(arg);
    }
}

pub fn walk_member<V: Visit + ?Sized>(visitor: &mut V, member: &MemberExpr) {
    visitor.visit_expr(&member.object);
}

pub fn walk_assignment<V: Visit + ?Sized>(visitor: &mut V, assignment: &AssignmentExpr) {
    visitor.visit_expr(&assignment.target);
    visitor.visit_expr(&assignment.value);
}

pub fn walk_expr<V: Visit + ?Sized>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::NumberLiteral(_) | Expr::StringLiteral(_) | Expr::BoolLiteral(_) | Expr::NullLiteral(_) => {}
        Expr::Identifier(ident) => visitor.visit_identifier(ident),
        Expr::Unary(e) => visitor.visit_expr(&e.argument),
        Expr::Binary(e) => {
            visitor.visit_expr(&e.left);
            visitor.visit_expr(&e.right);
        }
        Expr::Ternary(e) => {
            visitor.visit_expr(&e.test);
            visitor.visit_expr(&e.consequent);
            visitor.visit_expr(&e.alternate);
        }
        Expr::Assignment(e) => visitor.visit_assignment(e),
        Expr::Member(e) => visitor.visit_member(e),
        Expr::Index(e) => {
            visitor.visit_expr(&e.object);
            visitor.visit_expr(&e.index);
        }
        Expr::Call(e) => visitor.visit_call(e),
        Expr::Array(e) => {
            for element in &e.elements {
                visitor.visit_expr(element);
            }
        }
        Expr::Object(e) => {
            for prop in &e.properties {
                visitor.visit_expr(&prop.value);
            }
        }
        Expr::Arrow(e) => visitor.visit_arrow(e),
    }
}
