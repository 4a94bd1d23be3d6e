//! Capability-requirement inference (spec.md `4.4`'s cache contract:
//! a `Compiled Artifact`'s `required_capabilities` is "the union ...
//! computed ... during analysis"). Walks the validated AST and
//! collects, for every statically-visible call target and import
//! statement, the capabilities the registry says that name requires.
//!
//! Scoped deliberately to free-function calls and imports: a member or
//! method call's required capability depends on the *runtime type* of
//! its receiver (`obj.read()` needs a different capability depending
//! on whether `obj` is a `file` handle or a `widget`), which this pass
//! has no way to know from the AST alone. Those are enforced only at
//! runtime, by the generated `safe_attr_access`/`safe_method_call`
//! wrappers (`mlpy_codegen::runtime`) — this pass exists purely to let
//! a caller (the CLI's `run`/`audit` commands) present a best-effort
//! summary of what a program is *likely* to need before execution, not
//! to replace the runtime check.
//!
//! Grounded on `mlpy_semantic::security_deep::DeepSecurityAnalyzer`'s
//! use of `Visit` to walk calls and imports for its own pattern table.

use mlpy_ast::ast::{CallExpr, Expr, ImportStmt, Program};
use mlpy_ast::Visit;
use mlpy_registry::{CapabilityName, Registry};

struct CapabilityWalker<'a> {
    registry: &'a Registry,
    found: Vec<CapabilityName>,
}

impl Visit for CapabilityWalker<'_> {
    fn visit_call(&mut self, call: &CallExpr) {
        if let Expr::Identifier(ident) = &call.callee {
            if let Some(descriptor) = self.registry.is_allowed_call(&ident.name) {
                self.found.extend(descriptor.capabilities_required.iter().cloned());
            }
        }
        mlpy_ast::visit::walk_call(self, call);
    }

    fn visit_import(&mut self, import: &ImportStmt) {
        let key = format!("import:{}", import.dotted_name());
        if let Some(descriptor) = self.registry.is_allowed_call(&key) {
            self.found.extend(descriptor.capabilities_required.iter().cloned());
        }
    }
}

/// Collects every capability a statically-visible call or import in
/// `program` requires, deduplicated but otherwise in discovery order.
pub fn required_capabilities(program: &Program, registry: &Registry) -> Vec<CapabilityName> {
    let mut walker = CapabilityWalker { registry, found: Vec::new() };
    walker.visit_program(program);

    let mut seen = std::collections::HashSet::new();
    walker.found.retain(|name| seen.insert(name.clone()));
    walker.found
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bridges::default_registry;
    use mlpy_parser::Parser;

    fn parse(source: &str) -> Program {
        let ret = Parser::new(source).parse();
        assert!(ret.errors.is_empty(), "parse errors: {:?}", ret.errors.iter().map(ToString::to_string).collect::<Vec<_>>());
        ret.program
    }

    #[test]
    fn call_to_a_capability_gated_bridge_function_is_collected() {
        let registry = default_registry();
        let program = parse("file_read(\"data.txt\");");
        let caps = required_capabilities(&program, &registry);
        assert!(caps.iter().any(|c| c.as_str() == "fs.read"));
    }

    #[test]
    fn builtin_calls_require_no_capability() {
        let registry = default_registry();
        let program = parse("print(\"hello\");");
        let caps = required_capabilities(&program, &registry);
        assert!(caps.is_empty());
    }

    #[test]
    fn import_of_a_gated_module_is_collected() {
        let registry = default_registry();
        let program = parse("import http;");
        let caps = required_capabilities(&program, &registry);
        assert!(caps.iter().any(|c| c.as_str() == "net.connect"));
    }

    #[test]
    fn capabilities_are_deduplicated_across_multiple_call_sites() {
        let registry = default_registry();
        let program = parse("file_read(\"a.txt\"); file_read(\"b.txt\");");
        let caps = required_capabilities(&program, &registry);
        assert_eq!(caps.iter().filter(|c| c.as_str() == "fs.read").count(), 1);
    }
}
