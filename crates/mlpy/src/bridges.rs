//! Default bridge-module registration (spec.md `1`: "the implementation
//! of individual standard-library modules [...] are treated as
//! externally-registered bridge modules whose *contracts* (capability
//! requirements, name whitelisting) the core enforces, not whose
//! bodies it defines").
//!
//! This module owns exactly that contract surface for the thirteen
//! named modules — which capability each one's functions require, and
//! under what name they're whitelisted — not their Python-side
//! implementations. A real deployment would supply its own bridge
//! bodies (e.g. an actual `file_read` backed by a real file handle)
//! and call `register_module` the same way this file does; `mlpy run`
//! uses this default registry when no other is configured.
//!
//! Grounded on `mlpy_registry`'s own test fixtures for the
//! `register_module`/`seal` call shape.

use mlpy_registry::{AttrDescriptor, CapabilityName, FuncDescriptor, Registry};

fn cap(name: &str) -> CapabilityName {
    CapabilityName::new(name)
}

/// Registers `safe_import("<module>")`'s whitelist entry: the key
/// `safe_import` (`mlpy_codegen::runtime::PRELUDE`) looks up is
/// `import:<dotted_name>`, not the bare module name.
fn register_importable(registry: &mut Registry, module: &str, capabilities_required: Vec<CapabilityName>) {
    registry.register_function(&format!("import:{module}"), FuncDescriptor { module: Some(module.to_string()), capabilities_required, is_safe_builtin: false }).expect("bridge module registration must not collide");
}

/// Builds the registry `mlpy run`/`mlpy audit` use when the caller
/// supplies no other one: the thirteen bridge modules spec.md `1`
/// names, each contributing one or two representative whitelisted
/// functions under the capability its operations actually need, then
/// sealed.
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();

    // console: no capability, purely local I/O through `print`/`input`
    // which are already builtins; nothing further to register.
    register_importable(&mut registry, "console", vec![]);

    // math, regex: pure functions, no host resource touched.
    register_importable(&mut registry, "math", vec![]);
    registry.register_module("math", &[], &[("math_sqrt", FuncDescriptor::bridge("math", vec![])), ("math_pow", FuncDescriptor::bridge("math", vec![]))]).unwrap();

    register_importable(&mut registry, "regex", vec![]);
    registry.register_module("regex", &[], &[("regex_match", FuncDescriptor::bridge("regex", vec![]))]).unwrap();

    // json: pure (de)serialization of in-memory values.
    register_importable(&mut registry, "json", vec![]);
    registry.register_module("json", &[], &[("json_parse", FuncDescriptor::bridge("json", vec![])), ("json_stringify", FuncDescriptor::bridge("json", vec![]))]).unwrap();

    // datetime: reads the host clock, which this registry treats as a
    // read of ambient system state rather than a capability-gated
    // resource (spec.md `4.7` only names fs/net-shaped resources).
    register_importable(&mut registry, "datetime", vec![]);
    registry.register_module("datetime", &[], &[("datetime_now", FuncDescriptor::bridge("datetime", vec![]))]).unwrap();

    // file: filesystem reads and writes, gated by `fs.read`/`fs.write`.
    register_importable(&mut registry, "file", vec![cap("fs.read")]);
    registry
        .register_module(
            "file",
            &[],
            &[("file_read", FuncDescriptor::bridge("file", vec![cap("fs.read")])), ("file_write", FuncDescriptor::bridge("file", vec![cap("fs.write")]))],
        )
        .unwrap();
    registry.register_attr("file", "read", AttrDescriptor::method(vec![cap("fs.read")], Some(0))).unwrap();
    registry.register_attr("file", "write", AttrDescriptor::method(vec![cap("fs.write")], Some(1))).unwrap();
    registry.register_attr("file", "close", AttrDescriptor::method(vec![], Some(0))).unwrap();

    // path: pure string manipulation of path values, no filesystem
    // access of its own (the `file` bridge is what touches the disk).
    register_importable(&mut registry, "path", vec![]);
    registry.register_module("path", &[], &[("path_join", FuncDescriptor::bridge("path", vec![])), ("path_basename", FuncDescriptor::bridge("path", vec![]))]).unwrap();

    // http: network access, gated by `net.connect`.
    register_importable(&mut registry, "http", vec![cap("net.connect")]);
    registry.register_module("http", &[], &[("http_get", FuncDescriptor::bridge("http", vec![cap("net.connect")])), ("http_post", FuncDescriptor::bridge("http", vec![cap("net.connect")]))]).unwrap();

    // crypto: pure hashing/signing over in-memory bytes.
    register_importable(&mut registry, "crypto", vec![]);
    registry.register_module("crypto", &[], &[("crypto_hash", FuncDescriptor::bridge("crypto", vec![]))]).unwrap();

    // log: writes to the host's logging sink, gated like a filesystem
    // write since that's the resource a log bridge ultimately touches.
    register_importable(&mut registry, "log", vec![cap("fs.write")]);
    registry.register_module("log", &[], &[("log_info", FuncDescriptor::bridge("log", vec![cap("fs.write")])), ("log_error", FuncDescriptor::bridge("log", vec![cap("fs.write")]))]).unwrap();

    // env: reads process environment variables, a read of ambient
    // process state distinct from a filesystem read.
    register_importable(&mut registry, "env", vec![cap("env.read")]);
    registry.register_module("env", &[], &[("env_get", FuncDescriptor::bridge("env", vec![cap("env.read")]))]).unwrap();

    // args: read-only access to the program's own argv, no capability
    // needed since it never touches a resource outside the process.
    register_importable(&mut registry, "args", vec![]);
    registry.register_module("args", &[], &[("args_get", FuncDescriptor::bridge("args", vec![]))]).unwrap();

    // csv: parsing of in-memory text; reading the underlying file
    // still goes through the `file` bridge's own capability check.
    register_importable(&mut registry, "csv", vec![]);
    registry.register_module("csv", &[], &[("csv_parse", FuncDescriptor::bridge("csv", vec![]))]).unwrap();

    registry.seal();
    registry
}

#[cfg(test)]
mod test {
    use super::*;

    const BRIDGE_MODULES: &[&str] = &["console", "math", "regex", "json", "datetime", "file", "path", "http", "crypto", "log", "env", "args", "csv"];

    #[test]
    fn every_named_bridge_module_is_importable() {
        let registry = default_registry();
        for module in BRIDGE_MODULES {
            assert!(registry.is_allowed_call(&format!("import:{module}")).is_some(), "{module} should be importable");
        }
    }

    #[test]
    fn file_read_requires_the_filesystem_read_capability() {
        let registry = default_registry();
        let descriptor = registry.is_allowed_call("file_read").unwrap();
        assert_eq!(descriptor.capabilities_required, vec![cap("fs.read")]);
    }

    #[test]
    fn http_get_requires_the_network_capability() {
        let registry = default_registry();
        let descriptor = registry.is_allowed_call("http_get").unwrap();
        assert_eq!(descriptor.capabilities_required, vec![cap("net.connect")]);
    }

    #[test]
    fn pure_modules_require_no_capability() {
        let registry = default_registry();
        for name in ["math_sqrt", "json_parse", "crypto_hash", "path_join"] {
            let descriptor = registry.is_allowed_call(name).unwrap();
            assert!(descriptor.capabilities_required.is_empty(), "{name} should be capability-free");
        }
    }

    #[test]
    fn registry_is_sealed_after_construction() {
        let registry = default_registry();
        assert!(registry.is_sealed());
    }

    #[test]
    fn builtins_remain_reachable_alongside_bridge_functions() {
        let registry = default_registry();
        assert!(registry.is_allowed_call("print").is_some());
        assert!(registry.is_allowed_call("file_read").is_some());
    }
}
