//! The fixed builtin whitelist and forbidden-name list (spec.md `3`).
//! Kept as plain data, not derived from anything external: these two
//! lists are exactly what the specification enumerates.

pub const SAFE_BUILTINS: &[&str] =
    &["typeof", "len", "print", "int", "float", "str", "bool", "abs", "min", "max", "sum", "round", "keys", "values", "range", "sorted", "input", "help", "getattr", "setattr", "hasattr"];

pub const FORBIDDEN_NAMES: &[&str] = &["eval", "exec", "compile", "globals", "locals", "vars", "dir", "open", "exit", "quit"];
