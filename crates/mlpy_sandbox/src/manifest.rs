//! Cross-process capability/registry export (spec.md `4.9`: "it mounts
//! a minimal runtime, installs the capability context, and runs the
//! program"). The registry and granted tokens never leave this process
//! as Rust values — they are serialized into a small Python bootstrap
//! prepended to the emitted program, ahead of the generated runtime
//! prelude (`mlpy_codegen::runtime::PRELUDE`), which dispatches through
//! the `_REGISTRY`/`_CAP_CTX` names this module defines.
//!
//! Kept local to this crate rather than added to `mlpy_capability` or
//! `mlpy_registry`: those crates describe the contract both the Rust
//! analyzer and the generated Python prelude agree on, not how to get a
//! snapshot of it across a process boundary, which only the sandbox
//! ever needs to do.

use mlpy_capability::{Action, Token};
use mlpy_registry::Registry;
use serde_json::json;

/// One granted token, reduced to the fields the Python-side `_CAP_CTX`
/// proxy needs to replicate [`mlpy_capability::CapabilityContext::is_granted`].
#[derive(Debug, Clone)]
pub struct GrantedToken {
    pub capability: String,
    pub resource_pattern: String,
    pub actions: Vec<String>,
}

impl From<&Token> for GrantedToken {
    fn from(token: &Token) -> Self {
        Self {
            capability: token.capability.to_string(),
            resource_pattern: token.resource_pattern.clone(),
            actions: token.actions.iter_names().map(|(name, _)| name.to_ascii_lowercase()).collect(),
        }
    }
}

/// Builds the Python bootstrap text prepended ahead of
/// [`mlpy_codegen::runtime::PRELUDE`]: a glob matcher, a `_CapContext`
/// class seeded with one frame of `tokens`, a registry snapshot object,
/// and the `_CAPABILITY_MANIFEST` table the prelude's
/// `_resolve_capability_tokens` reads.
///
/// `registry` is read once per sandbox launch; there is no live
/// callback from the child back into this process (spec.md `6`: "it
/// does not call back into REPL/LSP/DAP", the same one-way contract
/// applies to the sandboxed child).
pub fn bootstrap_source(registry: &Registry, tokens: &[Token]) -> String {
    let granted: Vec<GrantedToken> = tokens.iter().map(GrantedToken::from).collect();
    let tokens_json = json!(granted
        .iter()
        .map(|t| json!({"capability": t.capability, "resource_pattern": t.resource_pattern, "actions": t.actions}))
        .collect::<Vec<_>>());

    let functions_json = json!(registry
        .function_names()
        .into_iter()
        .filter_map(|name| registry.is_allowed_call(name).map(|d| (name, d)))
        .map(|(name, descriptor)| {
            json!({
                "name": name,
                "capabilities_required": descriptor.capabilities_required.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>());

    let attrs_json = json!(registry
        .attr_keys()
        .into_iter()
        .filter_map(|(type_tag, attr_name)| registry.is_allowed_attr(type_tag, attr_name).map(|d| (type_tag, attr_name, d)))
        .map(|(type_tag, attr_name, descriptor)| {
            json!({
                "type_tag": type_tag,
                "attr_name": attr_name,
                "capabilities_required": descriptor.capabilities_required.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>());

    format!(
        r#"
import re as _mlpy_re


def _mlpy_glob_to_regex(pattern):
    parts = []
    for segment in pattern.split("/"):
        if segment == "**":
            parts.append(r"(?:[^/]+(?:/[^/]+)*)?")
        elif segment == "*":
            parts.append(r"[^/]+")
        else:
            parts.append(_mlpy_re.escape(segment))
    return _mlpy_re.compile("^" + "/".join(parts).replace("//", "/") + "$")


def _mlpy_glob_matches(pattern, resource):
    return _mlpy_glob_to_regex(pattern).match(resource) is not None


class _FuncDescriptor:
    def __init__(self, capabilities_required):
        self.capabilities_required = capabilities_required

    def resource_hint(self, name):
        return f"fn:{{name}}"


class _AttrDescriptor:
    def __init__(self, capabilities_required):
        self.capabilities_required = capabilities_required


class _Registry:
    def __init__(self, functions, attrs):
        self._functions = {{f["name"]: _FuncDescriptor(f["capabilities_required"]) for f in functions}}
        self._attrs = {{(a["type_tag"], a["attr_name"]): _AttrDescriptor(a["capabilities_required"]) for a in attrs}}

    def is_allowed_call(self, name):
        return self._functions.get(name)

    def is_allowed_attr(self, type_tag, attr_name):
        return self._attrs.get((type_tag, attr_name))


class _Token:
    def __init__(self, capability, resource_pattern, actions):
        self.capability = capability
        self.resource_pattern = resource_pattern
        self.actions = actions

    def grants(self, resource, action):
        return action in self.actions and _mlpy_glob_matches(self.resource_pattern, resource)


class _CapContext:
    def __init__(self, initial_tokens):
        self._frames = [list(initial_tokens)]

    def push(self, tokens):
        self._frames.append(list(tokens))

    def pop(self):
        if not self._frames:
            return False
        self._frames.pop()
        return True

    def is_granted(self, capability, resource, action):
        for frame in self._frames:
            for token in frame:
                if token.capability == capability and token.grants(resource, action):
                    return True
        return False


_CAPABILITY_MANIFEST_RAW = {tokens_json}
_CAPABILITY_MANIFEST = {{}}
for _entry in _CAPABILITY_MANIFEST_RAW:
    _CAPABILITY_MANIFEST.setdefault(_entry["capability"], []).append(_entry["resource_pattern"])

_REGISTRY = _Registry({functions_json}, {attrs_json})
_CAP_CTX = _CapContext([_Token(t["capability"], t["resource_pattern"], t["actions"]) for t in _CAPABILITY_MANIFEST_RAW])
"#,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use mlpy_registry::{AttrDescriptor, FuncDescriptor};

    #[test]
    fn bootstrap_embeds_granted_tokens_and_registry_entries() {
        let mut registry = Registry::new();
        registry.register_attr("widget", "label", AttrDescriptor::property(vec![])).unwrap();
        registry.register_function("fs_read", FuncDescriptor::bridge("fs", vec!["fs.read".into()])).unwrap();

        let token = Token::new("fs.read", "fs/tmp/**", Action::READ, "cli");
        let source = bootstrap_source(&registry, std::slice::from_ref(&token));

        assert!(source.contains("\"capability\":\"fs.read\""));
        assert!(source.contains("\"name\":\"fs_read\""));
        assert!(source.contains("\"type_tag\":\"widget\""));
        assert!(source.contains("class _CapContext"));
    }

    #[test]
    fn granted_token_lowercases_action_names() {
        let token = Token::new("fs.read", "fs/**", Action::READ | Action::WRITE, "cli");
        let granted = GrantedToken::from(&token);
        assert!(granted.actions.contains(&"read".to_string()));
        assert!(granted.actions.contains(&"write".to_string()));
    }
}
