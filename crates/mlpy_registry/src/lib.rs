//! Safe-Attribute Registry and Function Whitelist (spec.md `4.6`).
//!
//! A single process-wide [`Registry`] replaces the historical pattern of
//! two coexisting registries kept in sync by a test fixture that
//! clobbered the standard-library bridge between tests: here, there is
//! one base table plus a stack of overlays that tests push and pop
//! (spec.md `4.6`, "Isolation from tests").
//!
//! Grounded on `oxc_linter`'s rule registry: a fixed set of entries
//! built once, looked up by name for the lifetime of the process, with
//! no lock taken on the read path.

mod builtins;

pub use builtins::{FORBIDDEN_NAMES, SAFE_BUILTINS};

use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

/// A capability name, e.g. `"fs.read"` or `"net.connect"`. Cheaply
/// clonable: descriptors and tokens alike hold many copies of the same
/// handful of names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityName(Arc<str>);

impl CapabilityName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CapabilityName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Method,
    Property,
}

/// Describes one `(type_tag, attribute_name)` pair the generated code is
/// allowed to access via `safe_attr_access`/`safe_method_call`
/// (spec.md `3`, `4.5`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrDescriptor {
    pub kind: AttrKind,
    pub capabilities_required: Vec<CapabilityName>,
    pub arity_hint: Option<usize>,
}

impl AttrDescriptor {
    pub fn method(capabilities_required: Vec<CapabilityName>, arity_hint: Option<usize>) -> Self {
        Self { kind: AttrKind::Method, capabilities_required, arity_hint }
    }

    pub fn property(capabilities_required: Vec<CapabilityName>) -> Self {
        Self { kind: AttrKind::Property, capabilities_required, arity_hint: None }
    }
}

/// Describes one whitelisted free function (spec.md `3`, `4.6`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDescriptor {
    pub module: Option<String>,
    pub capabilities_required: Vec<CapabilityName>,
    pub is_safe_builtin: bool,
}

impl FuncDescriptor {
    pub fn builtin() -> Self {
        Self { module: None, capabilities_required: Vec::new(), is_safe_builtin: true }
    }

    pub fn bridge(module: impl Into<String>, capabilities_required: Vec<CapabilityName>) -> Self {
        Self { module: Some(module.into()), capabilities_required, is_safe_builtin: false }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Registration was attempted after `seal()` was called on the
    /// layer being written to (spec.md `4.6`: "after sealing, the
    /// tables are read-only").
    #[error("registry is sealed; `{0}` cannot be registered")]
    Sealed(String),
    /// Re-registration of the same key, which would otherwise silently
    /// shadow an earlier bridge (spec.md `4.6`).
    #[error("`{0}` is already registered")]
    DuplicateRegistration(String),
    /// `eval`, `exec`, `compile`, `globals`, `locals`, `vars`, `dir`,
    /// `open`, `exit`, `quit` can never be whitelisted by any bridge
    /// (spec.md `3`).
    #[error("`{0}` can never be whitelisted")]
    ForbiddenName(String),
    /// `pop_overlay` called with no overlay pushed.
    #[error("no registry overlay is currently active")]
    NoActiveOverlay,
}

type Result<T> = std::result::Result<T, RegistryError>;

/// One writable layer of the registry: either the sealed base layer
/// (after `seal()`) or a test overlay.
#[derive(Debug, Default, Clone)]
struct Layer {
    functions: FxHashMap<String, FuncDescriptor>,
    attrs: FxHashMap<(String, String), AttrDescriptor>,
    sealed: bool,
}

/// The process-wide Safe-Attribute Registry and Function Whitelist.
///
/// Lookups walk the overlay stack from the top down before falling back
/// to the base layer, so a test's stub bridge shadows (without
/// mutating) whatever the base has registered for the same name.
#[derive(Debug)]
pub struct Registry {
    base: Layer,
    overlays: Vec<Layer>,
}

impl Registry {
    /// Builds a registry pre-populated with the fixed builtin function
    /// whitelist (spec.md `3`). The base layer starts unsealed so
    /// `register_module` can add bridge modules during initialization.
    pub fn new() -> Self {
        let mut base = Layer::default();
        for name in builtins::SAFE_BUILTINS {
            base.functions.insert((*name).to_string(), FuncDescriptor::builtin());
        }
        Self { base, overlays: Vec::new() }
    }

    fn top_layer_mut(&mut self) -> &mut Layer {
        self.overlays.last_mut().unwrap_or(&mut self.base)
    }

    fn top_layer(&self) -> &Layer {
        self.overlays.last().unwrap_or(&self.base)
    }

    /// Registers a bridge module's functions in the active layer.
    /// `capabilities_required` applies to every function in `funcs`
    /// that doesn't specify its own (spec.md `4.6`).
    pub fn register_module(&mut self, module: &str, capabilities_required: &[CapabilityName], funcs: &[(&str, FuncDescriptor)]) -> Result<()> {
        for (name, descriptor) in funcs {
            let mut descriptor = descriptor.clone();
            if descriptor.module.is_none() {
                descriptor.module = Some(module.to_string());
            }
            if descriptor.capabilities_required.is_empty() {
                descriptor.capabilities_required = capabilities_required.to_vec();
            }
            self.register_function(name, descriptor)?;
        }
        Ok(())
    }

    pub fn register_function(&mut self, name: &str, descriptor: FuncDescriptor) -> Result<()> {
        if builtins::FORBIDDEN_NAMES.contains(&name) {
            return Err(RegistryError::ForbiddenName(name.to_string()));
        }
        let layer = self.top_layer_mut();
        if layer.sealed {
            return Err(RegistryError::Sealed(name.to_string()));
        }
        if layer.functions.contains_key(name) {
            return Err(RegistryError::DuplicateRegistration(name.to_string()));
        }
        layer.functions.insert(name.to_string(), descriptor);
        Ok(())
    }

    pub fn register_attr(&mut self, type_tag: &str, attr_name: &str, descriptor: AttrDescriptor) -> Result<()> {
        if attr_name.starts_with('_') {
            // Runtime already rejects this unconditionally (spec.md
            // `4.5`, point 2); refusing the registration too keeps the
            // tables from advertising dead entries.
            return Err(RegistryError::ForbiddenName(attr_name.to_string()));
        }
        let key = (type_tag.to_string(), attr_name.to_string());
        let layer = self.top_layer_mut();
        if layer.sealed {
            return Err(RegistryError::Sealed(format!("{type_tag}.{attr_name}")));
        }
        if layer.attrs.contains_key(&key) {
            return Err(RegistryError::DuplicateRegistration(format!("{type_tag}.{attr_name}")));
        }
        layer.attrs.insert(key, descriptor);
        Ok(())
    }

    /// Ends the initialization phase for the active layer. Further
    /// `register_*` calls against it fail until a new overlay is pushed.
    pub fn seal(&mut self) {
        self.top_layer_mut().sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.top_layer().sealed
    }

    /// Every function name currently visible through any layer (spec.md
    /// `4.6`). Used by consumers that must export the whole table, not
    /// just look up one name — e.g. `mlpy_sandbox`'s runtime bootstrap,
    /// which has to hand the child process a full registry snapshot
    /// since it has no way to call back into this process mid-execution.
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: std::collections::BTreeSet<&str> = self.base.functions.keys().map(String::as_str).collect();
        for overlay in &self.overlays {
            names.extend(overlay.functions.keys().map(String::as_str));
        }
        names.into_iter().collect()
    }

    /// Every `(type_tag, attr_name)` pair currently visible through any
    /// layer, for the same export use case as [`Self::function_names`].
    pub fn attr_keys(&self) -> Vec<(&str, &str)> {
        let mut keys: std::collections::BTreeSet<(&str, &str)> = self.base.attrs.keys().map(|(t, a)| (t.as_str(), a.as_str())).collect();
        for overlay in &self.overlays {
            keys.extend(overlay.attrs.keys().map(|(t, a)| (t.as_str(), a.as_str())));
        }
        keys.into_iter().collect()
    }

    pub fn is_allowed_call(&self, name: &str) -> Option<&FuncDescriptor> {
        self.overlays.iter().rev().find_map(|layer| layer.functions.get(name)).or_else(|| self.base.functions.get(name))
    }

    pub fn is_allowed_attr(&self, type_tag: &str, attr_name: &str) -> Option<&AttrDescriptor> {
        let key = (type_tag.to_string(), attr_name.to_string());
        self.overlays.iter().rev().find_map(|layer| layer.attrs.get(&key)).or_else(|| self.base.attrs.get(&key))
    }

    /// Pushes a fresh, unsealed overlay. Registrations made after this
    /// call land in the overlay and are visible to lookups, shadowing
    /// (without mutating) anything the base or a lower overlay holds
    /// for the same key.
    pub fn push_overlay(&mut self) {
        self.overlays.push(Layer::default());
    }

    /// Pops the topmost overlay, discarding everything registered in
    /// it. Returns [`RegistryError::NoActiveOverlay`] if no overlay is
    /// active, since that almost always indicates a test forgot to
    /// balance a `push_overlay` call.
    pub fn pop_overlay(&mut self) -> Result<()> {
        if self.overlays.pop().is_none() {
            return Err(RegistryError::NoActiveOverlay);
        }
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builtins_are_whitelisted_from_construction() {
        let registry = Registry::new();
        assert!(registry.is_allowed_call("print").is_some());
        assert!(registry.is_allowed_call("len").is_some());
    }

    #[test]
    fn forbidden_names_can_never_be_registered() {
        let mut registry = Registry::new();
        let err = registry.register_function("eval", FuncDescriptor::builtin()).unwrap_err();
        assert_eq!(err, RegistryError::ForbiddenName("eval".to_string()));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = Registry::new();
        let err = registry.register_function("print", FuncDescriptor::builtin()).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateRegistration("print".to_string()));
    }

    #[test]
    fn registration_after_seal_is_rejected() {
        let mut registry = Registry::new();
        registry.seal();
        let err = registry.register_function("fs_read", FuncDescriptor::bridge("fs", vec![])).unwrap_err();
        assert_eq!(err, RegistryError::Sealed("fs_read".to_string()));
    }

    #[test]
    fn module_registration_applies_default_capabilities() {
        let mut registry = Registry::new();
        let cap = CapabilityName::new("fs.read");
        registry.register_module("fs", &[cap.clone()], &[("fs_read", FuncDescriptor { module: None, capabilities_required: vec![], is_safe_builtin: false })]).unwrap();
        let descriptor = registry.is_allowed_call("fs_read").unwrap();
        assert_eq!(descriptor.capabilities_required, vec![cap]);
        assert_eq!(descriptor.module.as_deref(), Some("fs"));
    }

    #[test]
    fn underscore_attribute_names_are_never_registered() {
        let mut registry = Registry::new();
        let err = registry.register_attr("str", "_internal", AttrDescriptor::property(vec![])).unwrap_err();
        assert_eq!(err, RegistryError::ForbiddenName("_internal".to_string()));
    }

    #[test]
    fn overlay_shadows_base_without_mutating_it() {
        let mut registry = Registry::new();
        registry.register_attr("widget", "label", AttrDescriptor::property(vec![])).unwrap();
        registry.seal();

        registry.push_overlay();
        let stub = AttrDescriptor::property(vec![CapabilityName::new("test.only")]);
        registry.register_attr("widget", "label", stub.clone()).unwrap();
        assert_eq!(registry.is_allowed_attr("widget", "label"), Some(&stub));

        registry.pop_overlay().unwrap();
        let original = registry.is_allowed_attr("widget", "label").unwrap();
        assert!(original.capabilities_required.is_empty());
    }

    #[test]
    fn popping_with_no_active_overlay_errors() {
        let mut registry = Registry::new();
        assert_eq!(registry.pop_overlay().unwrap_err(), RegistryError::NoActiveOverlay);
    }

    #[test]
    fn function_names_include_builtins_and_bridges() {
        let mut registry = Registry::new();
        registry.register_function("fs_read", FuncDescriptor::bridge("fs", vec![])).unwrap();
        let names = registry.function_names();
        assert!(names.contains(&"print"));
        assert!(names.contains(&"fs_read"));
    }

    #[test]
    fn attr_keys_reflect_registrations_across_overlays() {
        let mut registry = Registry::new();
        registry.register_attr("widget", "label", AttrDescriptor::property(vec![])).unwrap();
        registry.seal();
        registry.push_overlay();
        registry.register_attr("widget", "title", AttrDescriptor::property(vec![])).unwrap();
        let keys = registry.attr_keys();
        assert!(keys.contains(&("widget", "label")));
        assert!(keys.contains(&("widget", "title")));
    }

    #[test]
    fn sealing_an_overlay_does_not_seal_the_base() {
        let mut registry = Registry::new();
        registry.push_overlay();
        registry.seal();
        assert!(registry.is_sealed());
        registry.pop_overlay().unwrap();
        assert!(!registry.is_sealed());
    }
}
