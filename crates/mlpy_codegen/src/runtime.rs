//! The runtime prelude (spec.md `4.5`): a fixed block of host-language
//! text, prepended to every emitted program, implementing the
//! `safe_call`/`safe_attr_access`/`safe_method_call`/`safe_attr_set`
//! wrappers the generator's emitted calls dispatch through.
//!
//! This is Python source text embedded as a Rust string constant, not
//! Rust code: `mlpy_codegen` never executes it, it only writes it out
//! ahead of the generated program (`mlpy_sandbox` is what runs the
//! result). `{}`-free so it can be emitted verbatim with `print_str`
//! rather than `format!`.

/// Emitted once per artifact, before any generated statement.
pub const PRELUDE: &str = r#"
class MlpyCapabilityError(Exception):
    pass


class MlpyAttributeError(Exception):
    pass


def _reject_dunder(name):
    if name.startswith("__"):
        raise MlpyAttributeError(f"dangerous identifier: {name}")


def typeof(value):
    if value is None:
        return "null"
    if isinstance(value, bool):
        return "boolean"
    if isinstance(value, (int, float)):
        return "number"
    if isinstance(value, str):
        return "string"
    if isinstance(value, list):
        return "array"
    if isinstance(value, dict):
        return "object"
    if callable(value):
        return "function"
    return "object"


def keys(obj):
    return list(obj.keys())


def values(obj):
    return list(obj.values())


def _mlpy_wrap_builtin(name, fn):
    # Plain Python builtins (`print`, `len`, ...) cannot carry an
    # `__mlpy_name__` attribute directly - builtin function objects
    # reject attribute assignment. Wrapping each whitelisted builtin
    # once, here, is what lets `safe_call` recover the ML-source name
    # of a bare identifier callee without changing the emitted call
    # site syntax (spec.md `4.5` point 1: `safe_call(f, a, b)`, not
    # `safe_call("f", f, a, b)`).
    def _wrapped(*args, **kwargs):
        return fn(*args, **kwargs)

    _wrapped.__mlpy_name__ = name
    _wrapped.__name__ = name
    return _wrapped


typeof.__mlpy_name__ = "typeof"
keys.__mlpy_name__ = "keys"
values.__mlpy_name__ = "values"

print = _mlpy_wrap_builtin("print", print)
len = _mlpy_wrap_builtin("len", len)
int = _mlpy_wrap_builtin("int", int)
float = _mlpy_wrap_builtin("float", float)
str = _mlpy_wrap_builtin("str", str)
bool = _mlpy_wrap_builtin("bool", bool)
abs = _mlpy_wrap_builtin("abs", abs)
min = _mlpy_wrap_builtin("min", min)
max = _mlpy_wrap_builtin("max", max)
sum = _mlpy_wrap_builtin("sum", sum)
round = _mlpy_wrap_builtin("round", round)
range = _mlpy_wrap_builtin("range", range)
sorted = _mlpy_wrap_builtin("sorted", sorted)
input = _mlpy_wrap_builtin("input", input)
getattr = _mlpy_wrap_builtin("getattr", getattr)
setattr = _mlpy_wrap_builtin("setattr", setattr)
hasattr = _mlpy_wrap_builtin("hasattr", hasattr)
help = _mlpy_wrap_builtin("help", help)


def safe_call(func, *args):
    name = getattr(func, "__mlpy_name__", None)
    if name is not None:
        descriptor = _REGISTRY.is_allowed_call(name)
        if descriptor is None:
            raise MlpyCapabilityError(f"call to '{name}' is not whitelisted")
        for capability in descriptor.capabilities_required:
            if not _CAP_CTX.is_granted(capability, descriptor.resource_hint(name), "execute"):
                raise MlpyCapabilityError(f"missing capability '{capability}' for '{name}'")
    return func(*args)


def safe_attr_access(obj, attr):
    _reject_dunder(attr)
    if attr.startswith("_"):
        raise MlpyAttributeError(f"access to '{attr}' is forbidden")
    descriptor = _REGISTRY.is_allowed_attr(type(obj).__name__, attr)
    if descriptor is None:
        raise MlpyAttributeError(f"'{attr}' is not in the safe-attribute registry")
    for capability in descriptor.capabilities_required:
        if not _CAP_CTX.is_granted(capability, f"{type(obj).__name__}.{attr}", "read"):
            raise MlpyCapabilityError(f"missing capability '{capability}' for '{attr}'")
    return getattr(obj, attr)


def safe_attr_set(obj, attr, value):
    _reject_dunder(attr)
    if attr.startswith("_"):
        raise MlpyAttributeError(f"access to '{attr}' is forbidden")
    descriptor = _REGISTRY.is_allowed_attr(type(obj).__name__, attr)
    if descriptor is None:
        raise MlpyAttributeError(f"'{attr}' is not in the safe-attribute registry")
    for capability in descriptor.capabilities_required:
        if not _CAP_CTX.is_granted(capability, f"{type(obj).__name__}.{attr}", "write"):
            raise MlpyCapabilityError(f"missing capability '{capability}' for '{attr}'")
    setattr(obj, attr, value)
    return value


def safe_method_call(obj, method, *args):
    _reject_dunder(method)
    if method.startswith("_"):
        raise MlpyAttributeError(f"access to '{method}' is forbidden")
    descriptor = _REGISTRY.is_allowed_attr(type(obj).__name__, method)
    if descriptor is None:
        # Dispatch-time lookup failure only. A raise from *inside* the
        # bound method below propagates untouched (spec.md `4.5`, point 4):
        # conflating the two was the bug this design specifically avoids.
        raise MlpyAttributeError(f"'{method}' is not in the safe-attribute registry")
    for capability in descriptor.capabilities_required:
        if not _CAP_CTX.is_granted(capability, f"{type(obj).__name__}.{method}", "execute"):
            raise MlpyCapabilityError(f"missing capability '{capability}' for '{method}'")
    bound = getattr(obj, method)
    return bound(*args)


def safe_import(dotted_name):
    descriptor = _REGISTRY.is_allowed_call(f"import:{dotted_name}")
    if descriptor is None:
        raise MlpyCapabilityError(f"module '{dotted_name}' is not whitelisted for import")
    import importlib
    return importlib.import_module(dotted_name)


def _resolve_capability_tokens(name):
    return _CAPABILITY_MANIFEST.get(name, [])
"#;
