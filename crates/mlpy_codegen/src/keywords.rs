//! Host reserved words (spec.md `4.5`: the generator renames an ML
//! identifier that collides with one of these, recording the rename in
//! the source map's symbol table).

pub const HOST_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

pub fn is_reserved(name: &str) -> bool {
    HOST_KEYWORDS.contains(&name)
}
