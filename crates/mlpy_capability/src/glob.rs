//! Resource-pattern glob matching (spec.md `4.7`): `*` matches exactly
//! one `/`-delimited segment, `**` matches zero or more segments. No
//! other wildcard forms are recognized.
//!
//! Hand-rolled rather than pulled from the `glob`/`globset` crates
//! already in the workspace dependency table: those match filesystem
//! paths against the *host* filesystem, where this is matching an
//! opaque resource string (`"net:example.com:443"`,
//! `"fs:/home/user/**"`) against a pattern, with no filesystem syscalls
//! involved anywhere in the comparison.

/// Whether `pattern` matches `resource`, both split on `/`.
pub fn matches(pattern: &str, resource: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let resource_segments: Vec<&str> = resource.split('/').collect();
    matches_segments(&pattern_segments, &resource_segments)
}

fn matches_segments(pattern: &[&str], resource: &[&str]) -> bool {
    match pattern.first() {
        None => resource.is_empty(),
        Some(&"**") => {
            // `**` may consume zero or more segments; try every split
            // point. Patterns are short (a handful of segments), so
            // this is not worth memoizing.
            (0..=resource.len()).any(|split| matches_segments(&pattern[1..], &resource[split..]))
        }
        Some(&"*") => !resource.is_empty() && matches_segments(&pattern[1..], &resource[1..]),
        Some(literal) => resource.first() == Some(literal) && matches_segments(&pattern[1..], &resource[1..]),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(matches("fs/tmp/data.txt", "fs/tmp/data.txt"));
        assert!(!matches("fs/tmp/data.txt", "fs/tmp/other.txt"));
    }

    #[test]
    fn single_star_matches_one_segment() {
        assert!(matches("fs/tmp/*", "fs/tmp/data.txt"));
        assert!(!matches("fs/tmp/*", "fs/tmp/nested/data.txt"));
    }

    #[test]
    fn double_star_matches_zero_or_more_segments() {
        assert!(matches("fs/tmp/**", "fs/tmp"));
        assert!(matches("fs/tmp/**", "fs/tmp/data.txt"));
        assert!(matches("fs/tmp/**", "fs/tmp/nested/deep/data.txt"));
    }

    #[test]
    fn double_star_in_the_middle() {
        assert!(matches("fs/**/data.txt", "fs/a/b/c/data.txt"));
        assert!(matches("fs/**/data.txt", "fs/data.txt"));
        assert!(!matches("fs/**/data.txt", "fs/a/b/other.txt"));
    }

    #[test]
    fn no_match_on_different_prefix() {
        assert!(!matches("fs/tmp/*", "net/example.com"));
    }
}
