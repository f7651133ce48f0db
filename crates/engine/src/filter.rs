//! Wildcard name filters (spec §6: `*`/`?` patterns for file and directory
//! selection).
//!
//! This is a small hand-rolled matcher rather than a full glob crate: the
//! CLI surface only ever needs single-component `*`/`?` matching against a
//! bare file or directory name, never path-spanning patterns.

/// Returns whether `name` matches `pattern`, where `*` matches any run of
/// characters (including none) and `?` matches exactly one character.
/// Matching is case-insensitive, matching the rest of the engine's
/// case-insensitive name comparisons.
#[must_use]
pub fn matches(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.to_ascii_lowercase().chars().collect();
    let name: Vec<char> = name.to_ascii_lowercase().chars().collect();
    matches_from(&pattern, &name)
}

fn matches_from(pattern: &[char], name: &[char]) -> bool {
    match pattern.first() {
        None => name.is_empty(),
        Some('*') => {
            matches_from(&pattern[1..], name)
                || (!name.is_empty() && matches_from(pattern, &name[1..]))
        }
        Some('?') => !name.is_empty() && matches_from(&pattern[1..], &name[1..]),
        Some(c) => name.first() == Some(c) && matches_from(&pattern[1..], &name[1..]),
    }
}

/// Applies an include/exclude filter pair: empty `include` means "everything
/// passes the include stage"; a name passing include is then rejected if any
/// `exclude` pattern matches it.
#[must_use]
pub fn passes(include: &[String], exclude: &[String], name: &str) -> bool {
    let included = include.is_empty() || include.iter().any(|p| matches(p, name));
    included && !exclude.iter().any(|p| matches(p, name))
}
