/**
Identifiers and fresh-name generation

A name starting with `_` is a hole: a metavariable the checker solves.
Fresh names are produced by bumping a trailing decimal suffix.
*/
use std::collections::HashSet;

pub type Id = String;
pub type IdSet = HashSet<Id>;

/// Name of the universe axiom
pub const TYPE_ID: &str = "Type";

pub fn is_hole(id: &str) -> bool {
    id.starts_with('_')
}

/// Bump the trailing decimal suffix of a name, or append `0`
///
/// `x` becomes `x0`, `x0` becomes `x1`, `x9` becomes `x10`.
pub fn freshen(id: &str) -> Id {
    let stem = id.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &id[stem.len()..];
    match digits.parse::<u64>() {
        Ok(n) => match n.checked_add(1) {
            Some(next) => format!("{stem}{next}"),
            None => format!("{id}0"),
        },
        Err(_) => format!("{id}0"),
    }
}

/// Freshen `id` until `taken` rejects it
///
/// Returns `id` itself when it is not taken.
pub fn fresh_in(taken: impl Fn(&str) -> bool, id: &str) -> Id {
    let mut candidate = id.to_string();
    while taken(&candidate) {
        candidate = freshen(&candidate);
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshen_appends_or_increments() {
        assert_eq!(freshen("x"), "x0");
        assert_eq!(freshen("x0"), "x1");
        assert_eq!(freshen("x9"), "x10");
        assert_eq!(freshen("_argType41"), "_argType42");
        assert_eq!(freshen("_"), "_0");
    }

    #[test]
    fn test_freshen_overflowing_suffix() {
        let id = "x99999999999999999999999";
        assert_eq!(freshen(id), format!("{id}0"));
    }

    #[test]
    fn test_fresh_in_skips_taken_names() {
        let taken: IdSet = ["x", "x0", "x1"].iter().map(|s| s.to_string()).collect();
        assert_eq!(fresh_in(|c| taken.contains(c), "x"), "x2");
        assert_eq!(fresh_in(|c| taken.contains(c), "y"), "y");
    }

    #[test]
    fn test_is_hole() {
        assert!(is_hole("_"));
        assert!(is_hole("_12"));
        assert!(!is_hole("x_"));
        assert!(!is_hole(TYPE_ID));
    }
}
