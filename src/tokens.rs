//! Space-separated name lists carried by handler and observer attributes.

use std::collections::HashSet;

/// Splits an attribute value into its distinct name tokens, in order of first
/// appearance.
///
/// A missing attribute and an all-whitespace value both yield no tokens.
pub fn tokenize(value: Option<&str>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    value
        .split_whitespace()
        .filter(|token| seen.insert(*token))
        .map(ToOwned::to_owned)
        .collect()
}

/// Exact-token membership test. `"xx"` does not contain `"x"`.
pub fn contains_token(value: Option<&str>, name: &str) -> bool {
    value.is_some_and(|value| value.split_whitespace().any(|token| token == name))
}

/// A usable registry name is a single non-empty token.
pub(crate) fn is_single_token(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}
