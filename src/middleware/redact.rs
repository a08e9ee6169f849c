//! Sensitive header masking.

use std::collections::HashSet;

/// Replacement for the value of every sensitive header.
pub const MASK: &str = "*****";

/// Copies `headers`, masking the value of each header whose name is in
/// `sensitive`. Names are compared exactly, so both sides must use the
/// canonical `Title-Case` spelling.
pub fn redact(headers: &[(String, String)], sensitive: &HashSet<String>) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if sensitive.contains(name) { MASK.to_owned() } else { value.clone() };
            (name.clone(), value)
        })
        .collect()
}
