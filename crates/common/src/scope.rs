//! OAuth 2.0 scope and audience set helpers.
//!
//! Scopes travel on the wire as a single space-delimited string (RFC 6749
//! Section 3.3) and audiences as JSON arrays. Internally both are kept as
//! ordered, de-duplicated `Vec<String>`: order carries no meaning, but
//! preserving the caller's order keeps responses stable and readable.

/// Parse a space-delimited scope string into an ordered, de-duplicated list.
///
/// Any run of ASCII whitespace separates tokens; empty input yields an empty list.
#[must_use]
pub fn parse_scope(raw: &str) -> Vec<String> {
    dedup(raw.split_whitespace().map(ToString::to_string).collect())
}

/// Join scope tokens into the space-delimited wire form.
#[must_use]
pub fn join_scope(scopes: &[String]) -> String {
    scopes.join(" ")
}

/// Remove duplicates while keeping the first occurrence of each value.
#[must_use]
pub fn dedup(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(values.len());
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Values of `requested` that also appear in `allowed`, in `requested` order.
#[must_use]
pub fn intersect(requested: &[String], allowed: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|s| allowed.contains(s))
        .cloned()
        .collect()
}

/// Whether the two sets share at least one value.
#[must_use]
pub fn overlaps(a: &[String], b: &[String]) -> bool {
    a.iter().any(|v| b.contains(v))
}
