//! Canonical name normalization.
//!
//! Watchlist entries and query names are compared only in normalized form.
//! The transform is deterministic and idempotent: lower-case, strip leading
//! honorifics, drop everything that is not a letter, digit or space, then
//! collapse whitespace.

/// Honorific prefixes stripped when they lead the lower-cased name
const HONORIFIC_PREFIXES: [&str; 5] = ["mr.", "mrs.", "ms.", "dr.", "prof."];

/// Normalize a name for indexing and comparison
pub fn normalize_name(name: &str) -> String {
    let mut name = name.to_lowercase();

    for prefix in HONORIFIC_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest.to_string();
        }
    }

    let filtered: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}
