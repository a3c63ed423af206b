//! Dedup key construction.
//!
//! A dedup key pairs a normalized trend keyword with a stable identifier for
//! the matched content thread: `"ai regulation::art-123"`.

/// Separator between the keyword and the thread identifier.
pub const KEY_SEPARATOR: &str = "::";

/// Lowercase and collapse internal whitespace.
#[must_use]
pub fn normalize_keyword(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the dedup key for a trend keyword and a content-thread identifier.
#[must_use]
pub fn dedup_key(keyword: &str, thread_id: &str) -> String {
    format!("{}{KEY_SEPARATOR}{}", normalize_keyword(keyword), thread_id.trim())
}

/// Split a dedup key back into `(keyword, thread_id)`.
#[must_use]
pub fn split_dedup_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(KEY_SEPARATOR)
}
