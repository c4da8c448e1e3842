//! Canonical text normalization
//!
//! Every stage of the pipeline compares strings through this one function:
//! candidate deduplication, exact matching, fuzzy tokenization, and validation
//! of classifier answers. Keeping a single rule here is what makes "the same
//! trim" mean the same thing everywhere.

/// Normalize a string to its canonical comparison key.
///
/// Lowercases, replaces every run of non-alphanumeric characters with a single
/// space, and trims. Idempotent: `normalize(normalize(x)) == normalize(x)`.
///
/// ```
/// use trimatch_core::normalize;
/// assert_eq!(normalize("SE-Plus"), "se plus");
/// assert_eq!(normalize("se   plus"), "se plus");
/// ```
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            for lc in c.to_lowercase() {
                out.push(lc);
            }
        } else {
            pending_space = true;
        }
    }

    out
}

/// Truncate a string to at most `max_chars` characters, respecting char
/// boundaries. Used for bounding prompt fields.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
