//! Text normalization for institution matching
//!
//! Lower-case, strip combining diacritics (NFD then drop marks), trim.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize text for comparison.
///
/// ```
/// use checadoc::institution::normalize;
///
/// assert_eq!(normalize("  Universidade de São Paulo "), "universidade de sao paulo");
/// assert_eq!(normalize("PONTIFÍCIA"), "pontificia");
/// ```
pub fn normalize(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}
