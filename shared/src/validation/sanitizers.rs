//! Input sanitization functions
//!
//! Clean and normalize fixture fields before validation and storage.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Pattern to match HTML tags
    static ref HTML_TAG_PATTERN: Regex = Regex::new(r"<[^>]*>").unwrap();

    /// Pattern to match multiple whitespace characters
    static ref MULTI_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    /// Pattern to match control characters (except newline and tab)
    static ref CONTROL_CHARS: Regex = Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").unwrap();

    /// Runs of characters that cannot appear in a slug
    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^a-z0-9]+").unwrap();

    /// First number in a chapter label ("Chapter 12.5: The End")
    static ref LEADING_NUMBER: Regex = Regex::new(r"(\d+(?:\.\d+)?)").unwrap();
}

/// Trim leading and trailing whitespace from a string
pub fn trim(value: &str) -> String {
    value.trim().to_string()
}

/// Trim an optional string in place, dropping it when empty
pub fn trim_optional(value: &mut Option<String>) {
    if let Some(ref mut s) = value {
        *s = s.trim().to_string();
        if s.is_empty() {
            *value = None;
        }
    }
}

/// Normalize whitespace: collapse multiple spaces/newlines into single space
pub fn normalize_whitespace(value: &str) -> String {
    MULTI_WHITESPACE.replace_all(value.trim(), " ").to_string()
}

/// Strip all HTML tags from a string
pub fn strip_html(value: &str) -> String {
    HTML_TAG_PATTERN.replace_all(value, "").to_string()
}

/// Remove control characters from a string
pub fn remove_control_chars(value: &str) -> String {
    CONTROL_CHARS.replace_all(value, "").to_string()
}

/// Sanitize a display name or title: strip HTML, control chars, collapse whitespace
pub fn sanitize_name(value: &str) -> String {
    let stripped = strip_html(value);
    let cleaned = remove_control_chars(&stripped);
    normalize_whitespace(&cleaned)
}

/// Sanitize free text: strip HTML and control chars, keep line breaks
pub fn sanitize_description(value: &str) -> String {
    remove_control_chars(&strip_html(value)).trim().to_string()
}

/// Normalize an email address for natural-key lookups
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// URL-safe slug: lowercase ASCII alphanumerics separated by single dashes
pub fn slugify(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    NON_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Extract the first number from a chapter label
pub fn extract_number(label: &str) -> Option<f64> {
    LEADING_NUMBER
        .captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
