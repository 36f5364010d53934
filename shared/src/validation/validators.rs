//! Field validators for fixture records

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Pragmatic email shape: local@domain.tld, no whitespace
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();

    /// URL pattern for external images
    static ref URL_REGEX: Regex = Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").unwrap();

    /// Slug pattern: lowercase alphanumerics separated by single dashes
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

/// Validate that a string is not empty after trimming
pub fn validate_required(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field_name));
    }
    Ok(())
}

/// Validate string length within bounds
pub fn validate_length(value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len < min {
        return Err(format!("must be at least {} characters", min));
    }
    if len > max {
        return Err(format!("must be at most {} characters", max));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err("email is required".to_string());
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err("must be a valid email address".to_string());
    }

    Ok(())
}

/// Validate URL format
pub fn validate_url(url: &str) -> Result<(), String> {
    if !URL_REGEX.is_match(url.trim()) {
        return Err("must be a valid URL (starting with http:// or https://)".to_string());
    }
    Ok(())
}

/// Validate an image reference: an external URL or an already-hosted path
pub fn validate_image_ref(value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.starts_with('/') {
        return Ok(());
    }
    validate_url(trimmed)
}

/// Validate optional image reference (only validates if Some)
pub fn validate_image_ref_optional(value: &Option<String>) -> Result<(), String> {
    match value {
        Some(v) if !v.trim().is_empty() => validate_image_ref(v),
        _ => Ok(()),
    }
}

pub fn validate_slug(slug: &str) -> Result<(), String> {
    if !SLUG_REGEX.is_match(slug) {
        return Err("must contain only lowercase letters, digits and single dashes".to_string());
    }
    Ok(())
}

/// Validate a number lies in an inclusive range
pub fn validate_range(value: f64, min: f64, max: f64) -> Result<(), String> {
    if !value.is_finite() || value < min || value > max {
        return Err(format!("must be between {} and {}", min, max));
    }
    Ok(())
}
