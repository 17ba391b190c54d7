//! Input validation for API requests.
//!
//! Field validators return `Err(message)` so handlers can collect them into a
//! single response with `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Lowercase alphanumeric words joined by single dashes
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap();

    /// Non-negative decimal with at most two fractional digits. ASCII digits
    /// only: `\d` would also accept other scripts' digits.
    static ref PRICE_REGEX: Regex = Regex::new(r"^[0-9]{1,10}(\.[0-9]{1,2})?$").unwrap();

    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9_.-]{3,32}$").unwrap();

    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();

    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^a-z0-9\s-]").unwrap();
    static ref SLUG_SEPARATORS: Regex = Regex::new(r"[\s-]+").unwrap();
}

/// Maximum number of images attached to one product
pub const MAX_PRODUCT_IMAGES: usize = 5;

pub const INVALID_SPECIFICATIONS: &str = "Specifications must be valid JSON format.";

/// Derive a slug from a display name ("Acme X1 Pro" → "acme-x1-pro")
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(&lower, "");
    SLUG_SEPARATORS
        .replace_all(stripped.trim(), "-")
        .trim_matches('-')
        .to_string()
}

pub fn validate_slug(slug: &str) -> Result<(), String> {
    if slug.is_empty() {
        return Err("Slug is required".to_string());
    }

    if slug.len() > 120 {
        return Err("Slug is too long (max 120 characters)".to_string());
    }

    if !SLUG_REGEX.is_match(slug) {
        return Err(
            "Slug must be lowercase letters and digits separated by single dashes".to_string(),
        );
    }

    Ok(())
}

/// Validate a required display name (product or category)
pub fn validate_name(name: &str, label: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{} is required", label));
    }

    if name.len() > 200 {
        return Err(format!("{} is too long (max 200 characters)", label));
    }

    Ok(())
}

pub fn validate_price(price: &str) -> Result<(), String> {
    if price.is_empty() {
        return Err("Price is required".to_string());
    }

    if !PRICE_REGEX.is_match(price) {
        return Err("Price must be a decimal number like 45999.00".to_string());
    }

    Ok(())
}

pub fn validate_sku(sku: &str) -> Result<(), String> {
    if sku.trim().is_empty() {
        return Err("SKU is required".to_string());
    }

    if sku.len() > 64 {
        return Err("SKU is too long (max 64 characters)".to_string());
    }

    Ok(())
}

/// Validate an optional free-text field against a length limit
pub fn validate_optional_text(value: Option<&str>, label: &str, max: usize) -> Result<(), String> {
    match value {
        Some(v) if v.len() > max => Err(format!("{} is too long (max {} characters)", label, max)),
        _ => Ok(()),
    }
}

pub fn validate_images(images: &[String]) -> Result<(), String> {
    if images.len() > MAX_PRODUCT_IMAGES {
        return Err(format!(
            "Maximum {} images allowed per product",
            MAX_PRODUCT_IMAGES
        ));
    }

    for url in images {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(format!("Invalid image URL: {}", url));
        }
        if url.len() > 2048 {
            return Err("Image URL is too long (max 2048 characters)".to_string());
        }
    }

    Ok(())
}

pub fn validate_rating(rating: f64) -> Result<(), String> {
    if !(0.0..=5.0).contains(&rating) {
        return Err("Rating must be between 0 and 5".to_string());
    }
    Ok(())
}

pub fn validate_review_count(count: i64) -> Result<(), String> {
    if count < 0 {
        return Err("Review count cannot be negative".to_string());
    }
    Ok(())
}

/// Normalize submitted specifications into a JSON object.
///
/// The admin form sends the raw textarea contents as a string, API clients
/// may send an object directly. Blank strings mean "no specifications".
pub fn normalize_specifications(
    value: Option<serde_json::Value>,
) -> Result<Option<serde_json::Value>, String> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) => Ok(Some(serde_json::Value::Object(map))),
        Some(serde_json::Value::String(raw)) => {
            if raw.trim().is_empty() {
                return Ok(None);
            }
            match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(serde_json::Value::Object(map)) => Ok(Some(serde_json::Value::Object(map))),
                _ => Err(INVALID_SPECIFICATIONS.to_string()),
            }
        }
        Some(_) => Err(INVALID_SPECIFICATIONS.to_string()),
    }
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username must be 3-32 characters of letters, digits, '.', '_' or '-'".to_string(),
        );
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 || !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }

    Ok(())
}

/// Validate password strength
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.len() < 10 {
        return Err("Password must be at least 10 characters".to_string());
    }

    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_letter || !has_digit {
        return Err("Password must contain both letters and digits".to_string());
    }

    Ok(())
}
