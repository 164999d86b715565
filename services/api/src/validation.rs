//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::error::ApiError;

/// Longest title accepted for posts, bands, tags and catalog entries
pub const MAX_TITLE_LENGTH: usize = 255;
/// Longest review text
pub const MAX_REVIEW_LENGTH: usize = 1000;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.chars().count() > 150 {
        return Err("Username must be at most 150 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err(
            "Username can only contain letters, numbers, and @/./+/-/_ characters".to_string(),
        );
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.chars().count() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("Password can not be entirely numeric".to_string());
    }

    Ok(())
}

/// Validate a URL slug
pub fn validate_slug(slug: &str) -> Result<(), String> {
    if slug.is_empty() {
        return Err("Slug is required".to_string());
    }

    if slug.len() > 50 {
        return Err("Slug must be at most 50 characters long".to_string());
    }

    static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = SLUG_REGEX
        .get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("Failed to compile slug regex"));

    if !regex.is_match(slug) {
        return Err(
            "Slug can only contain letters, numbers, underscores or hyphens".to_string(),
        );
    }

    Ok(())
}

/// Validate a `#RRGGBB` color
pub fn validate_color(color: &str) -> Result<(), String> {
    static COLOR_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = COLOR_REGEX
        .get_or_init(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("Failed to compile color regex"));

    if !regex.is_match(color) {
        return Err("Color must be a hex value like #1A2B3C".to_string());
    }

    Ok(())
}

/// Validate a non-empty bounded text field
pub fn validate_text(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("The {} field may not be blank", field));
    }

    if value.chars().count() > max {
        return Err(format!(
            "The {} field must be at most {} characters long",
            field, max
        ));
    }

    Ok(())
}

/// Validate a title field
pub fn validate_title(value: &str) -> Result<(), String> {
    validate_text("title", value, MAX_TITLE_LENGTH)
}

/// Run a validator and turn its message into a 400
pub fn check(result: Result<(), String>) -> Result<(), ApiError> {
    result.map_err(ApiError::BadRequest)
}

/// Extract a required field from a create payload
pub fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::BadRequest(format!("The {} field is required", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("jimi_h").is_ok());
        assert!(validate_username("jimi.h+band@home-1").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("bass@band.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("user1234").is_ok());
        assert_eq!(
            validate_password("short1"),
            Err("Password must be at least 8 characters long".to_string())
        );
        assert_eq!(
            validate_password("12345678"),
            Err("Password can not be entirely numeric".to_string())
        );
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_slug_and_color_rules() {
        assert!(validate_slug("string-instruments_1").is_ok());
        assert!(validate_slug("with space").is_err());
        assert!(validate_slug("").is_err());

        assert!(validate_color("#FFFFFF").is_ok());
        assert!(validate_color("#12ab9F").is_ok());
        assert!(validate_color("FFFFFF").is_err());
        assert!(validate_color("#FFF").is_err());
    }

    #[test]
    fn test_text_rules() {
        assert!(validate_title("Test Title").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_text("text", &"r".repeat(MAX_REVIEW_LENGTH), MAX_REVIEW_LENGTH).is_ok());
        assert!(
            validate_text("text", &"r".repeat(MAX_REVIEW_LENGTH + 1), MAX_REVIEW_LENGTH).is_err()
        );
    }

    #[test]
    fn test_required_reports_field_name() {
        let err = required::<String>(None, "slug").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "The slug field is required"));
        assert_eq!(required(Some(3), "quantity").unwrap(), 3);
    }
}
