//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Shortest accepted new password, in characters
pub const PASSWORD_MIN_LENGTH: usize = 6;
/// Longest accepted new password, in characters
pub const PASSWORD_MAX_LENGTH: usize = 64;

const NAME_MAX_LENGTH: usize = 100;

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

/// Validate a person name field. `required` names must be non-blank.
pub fn validate_name(field: &str, value: &str, required: bool) -> Result<(), String> {
    if required && value.trim().is_empty() {
        return Err(format!("Missing \"{}\" field from request body.", field));
    }

    if value.chars().count() > NAME_MAX_LENGTH {
        return Err(format!(
            "The {} must be at most {} characters long.",
            field, NAME_MAX_LENGTH
        ));
    }

    Ok(())
}

/// Validate the length of a new password
pub fn validate_new_password(password: &str) -> Result<(), String> {
    let length = password.chars().count();
    if !(PASSWORD_MIN_LENGTH..=PASSWORD_MAX_LENGTH).contains(&length) {
        return Err(format!(
            "Password must have {}-{} characters",
            PASSWORD_MIN_LENGTH, PASSWORD_MAX_LENGTH
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("ada@localhost").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("firstName", "Ada", true).is_ok());
        assert!(validate_name("lastName", "", false).is_ok());
        let err = validate_name("firstName", "  ", true).unwrap_err();
        assert!(err.contains("firstName"));
        assert!(validate_name("lastName", &"x".repeat(101), false).is_err());
    }

    #[test]
    fn test_new_password_bounds() {
        assert!(validate_new_password("12345").is_err());
        assert!(validate_new_password("123456").is_ok());
        assert!(validate_new_password(&"p".repeat(64)).is_ok());
        assert!(validate_new_password(&"p".repeat(65)).is_err());
        // counted in characters, not bytes
        assert!(validate_new_password("ééééé").is_err());
        assert!(validate_new_password("éééééé").is_ok());
    }
}
