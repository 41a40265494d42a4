//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::{error::AccountError, models::Registration};

const MAX_NAME_LENGTH: usize = 255;

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
///
/// At least 8 characters, at most 128, and not made of digits only.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    let length = password.chars().count();

    if length < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if length > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("Password cannot be entirely numeric".to_string());
    }

    Ok(())
}

/// Validate a required display name field
pub fn validate_name(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} is required"));
    }

    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(format!(
            "{field} must be at most {MAX_NAME_LENGTH} characters long"
        ));
    }

    Ok(())
}

/// Validate phone number
pub fn validate_phone_number(phone_number: &str) -> Result<(), String> {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX
        .get_or_init(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("Failed to compile phone regex"));

    if !regex.is_match(phone_number) {
        return Err("Invalid phone number format".to_string());
    }

    Ok(())
}

fn validate_range(field: &str, value: Option<i32>, min: i32, max: i32) -> Result<(), String> {
    match value {
        Some(v) if v < min || v > max => {
            Err(format!("{field} must be between {min} and {max}"))
        }
        _ => Ok(()),
    }
}

/// Lowercase an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate a whole registration payload
pub fn validate_registration(registration: &Registration) -> Result<(), AccountError> {
    let check = || -> Result<(), String> {
        validate_username(&registration.username)?;
        validate_email(registration.email.trim())?;
        validate_password(&registration.password)?;
        validate_name("Name", &registration.name)?;
        validate_name("Last name", &registration.last_name)?;
        if let Some(phone_number) = &registration.phone_number {
            validate_phone_number(phone_number)?;
        }
        validate_range("Age", registration.age, 0, 150)?;
        validate_range("Height", registration.height, 1, 300)?;
        validate_range("Weight", registration.weight, 1, 500)?;
        Ok(())
    };

    check().map_err(AccountError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            username: "jane_doe".to_string(),
            password: "correct horse".to_string(),
            email: "Jane@Example.com".to_string(),
            name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            phone_number: Some("+998901234567".to_string()),
            sex: None,
            age: Some(29),
            height: Some(170),
            weight: Some(60),
        }
    }

    #[test]
    fn test_valid_registration_passes() {
        assert!(validate_registration(&registration()).is_ok());
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("user.name+tag@x-y").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("someone@example.org").is_ok());
        assert!(validate_email("someone@").is_err());
        assert!(validate_email("no-at-sign.example.org").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password("abcdefgh").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("1234567890").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_profile_ranges() {
        let mut bad_age = registration();
        bad_age.age = Some(-1);
        assert!(matches!(
            validate_registration(&bad_age),
            Err(AccountError::Validation(msg)) if msg.contains("Age")
        ));

        let mut bad_phone = registration();
        bad_phone.phone_number = Some("call me".to_string());
        assert!(validate_registration(&bad_phone).is_err());

        let mut blank_name = registration();
        blank_name.last_name = "   ".to_string();
        assert!(validate_registration(&blank_name).is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }
}
