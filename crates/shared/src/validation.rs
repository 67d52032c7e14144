//! Field validators shared by request payloads and store implementations.
//!
//! Each returns a `validator::ValidationError` so it can back a
//! `#[validate(custom(function = ...))]` attribute.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 20;
pub const DEVICE_NAME_MIN: usize = 1;
pub const DEVICE_NAME_MAX: usize = 32;

lazy_static! {
    pub static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    )
    .expect("email regex is valid");
}

fn error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn check_length(
    value: &str,
    min: usize,
    max: usize,
    code: &'static str,
    label: &str,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if (min..=max).contains(&len) {
        Ok(())
    } else {
        Err(error(
            code,
            format!("{} must be {}-{} characters", label, min, max),
        ))
    }
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    check_length(username, USERNAME_MIN, USERNAME_MAX, "username_length", "Username")
}

pub fn validate_device_name(name: &str) -> Result<(), ValidationError> {
    check_length(name, DEVICE_NAME_MIN, DEVICE_NAME_MAX, "device_name_length", "Device name")
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(error("email_format", "Invalid email format".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::SafeEmail;
    use fake::Fake;

    #[test]
    fn test_username_bounds() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("abc").is_ok());
        assert!(validate_username(&"a".repeat(20)).is_ok());
        assert!(validate_username(&"a".repeat(21)).is_err());
    }

    #[test]
    fn test_username_error_message() {
        let err = validate_username("x").unwrap_err();
        assert_eq!(err.code, "username_length");
        assert!(err.message.unwrap().contains("3-20"));
    }

    #[test]
    fn test_device_name_bounds() {
        assert!(validate_device_name("").is_err());
        assert!(validate_device_name("d").is_ok());
        assert!(validate_device_name(&"d".repeat(32)).is_ok());
        assert!(validate_device_name(&"d".repeat(33)).is_err());
    }

    #[test]
    fn test_device_name_counts_characters() {
        assert!(validate_device_name(&"ж".repeat(32)).is_ok());
    }

    #[test]
    fn test_email_format() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@@example.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_generated_emails_pass() {
        for _ in 0..20 {
            let email: String = SafeEmail().fake();
            assert!(validate_email(&email).is_ok(), "rejected {}", email);
        }
    }
}
