// Validation utilities module
// Custom validation functions for principal fields

use validator::ValidationError;

/// Usernames are ASCII letters, digits, '_', '.', or '-'
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username_characters"))
    }
}

/// Passwords must be present and at least `min_len` characters
pub fn validate_password_length(password: &str, min_len: usize) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    if password.chars().count() < min_len {
        return Err(format!("Password must be at least {} characters", min_len));
    }
    Ok(())
}
