//! Username validation for directory records
//!
//! Usernames follow the alphabet of the web front end's user table: letters, digits
//! and `@ . + - _`, at most 150 characters.

use thiserror::Error;

/// Errors that can occur during username validation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UsernameValidationError {
    #[error("Username is empty")]
    Empty,

    #[error("Username is too long (max 150 characters)")]
    TooLong,

    #[error("Username contains invalid character {0:?} (only letters, numbers and @.+-_ allowed)")]
    InvalidCharacter(char),

    #[error("Username is reserved: {0}")]
    ReservedName(String),
}

/// Names that collide with destination sentinels
const RESERVED_NAMES: &[&str] = &[
    crate::models::MULTICAST,
    crate::models::BROADCAST,
];

/// Validate a username according to the naming convention
pub fn validate_username(name: &str) -> Result<(), UsernameValidationError> {
    if name.is_empty() {
        return Err(UsernameValidationError::Empty);
    }

    if name.chars().count() > 150 {
        return Err(UsernameValidationError::TooLong);
    }

    if RESERVED_NAMES.contains(&name) {
        return Err(UsernameValidationError::ReservedName(name.to_string()));
    }

    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')))
    {
        return Err(UsernameValidationError::InvalidCharacter(ch));
    }

    Ok(())
}

/// Check if a username is valid (convenience function)
pub fn is_valid_username(name: &str) -> bool {
    validate_username(name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("bob_smith"));
        assert!(is_valid_username("carol.d+pi@home"));
        assert!(is_valid_username("user-123"));
        assert!(is_valid_username("núñez"));
    }

    #[test]
    fn test_invalid_usernames() {
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("with space"));
        assert!(!is_valid_username("semi;colon"));
        assert!(!is_valid_username(&"a".repeat(151)));
    }

    #[test]
    fn test_sentinels_are_reserved() {
        assert_eq!(
            validate_username("broadcast"),
            Err(UsernameValidationError::ReservedName("broadcast".to_string()))
        );
        assert!(!is_valid_username("multicast"));
    }

    #[test]
    fn test_validation_error_messages() {
        match validate_username("bad name") {
            Err(UsernameValidationError::InvalidCharacter(' ')) => (),
            other => panic!("Expected InvalidCharacter error, got {:?}", other),
        }
        assert_eq!(validate_username(""), Err(UsernameValidationError::Empty));
    }
}
