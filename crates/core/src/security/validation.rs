//! Credential and profile input validation

use bitebase_domain::{BiteBaseError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 8;
/// Shortest accepted display name
pub const MIN_NAME_LEN: usize = 2;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("EMAIL_REGEX should compile - this is a bug")
});

/// Accept an address shaped like `local@domain.tld`.
pub fn validate_email(email: &str) -> Result<()> {
    if !EMAIL_REGEX.is_match(email) {
        return Err(BiteBaseError::InvalidInput("Invalid email format".into()));
    }
    Ok(())
}

/// At least eight characters with an uppercase letter, a lowercase letter
/// and a digit.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(BiteBaseError::InvalidInput(
            "Password must be at least 8 characters long".into(),
        ));
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        return Err(BiteBaseError::InvalidInput(
            "Password must contain at least one uppercase letter, one lowercase letter, and one number"
                .into(),
        ));
    }
    Ok(())
}

/// Accept a name of at least [`MIN_NAME_LEN`] characters.
pub fn validate_name(name: &str) -> Result<()> {
    if name.chars().count() < MIN_NAME_LEN {
        return Err(BiteBaseError::InvalidInput("Name must be at least 2 characters long".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Unit tests for security::validation.
    use super::*;

    #[test]
    fn test_email_format() {
        assert!(validate_email("chef@bitebase.app").is_ok());
        assert!(validate_email("a.b+c@sub.example.co").is_ok());

        for invalid in ["", "chef", "chef@bitebase", "chef @bitebase.app", "@bitebase.app"] {
            assert_eq!(
                validate_email(invalid),
                Err(BiteBaseError::InvalidInput("Invalid email format".into())),
                "{invalid:?}"
            );
        }
    }

    /// Validates the password strength rules.
    ///
    /// Assertions:
    /// - Confirms the length rule is checked before character classes.
    /// - Ensures each missing character class is rejected.
    #[test]
    fn test_password_rules() {
        assert!(validate_password("Tomyum42").is_ok());

        let too_short = validate_password("Ab1").unwrap_err();
        assert!(too_short.to_string().contains("at least 8 characters"));

        for weak in ["alllowercase1", "ALLUPPERCASE1", "NoDigitsHere"] {
            let err = validate_password(weak).unwrap_err();
            assert!(err.to_string().contains("one uppercase letter"), "{weak}");
        }
    }

    #[test]
    fn test_name_length_counts_characters() {
        assert!(validate_name("Bo").is_ok());
        assert!(validate_name("李").is_err());
        assert!(validate_name("").is_err());
    }
}
