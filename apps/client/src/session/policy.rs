//! Signup validation, enforced before any network call is issued.

use crate::models::user::NewUser;

const MIN_PASSWORD_LEN: usize = 8;

/// Checks password strength: minimum length plus at least one upper-case
/// letter, one lower-case letter, one digit, and one symbol.
pub fn password_is_strong(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric())
}

/// Validates a signup form. Returns the human-readable error for the first
/// failed check, in the order the form itself reports them.
pub fn validate_signup(new_user: &NewUser) -> Result<(), String> {
    if new_user.name.trim().is_empty()
        || new_user.email.trim().is_empty()
        || new_user.password.is_empty()
    {
        return Err("Please provide all required information".to_string());
    }
    if new_user.password.chars().count() < MIN_PASSWORD_LEN {
        return Err("Password must be at least 8 characters".to_string());
    }
    if !password_is_strong(&new_user.password) {
        return Err(
            "Password must include upper and lower case letters, a digit, and a symbol"
                .to_string(),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, password: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            avatar: None,
        }
    }

    #[test]
    fn test_strong_password_passes() {
        assert!(password_is_strong("secret1A!"));
    }

    #[test]
    fn test_short_password_fails() {
        assert!(!password_is_strong("abc"));
        assert!(!password_is_strong("aB1!xyz")); // 7 chars
    }

    #[test]
    fn test_each_character_class_is_required() {
        assert!(!password_is_strong("alllower1!")); // no upper
        assert!(!password_is_strong("ALLUPPER1!")); // no lower
        assert!(!password_is_strong("NoDigits!!")); // no digit
        assert!(!password_is_strong("NoSymbol12")); // no symbol
    }

    #[test]
    fn test_missing_fields_rejected_first() {
        let err = validate_signup(&form("", "a@b.com", "secret1A!")).unwrap_err();
        assert_eq!(err, "Please provide all required information");
    }

    #[test]
    fn test_length_error_before_strength_error() {
        let err = validate_signup(&form("A", "a@b.com", "abc")).unwrap_err();
        assert_eq!(err, "Password must be at least 8 characters");
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(validate_signup(&form("A", "a@b.com", "secret1A!")).is_ok());
    }
}
