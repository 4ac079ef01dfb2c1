//! Password strength policy.
//!
//! Pure function; rules are checked in a fixed order and the first failing
//! rule determines the returned reason.

/// Punctuation accepted as a "special character".
const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Validate a candidate password against the policy.
///
/// Order: length, uppercase, lowercase, digit, special character.
pub fn validate(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long");
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain at least one uppercase letter");
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("Password must contain at least one lowercase letter");
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit");
    }

    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err("Password must contain at least one special character");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_conforming_password() {
        assert_eq!(validate("Abcd123!"), Ok(()));
        assert_eq!(validate("Str0ng?Passw0rd"), Ok(()));
    }

    #[test]
    fn too_short_fails_first() {
        // Violates several rules at once; length is reported
        let err = validate("a1!").unwrap_err();
        assert!(err.contains("8 characters"));
    }

    #[test]
    fn missing_uppercase() {
        let err = validate("abcd123!").unwrap_err();
        assert!(err.contains("uppercase"));
    }

    #[test]
    fn missing_lowercase() {
        let err = validate("ABCD123!").unwrap_err();
        assert!(err.contains("lowercase"));
    }

    #[test]
    fn missing_digit() {
        let err = validate("Abcdefg!").unwrap_err();
        assert!(err.contains("digit"));
    }

    #[test]
    fn missing_special_character() {
        let err = validate("Abcd1234").unwrap_err();
        assert!(err.contains("special"));
    }

    #[test]
    fn rules_are_checked_in_fixed_order() {
        // Short AND missing uppercase: length wins
        assert!(validate("ab1!").unwrap_err().contains("8 characters"));
        // Long enough, missing uppercase AND digit: uppercase wins
        assert!(validate("abcdefgh!").unwrap_err().contains("uppercase"));
        // Has case, missing digit AND special: digit wins
        assert!(validate("Abcdefgh").unwrap_err().contains("digit"));
    }

    #[test]
    fn every_listed_special_char_satisfies_the_rule() {
        for c in SPECIAL_CHARS.chars() {
            let candidate = format!("Abcd123{c}");
            assert_eq!(validate(&candidate), Ok(()), "rejected {c}");
        }
    }
}
