use std::sync::LazyLock;

use regex::Regex;

use super::error::{ApiError, FieldError, codes};

static COLOR_HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^#[0-9a-fA-F]{6}$").expect("color pattern is valid"));

/// Strict `#RRGGBB` check used by activity creation
#[must_use]
pub fn valid_color_hex(color: &str) -> bool {
    COLOR_HEX.is_match(color)
}

/// Usernames are email addresses; this is a sanity check, not RFC 5322
#[must_use]
pub fn valid_username(username: &str) -> bool {
    let trimmed = username.trim();
    trimmed.contains('@') && !trimmed.starts_with('@') && !trimmed.ends_with('@')
}

/// Parse an optional non-negative integer query argument. `None` input
/// falls back to the default; any non-numeric value is `None` output and
/// the caller renders an error-flagged empty result instead of faulting.
#[must_use]
pub fn parse_index_argument(value: Option<&str>, default: u64) -> Option<u64> {
    match value {
        None => Some(default),
        Some(raw) => raw.trim().parse::<u64>().ok(),
    }
}

/// Password and confirmation pair shared by activation, reset and the
/// admin new-user form
pub fn validate_password_pair(password: &str, verify: &str) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if password.is_empty() {
        errors.push(FieldError::new(codes::NO_PASSWORD, "No password given"));
    }
    if password != verify {
        errors.push(FieldError::new(
            codes::PASSWORD_MISMATCH,
            "Passwords do not match",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_color_hex() {
        assert!(valid_color_hex("#1a2b3c"));
        assert!(valid_color_hex("#FFFFFF"));
        assert!(valid_color_hex("#000000"));

        assert!(!valid_color_hex("zzzzzz"));
        assert!(!valid_color_hex(""));
        assert!(!valid_color_hex("1a2b3c"));
        assert!(!valid_color_hex("#1a2b3"));
        assert!(!valid_color_hex("#1a2b3cd"));
        assert!(!valid_color_hex("#zzzzzz"));
    }

    #[test]
    fn test_valid_username() {
        assert!(valid_username("user@example.com"));
        assert!(valid_username("  user@example.com  "));

        assert!(!valid_username(""));
        assert!(!valid_username("user"));
        assert!(!valid_username("@example.com"));
        assert!(!valid_username("user@"));
    }

    #[test]
    fn test_parse_index_argument() {
        assert_eq!(parse_index_argument(None, 5), Some(5));
        assert_eq!(parse_index_argument(Some("0"), 5), Some(0));
        assert_eq!(parse_index_argument(Some("42"), 5), Some(42));
        assert_eq!(parse_index_argument(Some(" 7 "), 5), Some(7));

        assert_eq!(parse_index_argument(Some("abc"), 5), None);
        assert_eq!(parse_index_argument(Some("-1"), 5), None);
        assert_eq!(parse_index_argument(Some("1.5"), 5), None);
        assert_eq!(parse_index_argument(Some(""), 5), None);
    }

    #[test]
    fn test_validate_password_pair() {
        assert!(validate_password_pair("secret", "secret").is_ok());

        assert!(validate_password_pair("secret", "other").is_err());
        assert!(validate_password_pair("", "").is_err());

        // Empty password with a non-empty confirmation violates both rules
        let err = validate_password_pair("", "other").unwrap_err();
        match err {
            ApiError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other}"),
        }
    }
}
