//! Small helpers for identifier validation and normalization.

use regex::Regex;

/// Minimum accepted password length for registration.
pub(crate) const MIN_PASSWORD_LENGTH: usize = 8;

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// National IDs are alphanumeric, at most 13 characters.
pub(crate) fn valid_national_id(national_id: &str) -> bool {
    Regex::new(r"^[0-9a-zA-Z]{1,13}$").is_ok_and(|regex| regex.is_match(national_id))
}

/// Phone numbers are digits with an optional leading `+`.
pub(crate) fn valid_phone_number(phone_number: &str) -> bool {
    Regex::new(r"^\+?[0-9]{7,15}$").is_ok_and(|regex| regex.is_match(phone_number))
}

/// Password length gate applied at registration time.
pub(crate) fn valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

/// Dates arrive as `YYYY-MM-DD`; range checks happen against the database clock.
pub(crate) fn valid_date_format(date: &str) -> bool {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").is_ok_and(|regex| regex.is_match(date))
}

/// Trim an optional field and drop it entirely when empty.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn valid_national_id_accepts_alphanumeric() {
        assert!(valid_national_id("1234567890123"));
        assert!(valid_national_id("AB12"));
    }

    #[test]
    fn valid_national_id_rejects_long_or_symbolic() {
        assert!(!valid_national_id("12345678901234"));
        assert!(!valid_national_id("12-34"));
        assert!(!valid_national_id(""));
    }

    #[test]
    fn valid_phone_number_accepts_e164_style() {
        assert!(valid_phone_number("+66812345678"));
        assert!(valid_phone_number("0812345678"));
    }

    #[test]
    fn valid_phone_number_rejects_short_or_alpha() {
        assert!(!valid_phone_number("12345"));
        assert!(!valid_phone_number("+66-81-234"));
        assert!(!valid_phone_number("phone"));
    }

    #[test]
    fn valid_password_length_gate() {
        assert!(valid_password("pw123456"));
        assert!(!valid_password("pw12345"));
    }

    #[test]
    fn valid_date_format_shape() {
        assert!(valid_date_format("1990-01-31"));
        assert!(!valid_date_format("31-01-1990"));
        assert!(!valid_date_format("1990/01/31"));
    }

    #[test]
    fn normalize_optional_drops_blank() {
        assert_eq!(normalize_optional(Some("  ".to_string())), None);
        assert_eq!(
            normalize_optional(Some(" bio ".to_string())),
            Some("bio".to_string())
        );
        assert_eq!(normalize_optional(None), None);
    }

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }
}
