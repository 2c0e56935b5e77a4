//! Field validation shared by every service.
//!
//! Checks accumulate into one [`DomainError::Validation`] so a client sees
//! every rejected field of a request at once.

use domains::errors::{DomainError, FieldError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

/// Lowercased, trimmed form used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` against `field` unless `ok`.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn required(&mut self, value: &str, field: &str, message: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), field, message)
    }

    /// Absent is fine; present must be non-blank.
    pub fn optional_required(
        &mut self,
        value: Option<&str>,
        field: &str,
        message: &str,
    ) -> &mut Self {
        match value {
            Some(v) => self.required(v, field, message),
            None => self,
        }
    }

    pub fn email(&mut self, value: &str, field: &str, message: &str) -> &mut Self {
        self.check(is_valid_email(value), field, message)
    }

    pub fn min_chars(&mut self, value: &str, min: usize, field: &str, message: &str) -> &mut Self {
        self.check(value.chars().count() >= min, field, message)
    }

    pub fn push(&mut self, error: FieldError) -> &mut Self {
        self.errors.push(error);
        self
    }

    pub fn finish(&mut self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("  ada@example.com "));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn collects_every_failure_in_order() {
        let err = Validator::new()
            .required("  ", "username", "Username is required")
            .email("nope", "email", "Please include a valid email")
            .min_chars("12345", MIN_PASSWORD_LEN, "password", "Password must be 6 or more characters")
            .finish()
            .unwrap_err();

        match err {
            DomainError::Validation(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, ["username", "email", "password"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn optional_fields_only_fail_when_blank() {
        assert!(Validator::new()
            .optional_required(None, "location", "Location is required")
            .finish()
            .is_ok());
        assert!(Validator::new()
            .optional_required(Some(""), "location", "Location is required")
            .finish()
            .is_err());
    }

    #[test]
    fn password_length_counts_characters() {
        assert!(Validator::new()
            .min_chars("ééééé", MIN_PASSWORD_LEN, "password", "short")
            .finish()
            .is_err());
        assert!(Validator::new()
            .min_chars("éééééé", MIN_PASSWORD_LEN, "password", "short")
            .finish()
            .is_ok());
    }
}
