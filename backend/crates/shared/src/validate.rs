//! Form Validation - field-error accumulator and rule predicates
//!
//! [`Validator`] collects validation failures keyed by form field. Form
//! types hold one by composition and re-render the collected errors next
//! to the offending inputs.
//!
//! Rule predicates are pure functions over a value; they never mutate
//! state, so new rules can be added without touching the accumulator.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Sanity check pattern for email addresses (HTML5 input type=email).
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email regex is valid")
});

/// Field-error accumulator
///
/// One error per field is retained: the first failing check wins, later
/// failures for the same field are no-ops. Errors not attributable to a
/// single field (e.g. "Email or password is incorrect") are collected
/// separately.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Validator {
    /// Field name -> first error message recorded for that field
    pub field_errors: BTreeMap<String, String>,
    /// Errors that do not belong to a single field
    pub non_field_errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff no errors have been recorded.
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    /// Record `message` under `field` unless the field already has an error.
    pub fn add_field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.field_errors
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    /// Record a form-level error message.
    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field_errors.push(message.into());
    }

    /// Record `message` under `field` when `valid` is false.
    pub fn check_field(&mut self, valid: bool, field: impl Into<String>, message: impl Into<String>) {
        if !valid {
            self.add_field_error(field, message);
        }
    }

    /// Look up the error recorded for a field, if any.
    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors.get(field).map(String::as_str)
    }
}

// ============================================================================
// Rule predicates
// ============================================================================

/// True when the value contains at least one non-whitespace character.
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True when the value is at most `n` characters (not bytes) long.
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// True when the value is at least `n` characters long.
pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

/// True when the value equals one of the permitted values.
pub fn permitted_value<T: PartialEq>(value: T, permitted: &[T]) -> bool {
    permitted.contains(&value)
}

/// True when the value matches the pattern.
pub fn matches(value: &str, pattern: &Regex) -> bool {
    pattern.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_iff_no_errors() {
        let mut v = Validator::new();
        assert!(v.valid());

        v.check_field(true, "title", "never recorded");
        assert!(v.valid());

        v.check_field(false, "title", "Title cannot be blank");
        assert!(!v.valid());
        assert_eq!(v.field_error("title"), Some("Title cannot be blank"));
    }

    #[test]
    fn test_first_error_wins_per_field() {
        let mut v = Validator::new();
        v.check_field(false, "title", "first");
        v.check_field(false, "title", "second");
        assert_eq!(v.field_error("title"), Some("first"));
        assert_eq!(v.field_errors.len(), 1);
    }

    #[test]
    fn test_fields_are_independent() {
        let mut v = Validator::new();
        v.check_field(false, "content", "content error");
        v.check_field(false, "title", "title error");
        assert_eq!(v.field_error("title"), Some("title error"));
        assert_eq!(v.field_error("content"), Some("content error"));
        assert_eq!(v.field_errors.len(), 2);
    }

    #[test]
    fn test_add_field_error_append_if_absent() {
        let mut v = Validator::new();
        v.add_field_error("email", "Email address is already in use");
        v.add_field_error("email", "ignored");
        assert_eq!(
            v.field_error("email"),
            Some("Email address is already in use")
        );
    }

    #[test]
    fn test_non_field_errors() {
        let mut v = Validator::new();
        v.add_non_field_error("Email or password is incorrect");
        assert!(!v.valid());
        assert!(v.field_errors.is_empty());
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("hello"));
        assert!(!not_blank(""));
        assert!(!not_blank("   \t\n"));
    }

    #[test]
    fn test_char_counts_not_bytes() {
        // 4 characters, 12 bytes
        assert!(max_chars("日本語だ", 4));
        assert!(!max_chars("日本語だ", 3));
        assert!(min_chars("日本語だ", 4));
        assert!(!min_chars("日本語だ", 5));
    }

    #[test]
    fn test_permitted_value() {
        assert!(permitted_value(7, &[1, 7, 365]));
        assert!(!permitted_value(2, &[1, 7, 365]));
    }

    #[test]
    fn test_email_pattern() {
        assert!(matches("alice@example.com", &EMAIL_RX));
        assert!(matches("bob.smith+tag@sub.example.co.uk", &EMAIL_RX));
        assert!(!matches("not-an-email", &EMAIL_RX));
        assert!(!matches("missing@tld@twice.com", &EMAIL_RX));
    }
}
