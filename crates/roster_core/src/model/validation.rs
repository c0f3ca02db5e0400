//! Field-level validation errors shared by roster entities.
//!
//! # Invariants
//! - Validation never mutates the value being checked.
//! - All failing fields are reported together, in declaration order.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*$")
        .expect("valid email regex")
});

/// One failing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field path as exposed on the wire, e.g. `email` or
    /// `courses[1].course_name`.
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn blank(field: &str) -> Self {
        Self::new(field, format!("{field} must not be blank"))
    }
}

/// Collected field errors for one validated value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Appends errors reported by a nested value under `prefix.`.
    pub(crate) fn merge_under(&mut self, prefix: &str, other: ValidationErrors) {
        self.errors
            .extend(other.errors.into_iter().map(|error| FieldError {
                field: format!("{prefix}.{}", error.field),
                message: error.message,
            }));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns whether any error was reported for `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    pub(crate) fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation failed:")?;
        for error in &self.errors {
            write!(f, " {}: {};", error.field, error.message)?;
        }
        Ok(())
    }
}

impl Error for ValidationErrors {}

pub(crate) fn require_not_blank(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::blank(field));
    }
}

pub(crate) fn require_max_chars(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    max_chars: usize,
) {
    if value.chars().count() > max_chars {
        errors.push(FieldError::new(
            field,
            format!("{field} must be at most {max_chars} characters"),
        ));
    }
}

pub(crate) fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}
