//! Conditional student search input.
//!
//! # Invariants
//! - Every field is optional; an empty condition matches every student.
//! - Blank strings are treated as absent by [`StudentSearchCondition::normalized`].
//! - The age range check is a service concern, not a field check.

use crate::model::validation::{is_valid_email, require_max_chars, FieldError, ValidationErrors};
use serde::{Deserialize, Serialize};

/// Longest accepted `name`, `area` and `course_name` filter.
pub const SEARCH_TEXT_MAX_CHARS: usize = 100;
/// Largest accepted age bound.
pub const SEARCH_AGE_MAX: u32 = 150;

/// Optional filters for student search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentSearchCondition {
    pub name: Option<String>,
    pub email: Option<String>,
    pub area: Option<String>,
    pub deleted: Option<bool>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub sex: Option<String>,
    pub course_name: Option<String>,
    /// Application status label, matched exactly.
    pub status: Option<String>,
}

impl StudentSearchCondition {
    /// Returns a copy with blank text filters dropped and the rest trimmed.
    pub fn normalized(&self) -> Self {
        Self {
            name: normalize_text(self.name.as_deref()),
            email: normalize_text(self.email.as_deref()),
            area: normalize_text(self.area.as_deref()),
            deleted: self.deleted,
            min_age: self.min_age,
            max_age: self.max_age,
            sex: normalize_text(self.sex.as_deref()),
            course_name: normalize_text(self.course_name.as_deref()),
            status: normalize_text(self.status.as_deref()),
        }
    }

    /// Returns `(min, max)` when both bounds are present and reversed.
    pub fn reversed_age_range(&self) -> Option<(u32, u32)> {
        match (self.min_age, self.max_age) {
            (Some(min), Some(max)) if min > max => Some((min, max)),
            _ => None,
        }
    }

    /// Checks text lengths, email shape and age bounds.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(name) = self.name.as_deref() {
            require_max_chars(&mut errors, "name", name, SEARCH_TEXT_MAX_CHARS);
        }
        if let Some(email) = self.email.as_deref() {
            if !email.trim().is_empty() && !is_valid_email(email.trim()) {
                errors.push(FieldError::new("email", "email must be a valid address"));
            }
        }
        if let Some(area) = self.area.as_deref() {
            require_max_chars(&mut errors, "area", area, SEARCH_TEXT_MAX_CHARS);
        }
        for (field, bound) in [("min_age", self.min_age), ("max_age", self.max_age)] {
            if let Some(value) = bound {
                if value > SEARCH_AGE_MAX {
                    errors.push(FieldError::new(
                        field,
                        format!("{field} must be at most {SEARCH_AGE_MAX}"),
                    ));
                }
            }
        }
        if let Some(course_name) = self.course_name.as_deref() {
            require_max_chars(
                &mut errors,
                "course_name",
                course_name,
                SEARCH_TEXT_MAX_CHARS,
            );
        }
        errors.into_result()
    }
}

fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
