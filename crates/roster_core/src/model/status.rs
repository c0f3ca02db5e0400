//! Application status catalog and entity.
//!
//! # Responsibility
//! - Define the closed set of application statuses and their integer codes.
//! - Keep a status label and status code synchronized through explicit mutators.
//!
//! # Invariants
//! - Codes are stable: provisional=1, confirmed=2, in-progress=3, completed=4.
//! - `set_label` always re-derives the code; unknown labels map to code `0`.
//! - `set_code` re-derives the label only for known codes. An unknown code
//!   leaves the previous label in place, so label and code may disagree until
//!   the next `set_label`.

use crate::model::student::CourseId;
use crate::model::validation::{FieldError, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for a persisted application status row.
pub type ApplicationStatusId = Uuid;

/// Code stored when a label does not name any known status.
pub const UNKNOWN_STATUS_CODE: i32 = 0;

/// Closed catalog of application statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusType {
    /// 仮申込
    Provisional,
    /// 本申込
    Confirmed,
    /// 受講中
    InProgress,
    /// 受講終了
    Completed,
}

impl StatusType {
    /// All variants in code order.
    pub const ALL: [StatusType; 4] = [
        StatusType::Provisional,
        StatusType::Confirmed,
        StatusType::InProgress,
        StatusType::Completed,
    ];

    /// Returns the stable integer code (1-4).
    pub fn code(self) -> i32 {
        match self {
            Self::Provisional => 1,
            Self::Confirmed => 2,
            Self::InProgress => 3,
            Self::Completed => 4,
        }
    }

    /// Returns the canonical label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Provisional => "仮申込",
            Self::Confirmed => "本申込",
            Self::InProgress => "受講中",
            Self::Completed => "受講終了",
        }
    }

    /// Looks up a variant by code. Unknown codes return `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    /// Converts a label to its code.
    ///
    /// # Errors
    /// - Returns `InvalidStatus` when `label` is not one of the four labels.
    pub fn to_code(label: &str) -> Result<i32, InvalidStatus> {
        label.parse::<Self>().map(Self::code)
    }
}

impl FromStr for StatusType {
    type Err = InvalidStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.label() == value)
            .ok_or_else(|| InvalidStatus(value.to_string()))
    }
}

impl Display for StatusType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Label does not name any `StatusType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStatus(pub String);

impl Display for InvalidStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid application status: `{}`", self.0)
    }
}

impl Error for InvalidStatus {}

/// Application status attached to one student course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ApplicationStatusWire", into = "ApplicationStatusWire")]
pub struct ApplicationStatus {
    /// Assigned by the registering side; `None` until registered.
    pub id: Option<ApplicationStatusId>,
    /// Owning course; `None` until the course row exists.
    pub student_course_id: Option<CourseId>,
    label: Option<String>,
    code: i32,
}

impl ApplicationStatus {
    /// Creates an unregistered status from a catalog variant.
    pub fn from_variant(status: StatusType) -> Self {
        let mut value = Self::default();
        value.set_variant(status);
        value
    }

    /// Creates an unregistered status from free-form label text.
    pub fn from_label(label: impl Into<String>) -> Self {
        let mut value = Self::default();
        value.set_label(label);
        value
    }

    /// Stores `label` verbatim and re-derives the code.
    ///
    /// Unknown labels set the code to `0` without failing; use
    /// [`ApplicationStatus::validate`] to reject them.
    pub fn set_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        self.code = StatusType::to_code(&label).unwrap_or(UNKNOWN_STATUS_CODE);
        self.label = Some(label);
    }

    /// Stores `code` verbatim and re-derives the label for known codes.
    ///
    /// Unknown codes leave the current label untouched.
    pub fn set_code(&mut self, code: i32) {
        self.code = code;
        if let Some(status) = StatusType::from_code(code) {
            self.label = Some(status.label().to_string());
        }
    }

    /// Sets label and code together from a catalog variant.
    pub fn set_variant(&mut self, status: StatusType) {
        self.label = Some(status.label().to_string());
        self.code = status.code();
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    /// Parses the current label into a variant.
    ///
    /// # Errors
    /// - Returns `InvalidStatus` when the label is unset or unknown.
    pub fn variant(&self) -> Result<StatusType, InvalidStatus> {
        match self.label.as_deref() {
            Some(label) => label.parse(),
            None => Err(InvalidStatus(String::new())),
        }
    }

    /// Looks up the variant for the current code. Never fails.
    pub fn variant_by_code(&self) -> Option<StatusType> {
        StatusType::from_code(self.code)
    }

    /// Checks that the label names a known status and that the code agrees
    /// with it.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        match self.label.as_deref() {
            None => errors.push(FieldError::blank("status")),
            Some(label) if label.trim().is_empty() => errors.push(FieldError::blank("status")),
            Some(label) => match label.parse::<StatusType>() {
                Err(_) => errors.push(FieldError::new(
                    "status",
                    "status must be one of 仮申込|本申込|受講中|受講終了",
                )),
                Ok(status) if self.variant_by_code() != Some(status) => {
                    errors.push(FieldError::new(
                        "status_code",
                        format!(
                            "status_code {} does not match status {label} ({})",
                            self.code,
                            status.code()
                        ),
                    ))
                }
                Ok(_) => {}
            },
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ApplicationStatusWire {
    #[serde(default)]
    id: Option<ApplicationStatusId>,
    #[serde(default)]
    student_course_id: Option<CourseId>,
    #[serde(default)]
    status_code: i32,
    #[serde(default)]
    status: Option<String>,
}

impl From<ApplicationStatusWire> for ApplicationStatus {
    fn from(wire: ApplicationStatusWire) -> Self {
        let mut value = Self {
            id: wire.id,
            student_course_id: wire.student_course_id,
            ..Self::default()
        };
        // Label wins when both are present.
        match wire.status {
            Some(label) => value.set_label(label),
            None => value.set_code(wire.status_code),
        }
        value
    }
}

impl From<ApplicationStatus> for ApplicationStatusWire {
    fn from(value: ApplicationStatus) -> Self {
        Self {
            id: value.id,
            student_course_id: value.student_course_id,
            status_code: value.code,
            status: value.label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplicationStatus, StatusType, UNKNOWN_STATUS_CODE};

    #[test]
    fn unknown_code_keeps_stale_label() {
        let mut status = ApplicationStatus::from_variant(StatusType::Confirmed);
        status.set_code(42);

        assert_eq!(status.code(), 42);
        assert_eq!(status.label(), Some("本申込"));
        assert_eq!(status.variant_by_code(), None);
        assert_eq!(status.variant(), Ok(StatusType::Confirmed));
    }

    #[test]
    fn default_status_has_no_label_and_sentinel_code() {
        let status = ApplicationStatus::default();
        assert_eq!(status.label(), None);
        assert_eq!(status.code(), UNKNOWN_STATUS_CODE);
        assert!(status.variant().is_err());
    }
}
