//! Student and student course records.
//!
//! # Responsibility
//! - Define the persisted student and course shapes.
//! - Provide field validation and soft-delete helpers.
//!
//! # Invariants
//! - `Student::id` is assigned by the service at registration.
//! - `StudentCourse::student_id`, `start_at` and `end_at` are unset until
//!   registration populates them.
//! - A course owns at most one application status.

use crate::model::status::ApplicationStatus;
use crate::model::validation::{
    is_valid_email, require_not_blank, FieldError, ValidationErrors,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a student.
pub type StudentId = Uuid;

/// Store-assigned identifier for a student course row.
pub type CourseId = i64;

/// Youngest age accepted for a student.
pub const MIN_STUDENT_AGE: u32 = 15;

/// Student record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Student {
    pub id: Option<StudentId>,
    pub name: String,
    /// Phonetic (kana) reading of `name`.
    pub kana_name: String,
    pub nickname: Option<String>,
    pub email: String,
    pub area: String,
    pub age: u32,
    pub sex: String,
    pub remark: Option<String>,
    /// Soft delete marker. Deleted students are excluded from full listings.
    pub deleted: bool,
}

impl Student {
    /// Marks this student as softly deleted.
    pub fn soft_delete(&mut self) {
        self.deleted = true;
    }

    /// Clears the soft delete marker.
    pub fn restore(&mut self) {
        self.deleted = false;
    }

    pub fn is_active(&self) -> bool {
        !self.deleted
    }

    /// Checks required fields, email shape and minimum age.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        require_not_blank(&mut errors, "name", &self.name);
        require_not_blank(&mut errors, "kana_name", &self.kana_name);
        if self.email.trim().is_empty() {
            errors.push(FieldError::blank("email"));
        } else if !is_valid_email(&self.email) {
            errors.push(FieldError::new("email", "email must be a valid address"));
        }
        require_not_blank(&mut errors, "area", &self.area);
        if self.age < MIN_STUDENT_AGE {
            errors.push(FieldError::new(
                "age",
                format!("age must be at least {MIN_STUDENT_AGE}"),
            ));
        }
        require_not_blank(&mut errors, "sex", &self.sex);
        errors.into_result()
    }
}

/// One course a student is enrolled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentCourse {
    pub id: Option<CourseId>,
    pub student_id: Option<StudentId>,
    pub course_name: String,
    pub start_at: Option<NaiveDateTime>,
    pub end_at: Option<NaiveDateTime>,
    pub application_status: Option<ApplicationStatus>,
}

impl StudentCourse {
    /// Creates an unregistered course with no status.
    pub fn new(course_name: impl Into<String>) -> Self {
        Self {
            course_name: course_name.into(),
            ..Self::default()
        }
    }

    /// Attaches an application status, replacing any previous one.
    pub fn with_status(mut self, status: ApplicationStatus) -> Self {
        self.application_status = Some(status);
        self
    }

    /// Checks the course name and, when present, the attached status.
    ///
    /// Status errors are reported under `application_status.`.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        require_not_blank(&mut errors, "course_name", &self.course_name);
        if let Some(status) = self.application_status.as_ref() {
            if let Err(nested) = status.validate() {
                errors.merge_under("application_status", nested);
            }
        }
        errors.into_result()
    }
}
