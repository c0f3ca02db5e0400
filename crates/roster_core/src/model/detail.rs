//! Student aggregate assembled on demand.
//!
//! A `StudentDetail` is never persisted as a unit. It is rebuilt per request
//! from independently queried student, course and status rows.

use crate::model::student::{Student, StudentCourse};
use crate::model::validation::ValidationErrors;
use serde::{Deserialize, Serialize};

/// One student with its ordered course list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDetail {
    pub student: Student,
    #[serde(default)]
    pub courses: Vec<StudentCourse>,
}

impl StudentDetail {
    pub fn new(student: Student, courses: Vec<StudentCourse>) -> Self {
        Self { student, courses }
    }

    /// Validates the student, every course and every attached status.
    ///
    /// Field paths are rooted at the aggregate: `student.email`,
    /// `courses[1].course_name`, `courses[0].application_status.status`.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Err(nested) = self.student.validate() {
            errors.merge_under("student", nested);
        }
        for (index, course) in self.courses.iter().enumerate() {
            if let Err(nested) = course.validate() {
                errors.merge_under(&format!("courses[{index}]"), nested);
            }
        }
        errors.into_result()
    }
}
