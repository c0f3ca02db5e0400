//! Flat row to aggregate conversion.
//!
//! # Invariants
//! - Output order follows the input student order.
//! - Courses keep their relative input order within each student.
//! - A student without courses yields an empty course list.

use crate::model::detail::StudentDetail;
use crate::model::student::{Student, StudentCourse, StudentId};
use std::collections::HashMap;

/// Joins independently queried students and courses into `StudentDetail`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct StudentConverter;

impl StudentConverter {
    /// Groups `courses` under the student whose id equals the course's
    /// `student_id`. Courses that match no student are dropped.
    pub fn convert(students: Vec<Student>, courses: Vec<StudentCourse>) -> Vec<StudentDetail> {
        let mut by_student: HashMap<StudentId, Vec<StudentCourse>> = HashMap::new();
        for course in courses {
            if let Some(student_id) = course.student_id {
                by_student.entry(student_id).or_default().push(course);
            }
        }

        students
            .into_iter()
            .map(|student| {
                let courses = student
                    .id
                    .and_then(|id| by_student.get(&id).cloned())
                    .unwrap_or_default();
                StudentDetail::new(student, courses)
            })
            .collect()
    }
}
