//! Student use-case service.
//!
//! # Responsibility
//! - Provide list, profile, register, update and search entry points.
//! - Assign identifiers and derive course timestamps at registration.
//! - Wrap aggregate writes in one store transaction.
//!
//! # Invariants
//! - Validation and range checks run before any repository call.
//! - `register` and `update` either fully commit or fully roll back.
//! - `update` never reassigns identifiers; unmatched ids are ignored.
//! - Service layer remains storage-agnostic.

use crate::clock::{Clock, SystemClock};
use crate::model::detail::StudentDetail;
use crate::model::search::StudentSearchCondition;
use crate::model::student::{Student, StudentId};
use crate::model::validation::ValidationErrors;
use crate::repo::student_repo::{RepoError, StudentRepository};
use crate::service::converter::StudentConverter;
use chrono::Months;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Length of a course counted from its registration time.
pub const COURSE_DURATION_MONTHS: u32 = 6;

pub type ServiceResult<T> = Result<T, StudentServiceError>;

/// Service error for student use-cases.
#[derive(Debug)]
pub enum StudentServiceError {
    /// Field-level input errors; nothing was persisted.
    Validation(ValidationErrors),
    /// Search condition has `min_age > max_age`; the store was not queried.
    InvalidRange { min_age: u32, max_age: u32 },
    /// Target student does not exist.
    StudentNotFound(StudentId),
    /// Persistence-layer failure, including constraint violations.
    Repo(RepoError),
    /// Derived value could not be computed.
    InconsistentState(&'static str),
}

impl StudentServiceError {
    /// Returns whether the store rejected a write on a constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::Repo(RepoError::Constraint(_)))
    }
}

impl Display for StudentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidRange { min_age, max_age } => write!(
                f,
                "min_age ({min_age}) must be less than or equal to max_age ({max_age})"
            ),
            Self::StudentNotFound(id) => write!(f, "student not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent student state: {details}"),
        }
    }
}

impl Error for StudentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StudentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::StudentNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationErrors> for StudentServiceError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

/// Student service facade over a repository and a clock.
pub struct StudentService<R: StudentRepository, C: Clock = SystemClock> {
    repo: R,
    clock: C,
}

impl<R: StudentRepository> StudentService<R> {
    /// Creates a service that stamps courses with the system clock.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, SystemClock)
    }
}

impl<R: StudentRepository, C: Clock> StudentService<R, C> {
    /// Creates a service with an explicit time source.
    pub fn with_clock(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Returns the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Lists every active student with its courses and statuses.
    pub fn list_details(&self) -> ServiceResult<Vec<StudentDetail>> {
        timed("student_list", || {
            let students = self.repo.find_all_students()?;
            let courses = self.repo.find_all_courses()?;
            debug!(
                "event=student_list module=service status=loaded students={} courses={}",
                students.len(),
                courses.len()
            );
            Ok(StudentConverter::convert(students, courses))
        })
    }

    /// Loads one student with its courses and each course's status.
    ///
    /// A course without a status row keeps `application_status = None`.
    pub fn get_profile(&self, id: StudentId) -> ServiceResult<StudentDetail> {
        timed("student_profile", || {
            let student = self.repo.find_student_by_id(id)?;
            let mut courses = self.repo.find_courses_by_student_id(id)?;
            for course in &mut courses {
                course.application_status = match course.id {
                    Some(course_id) => self.repo.find_status_by_course_id(course_id)?,
                    None => None,
                };
            }
            Ok(StudentDetail::new(student, courses))
        })
    }

    /// Registers a student with all of its courses and statuses.
    ///
    /// # Contract
    /// - Assigns a fresh v4 id to the student and to every attached status.
    /// - Stamps each course with `start_at = now` and `end_at = now + 6 months`.
    /// - Writes are atomic; any failure leaves no rows behind.
    /// - Returns the input detail populated with generated values.
    pub fn register(&self, mut detail: StudentDetail) -> ServiceResult<StudentDetail> {
        detail.validate()?;

        let start_at = self.clock.now();
        let end_at = start_at
            .checked_add_months(Months::new(COURSE_DURATION_MONTHS))
            .ok_or(StudentServiceError::InconsistentState(
                "course end timestamp out of range",
            ))?;

        let student_id = Uuid::new_v4();
        detail.student.id = Some(student_id);
        detail.student.deleted = false;

        self.in_transaction("student_register", |repo| {
            repo.insert_student(&detail.student)?;

            for course in &mut detail.courses {
                course.student_id = Some(student_id);
                course.start_at = Some(start_at);
                course.end_at = Some(end_at);
                let course_id = repo.insert_course(course)?;
                course.id = Some(course_id);

                if let Some(status) = course.application_status.as_mut() {
                    status.id = Some(Uuid::new_v4());
                    status.student_course_id = Some(course_id);
                    repo.insert_status(status)?;
                }
            }
            Ok(())
        })?;

        Ok(detail)
    }

    /// Updates a student, its courses and their statuses by existing ids.
    ///
    /// Rows whose id matches nothing are skipped without error.
    pub fn update(&self, detail: &StudentDetail) -> ServiceResult<()> {
        detail.validate()?;

        self.in_transaction("student_update", |repo| {
            if !repo.update_student(&detail.student)? {
                debug!("event=student_update module=service status=skip target=student");
            }
            for course in &detail.courses {
                if !repo.update_course(course)? {
                    debug!("event=student_update module=service status=skip target=course");
                }
                if let Some(status) = course.application_status.as_ref() {
                    if !repo.update_status(status)? {
                        debug!("event=student_update module=service status=skip target=status");
                    }
                }
            }
            Ok(())
        })
    }

    /// Searches students matching every present filter.
    ///
    /// # Errors
    /// - `Validation` for malformed filters.
    /// - `InvalidRange` when `min_age > max_age`.
    pub fn search(&self, condition: &StudentSearchCondition) -> ServiceResult<Vec<Student>> {
        timed("student_search", || {
            condition.validate()?;
            if let Some((min_age, max_age)) = condition.reversed_age_range() {
                return Err(StudentServiceError::InvalidRange { min_age, max_age });
            }
            let found = self.repo.search_students(condition)?;
            debug!(
                "event=student_search module=service status=loaded students={}",
                found.len()
            );
            Ok(found)
        })
    }

    fn in_transaction<T>(
        &self,
        event: &'static str,
        work: impl FnOnce(&R) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        timed(event, || {
            self.repo.begin()?;
            let outcome = work(&self.repo).and_then(|value| {
                self.repo.commit()?;
                Ok(value)
            });
            if outcome.is_err() {
                if let Err(rollback_err) = self.repo.rollback() {
                    warn!(
                        "event={event} module=service status=rollback_failed error={rollback_err}"
                    );
                }
            }
            outcome
        })
    }
}

/// Runs one service operation, logging start, outcome and duration.
fn timed<T>(
    event: &'static str,
    work: impl FnOnce() -> ServiceResult<T>,
) -> ServiceResult<T> {
    let started_at = Instant::now();
    debug!("event={event} module=service status=start");

    let outcome = work();
    let duration_ms = started_at.elapsed().as_millis();
    match &outcome {
        Ok(_) => info!("event={event} module=service status=ok duration_ms={duration_ms}"),
        Err(err) => warn!(
            "event={event} module=service status=error duration_ms={duration_ms} error={err}"
        ),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::{timed, StudentServiceError};

    #[test]
    fn timed_passes_the_outcome_through() {
        assert_eq!(timed("student_list", || Ok(3)).ok(), Some(3));

        let err = timed::<()>("student_search", || {
            Err(StudentServiceError::InvalidRange {
                min_age: 40,
                max_age: 20,
            })
        })
        .unwrap_err();
        assert!(matches!(
            err,
            StudentServiceError::InvalidRange {
                min_age: 40,
                max_age: 20
            }
        ));
    }
}
