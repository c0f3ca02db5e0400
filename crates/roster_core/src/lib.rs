//! Core domain logic for the student roster.
//! This crate is the single source of truth for roster invariants.

pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::detail::StudentDetail;
pub use model::search::StudentSearchCondition;
pub use model::status::{ApplicationStatus, ApplicationStatusId, InvalidStatus, StatusType};
pub use model::student::{CourseId, Student, StudentCourse, StudentId};
pub use model::validation::{FieldError, ValidationErrors};
pub use repo::student_repo::{RepoError, RepoResult, SqliteStudentRepository, StudentRepository};
pub use service::converter::StudentConverter;
pub use service::student_service::{ServiceResult, StudentService, StudentServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
