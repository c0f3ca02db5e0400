//! Roster domain model.
//!
//! # Responsibility
//! - Define students, courses and application statuses as plain records.
//! - Own field validation and the status label/code synchronization rule.
//!
//! # Invariants
//! - Entities hold no back-references; parents are linked by id fields only.
//! - Deletion is a soft-delete flag on `Student`, never a physical delete.

pub mod detail;
pub mod search;
pub mod status;
pub mod student;
pub mod validation;
