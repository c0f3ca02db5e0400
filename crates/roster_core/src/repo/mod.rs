//! Persistence port and storage adapters.
//!
//! # Responsibility
//! - Define the read/write contract the service layer depends on.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `Constraint`) in
//!   addition to transport errors.

pub mod student_repo;
