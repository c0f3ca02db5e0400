//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Assemble aggregates from flat rows.

pub mod converter;
pub mod student_service;
