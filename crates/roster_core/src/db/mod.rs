//! Roster store: connection bootstrap and schema versioning.
//!
//! Connections returned from [`open_db`] and [`open_db_in_memory`] carry the
//! student, course and status tables at [`migrations::latest_version`].
//! Repositories check the version again in `try_new`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or migrating the roster store.
#[derive(Debug)]
pub enum DbError {
    /// Driver error outside of a migration step.
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build; it is left untouched.
    SchemaTooNew { found: u32, supported: u32 },
    /// Migration `version` failed; earlier pending steps were rolled back too.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "roster store error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "roster store is at schema {found}, this build supports up to {supported}"
            ),
            Self::Migration { version, source } => {
                write!(f, "roster schema migration {version} failed: {source}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
