//! Repository error taxonomy.

use crate::db::DbError;
use crate::model::entity::{EntityId, ValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for staging, reading and committing through a unit of work.
///
/// Absence is not an error: lookups that find nothing return `Ok(None)`.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// An update targeted an id with no stored row.
    NotFound(EntityId),
    /// `add` was called with an entity that already has a store id.
    AlreadyPersisted(EntityId),
    /// `update`/`delete` was called with an entity that was never added.
    NotPersisted,
    InvalidData(String),
    /// The owning unit of work has been closed.
    SessionClosed,
    SessionPoisoned,
    /// A blocking read could not be joined back onto the async caller.
    Task(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::AlreadyPersisted(id) => write!(f, "record already persisted with id {id}"),
            Self::NotPersisted => write!(f, "record has no store id yet"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::SessionClosed => write!(f, "unit of work session is closed"),
            Self::SessionPoisoned => write!(f, "unit of work session lock is poisoned"),
            Self::Task(message) => write!(f, "blocking store task failed: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    /// Returns whether the store rejected the write on a constraint
    /// (foreign key, check, not-null, unique).
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _))) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}
