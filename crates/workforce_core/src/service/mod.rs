//! Use-case services over one unit of work.
//!
//! # Responsibility
//! - Turn plain request records into entities and drive one unit of work.
//! - Report outcomes as row counts or booleans.
//!
//! # Invariants
//! - Services never bypass repository validation or staging.
//! - Every service call that writes ends with exactly one commit.

use crate::attachment::{AttachmentError, RejectReason};
use crate::repo::error::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod department_service;
pub mod employee_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    Repo(RepoError),
    Attachment(AttachmentError),
    /// The supplied attachment failed validation; nothing was staged.
    AttachmentRejected(RejectReason),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Attachment(err) => write!(f, "{err}"),
            Self::AttachmentRejected(reason) => write!(f, "attachment rejected: {reason}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Attachment(err) => Some(err),
            Self::AttachmentRejected(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<AttachmentError> for ServiceError {
    fn from(value: AttachmentError) -> Self {
        Self::Attachment(value)
    }
}
