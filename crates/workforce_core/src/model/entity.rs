//! Identity, audit and tombstone metadata shared by all records.
//!
//! # Invariants
//! - `id` is assigned by the store on insert and never changes afterwards.
//! - `created` is written once; `last_modified` moves on every write.
//! - `created.on <= last_modified.on` whenever both are present.
//! - `is_deleted` is the source of truth for visibility.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-generated surrogate key.
pub type EntityId = i64;

/// Identity of the actor that performed a write.
pub type ActorId = i64;

/// Who wrote a record, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    pub by: ActorId,
    pub on: DateTime<Utc>,
}

impl AuditStamp {
    pub fn new(by: ActorId, on: DateTime<Utc>) -> Self {
        Self { by, on }
    }
}

/// Lifecycle block embedded in every persisted record.
///
/// Freshly constructed records have no id and no stamps; repositories fill
/// them in when a write is staged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub id: Option<EntityId>,
    pub is_deleted: bool,
    pub created: Option<AuditStamp>,
    pub last_modified: Option<AuditStamp>,
}

impl Metadata {
    /// Marks the owning record as softly deleted.
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    /// Clears the soft delete flag.
    pub fn restore(&mut self) {
        self.is_deleted = false;
    }

    /// Returns whether the owning record is visible on default read paths.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    pub fn created_by(&self) -> Option<ActorId> {
        self.created.map(|stamp| stamp.by)
    }

    pub fn created_on(&self) -> Option<DateTime<Utc>> {
        self.created.map(|stamp| stamp.on)
    }

    pub fn last_modified_by(&self) -> Option<ActorId> {
        self.last_modified.map(|stamp| stamp.by)
    }

    pub fn last_modified_on(&self) -> Option<DateTime<Utc>> {
        self.last_modified.map(|stamp| stamp.on)
    }
}

/// Capability set shared by every persisted record.
pub trait HasLifecycleMetadata {
    fn metadata(&self) -> &Metadata;
    fn metadata_mut(&mut self) -> &mut Metadata;

    fn id(&self) -> Option<EntityId> {
        self.metadata().id
    }

    fn is_deleted(&self) -> bool {
        self.metadata().is_deleted
    }
}

/// Field-level validation failure raised before a write is staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Required { field: &'static str },
    TooLong { field: &'static str, max: usize },
    Negative { field: &'static str },
    InvalidFormat { field: &'static str },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required { field } => write!(f, "`{field}` is required"),
            Self::TooLong { field, max } => {
                write!(f, "`{field}` must be at most {max} characters")
            }
            Self::Negative { field } => write!(f, "`{field}` must not be negative"),
            Self::InvalidFormat { field } => write!(f, "`{field}` has an invalid format"),
        }
    }
}

impl Error for ValidationError {}

/// Checks a required text field against a character limit.
pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Current time truncated to the millisecond precision the store keeps.
pub(crate) fn audit_now() -> DateTime<Utc> {
    let now = Utc::now();
    millis_to_datetime(now.timestamp_millis()).unwrap_or(now)
}

pub(crate) fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
