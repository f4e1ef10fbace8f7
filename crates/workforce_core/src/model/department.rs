//! Department record.

use crate::model::entity::{require_text, HasLifecycleMetadata, Metadata, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEPARTMENT_CODE_MAX_CHARS: usize = 20;
pub const DEPARTMENT_NAME_MAX_CHARS: usize = 50;

/// Organizational unit that employees belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    #[serde(flatten)]
    pub meta: Metadata,
    /// Short business code, e.g. `D1`.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    /// Business date the department was founded, unrelated to audit stamps.
    pub creation_date: NaiveDate,
}

impl Department {
    pub fn new(code: impl Into<String>, name: impl Into<String>, creation_date: NaiveDate) -> Self {
        Self {
            meta: Metadata::default(),
            code: code.into(),
            name: name.into(),
            description: None,
            creation_date,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("code", &self.code, DEPARTMENT_CODE_MAX_CHARS)?;
        require_text("name", &self.name, DEPARTMENT_NAME_MAX_CHARS)?;
        Ok(())
    }
}

impl HasLifecycleMetadata for Department {
    fn metadata(&self) -> &Metadata {
        &self.meta
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }
}
