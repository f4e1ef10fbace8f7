//! Employee record and its enumerated attributes.
//!
//! # Invariants
//! - `department_id` always references a department row; the store checks
//!   it when the owning unit of work commits.
//! - `image` holds an attachment storage key, never a filesystem path.

use crate::model::entity::{
    require_text, EntityId, HasLifecycleMetadata, Metadata, ValidationError,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const EMPLOYEE_NAME_MAX_CHARS: usize = 50;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{5,19}$").expect("valid phone regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeType {
    FullTime,
    PartTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(flatten)]
    pub meta: Metadata,
    pub name: String,
    pub age: Option<i32>,
    pub address: Option<String>,
    pub is_active: bool,
    pub salary: f64,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub hiring_date: NaiveDate,
    pub gender: Gender,
    pub employee_type: EmployeeType,
    pub department_id: EntityId,
    /// Storage key returned by the attachment service.
    pub image: Option<String>,
}

impl Employee {
    /// Creates an active employee with no optional attributes set.
    pub fn new(
        name: impl Into<String>,
        gender: Gender,
        employee_type: EmployeeType,
        department_id: EntityId,
        hiring_date: NaiveDate,
    ) -> Self {
        Self {
            meta: Metadata::default(),
            name: name.into(),
            age: None,
            address: None,
            is_active: true,
            salary: 0.0,
            email: None,
            phone_number: None,
            hiring_date,
            gender,
            employee_type,
            department_id,
            image: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, EMPLOYEE_NAME_MAX_CHARS)?;
        if self.age.is_some_and(|age| age < 0) {
            return Err(ValidationError::Negative { field: "age" });
        }
        if !self.salary.is_finite() {
            return Err(ValidationError::InvalidFormat { field: "salary" });
        }
        if self.salary < 0.0 {
            return Err(ValidationError::Negative { field: "salary" });
        }
        if let Some(email) = self.email.as_deref() {
            if !EMAIL_RE.is_match(email) {
                return Err(ValidationError::InvalidFormat { field: "email" });
            }
        }
        if let Some(phone) = self.phone_number.as_deref() {
            if !PHONE_RE.is_match(phone) {
                return Err(ValidationError::InvalidFormat {
                    field: "phone_number",
                });
            }
        }
        Ok(())
    }
}

impl HasLifecycleMetadata for Employee {
    fn metadata(&self) -> &Metadata {
        &self.meta
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::{Employee, EmployeeType, Gender};
    use crate::model::entity::ValidationError;
    use chrono::NaiveDate;

    fn sample() -> Employee {
        Employee::new(
            "Ahmed Nasr",
            Gender::Male,
            EmployeeType::FullTime,
            1,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
    }

    #[test]
    fn validate_accepts_well_formed_contact_fields() {
        let mut employee = sample();
        employee.email = Some("ahmed@example.com".to_string());
        employee.phone_number = Some("+20 100-555-0101".to_string());
        employee.age = Some(28);
        employee.salary = 12_000.0;
        assert!(employee.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_email_and_negative_salary() {
        let mut employee = sample();
        employee.email = Some("not-an-email".to_string());
        assert_eq!(
            employee.validate(),
            Err(ValidationError::InvalidFormat { field: "email" })
        );

        let mut employee = sample();
        employee.salary = -1.0;
        assert_eq!(
            employee.validate(),
            Err(ValidationError::Negative { field: "salary" })
        );
    }

    #[test]
    fn enums_serialize_as_snake_case() {
        let json = serde_json::to_string(&EmployeeType::PartTime).unwrap();
        assert_eq!(json, "\"part_time\"");
        let gender: Gender = serde_json::from_str("\"female\"").unwrap();
        assert_eq!(gender, Gender::Female);
    }
}
