//! Department mapping and department-specific reads.

use crate::model::department::Department;
use crate::model::entity::{Metadata, ValidationError};
use crate::repo::entity::{optional_text, Entity};
use crate::repo::error::RepoResult;
use crate::repo::query::Query;
use crate::repo::repository::Repository;
use rusqlite::types::Value;
use rusqlite::Row;

pub type DepartmentRepository = Repository<Department>;

impl Entity for Department {
    const TABLE: &'static str = "departments";
    const COLUMNS: &'static [&'static str] = &["code", "name", "description", "creation_date"];

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.code.clone()),
            Value::Text(self.name.clone()),
            optional_text(self.description.as_deref()),
            Value::Text(self.creation_date.format("%Y-%m-%d").to_string()),
        ]
    }

    fn from_row(row: &Row<'_>, meta: Metadata) -> RepoResult<Self> {
        Ok(Self {
            meta,
            code: row.get("code")?,
            name: row.get("name")?,
            description: row.get("description")?,
            creation_date: row.get("creation_date")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Department::validate(self)
    }
}

impl Repository<Department> {
    /// Visible department with exactly this code.
    pub fn find_by_code(&self, code: &str) -> RepoResult<Option<Department>> {
        self.query()
            .filter("code = ?", [Value::Text(code.to_string())])
            .fetch_optional()
    }

    /// Case-insensitive substring match on code or name.
    ///
    /// An empty term matches every visible department.
    pub fn search(&self, term: &str) -> Query<Department> {
        if term.is_empty() {
            return self.query();
        }
        self.query().filter(
            "instr(unicode_lower(code), unicode_lower(?)) > 0 \
             OR instr(unicode_lower(name), unicode_lower(?)) > 0",
            [Value::Text(term.to_string()), Value::Text(term.to_string())],
        )
    }
}
