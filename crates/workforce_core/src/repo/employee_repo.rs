//! Employee mapping and employee-specific reads.
//!
//! # Invariants
//! - Reads that expose a department name always join `departments`.
//! - Name search is a case-insensitive (Unicode) substring match; an
//!   empty term matches every visible employee. Terms are used verbatim,
//!   surrounding whitespace included.

use crate::model::employee::{Employee, EmployeeType, Gender};
use crate::model::entity::{EntityId, Metadata, ValidationError};
use crate::repo::entity::{
    bool_to_int, int_to_bool, optional_text, read_entity, select_list, Entity,
};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::query::Query;
use crate::repo::repository::Repository;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

pub type EmployeeRepository = Repository<Employee>;

/// Employee read model with its department eagerly joined.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeWithDepartment {
    pub employee: Employee,
    /// `None` only if the referenced department row is missing.
    pub department_name: Option<String>,
}

impl Entity for Employee {
    const TABLE: &'static str = "employees";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "age",
        "address",
        "is_active",
        "salary",
        "email",
        "phone_number",
        "hiring_date",
        "gender",
        "employee_type",
        "department_id",
        "image",
    ];

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            self.age.map_or(Value::Null, |age| Value::Integer(i64::from(age))),
            optional_text(self.address.as_deref()),
            Value::Integer(bool_to_int(self.is_active)),
            Value::Real(self.salary),
            optional_text(self.email.as_deref()),
            optional_text(self.phone_number.as_deref()),
            Value::Text(self.hiring_date.format("%Y-%m-%d").to_string()),
            Value::Text(gender_to_db(self.gender).to_string()),
            Value::Text(employee_type_to_db(self.employee_type).to_string()),
            Value::Integer(self.department_id),
            optional_text(self.image.as_deref()),
        ]
    }

    fn from_row(row: &Row<'_>, meta: Metadata) -> RepoResult<Self> {
        let gender_text: String = row.get("gender")?;
        let gender = parse_gender(&gender_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid gender `{gender_text}` in employees.gender"))
        })?;

        let type_text: String = row.get("employee_type")?;
        let employee_type = parse_employee_type(&type_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid employee type `{type_text}` in employees.employee_type"
            ))
        })?;

        Ok(Self {
            meta,
            name: row.get("name")?,
            age: row.get("age")?,
            address: row.get("address")?,
            is_active: int_to_bool(row.get("is_active")?, Self::TABLE, "is_active")?,
            salary: row.get("salary")?,
            email: row.get("email")?,
            phone_number: row.get("phone_number")?,
            hiring_date: row.get("hiring_date")?,
            gender,
            employee_type,
            department_id: row.get("department_id")?,
            image: row.get("image")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Employee::validate(self)
    }
}

impl Repository<Employee> {
    /// Visible employees whose name contains `term`, ignoring case.
    pub fn search_by_name(&self, term: &str) -> Query<Employee> {
        if term.is_empty() {
            return self.query();
        }
        self.query().filter(
            "instr(unicode_lower(name), unicode_lower(?)) > 0",
            [Value::Text(term.to_string())],
        )
    }

    pub fn list_by_department(&self, department_id: EntityId) -> Query<Employee> {
        self.query()
            .filter("department_id = ?", [Value::Integer(department_id)])
    }

    /// Visible employees matching `term`, each with its department name.
    pub fn list_with_department(&self, term: &str) -> RepoResult<Vec<EmployeeWithDepartment>> {
        let (sql, params) = joined_search_sql(term);
        self.session()
            .read(move |conn| fetch_joined(conn, &sql, params))
    }

    pub async fn list_with_department_async(
        &self,
        term: &str,
    ) -> RepoResult<Vec<EmployeeWithDepartment>> {
        let (sql, params) = joined_search_sql(term);
        self.session()
            .read_async(move |conn| fetch_joined(conn, &sql, params))
            .await
    }

    /// Primary-key lookup with the department joined; soft-deleted rows
    /// included, like `get_by_id`.
    pub fn get_with_department(&self, id: EntityId) -> RepoResult<Option<EmployeeWithDepartment>> {
        let sql = joined_by_id_sql();
        self.session().read(move |conn| {
            Ok(fetch_joined(conn, &sql, vec![Value::Integer(id)])?
                .into_iter()
                .next())
        })
    }

    pub async fn get_with_department_async(
        &self,
        id: EntityId,
    ) -> RepoResult<Option<EmployeeWithDepartment>> {
        let sql = joined_by_id_sql();
        self.session()
            .read_async(move |conn| {
                Ok(fetch_joined(conn, &sql, vec![Value::Integer(id)])?
                    .into_iter()
                    .next())
            })
            .await
    }
}

fn joined_select() -> String {
    format!(
        "SELECT {}, d.name AS department_name
         FROM employees e
         LEFT JOIN departments d ON d.id = e.department_id",
        select_list::<Employee>(Some("e"))
    )
}

fn joined_search_sql(term: &str) -> (String, Vec<Value>) {
    let mut sql = joined_select();
    sql.push_str(" WHERE e.is_deleted = 0");
    let mut params = Vec::new();
    if !term.is_empty() {
        sql.push_str(" AND instr(unicode_lower(e.name), unicode_lower(?)) > 0");
        params.push(Value::Text(term.to_string()));
    }
    sql.push_str(" ORDER BY e.id ASC");
    (sql, params)
}

fn joined_by_id_sql() -> String {
    format!("{} WHERE e.id = ? LIMIT 1", joined_select())
}

fn fetch_joined(
    conn: &Connection,
    sql: &str,
    params: Vec<Value>,
) -> RepoResult<Vec<EmployeeWithDepartment>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(params))?;
    let mut items = Vec::new();

    while let Some(row) = rows.next()? {
        items.push(EmployeeWithDepartment {
            employee: read_entity::<Employee>(row)?,
            department_name: row.get("department_name")?,
        });
    }

    Ok(items)
}

fn gender_to_db(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "male",
        Gender::Female => "female",
    }
}

fn parse_gender(value: &str) -> Option<Gender> {
    match value {
        "male" => Some(Gender::Male),
        "female" => Some(Gender::Female),
        _ => None,
    }
}

fn employee_type_to_db(kind: EmployeeType) -> &'static str {
    match kind {
        EmployeeType::FullTime => "full_time",
        EmployeeType::PartTime => "part_time",
    }
}

fn parse_employee_type(value: &str) -> Option<EmployeeType> {
    match value {
        "full_time" => Some(EmployeeType::FullTime),
        "part_time" => Some(EmployeeType::PartTime),
        _ => None,
    }
}
