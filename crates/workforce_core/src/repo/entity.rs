//! Persistence contract for records handled by the generic repository.
//!
//! # Invariants
//! - Every table carries the shared lifecycle columns in `META_COLUMNS`.
//! - `Entity::COLUMNS` and `Entity::column_values` list the same columns in
//!   the same order.

use crate::model::entity::{
    millis_to_datetime, AuditStamp, HasLifecycleMetadata, Metadata, ValidationError,
};
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::Row;

pub(crate) const META_COLUMNS: &[&str] = &[
    "id",
    "is_deleted",
    "created_by",
    "created_on",
    "last_modified_by",
    "last_modified_on",
];

/// A record with its own table, mapped by the generic repository.
pub trait Entity: HasLifecycleMetadata + Sized + Send + 'static {
    const TABLE: &'static str;
    /// Record-specific columns, excluding the shared lifecycle columns.
    const COLUMNS: &'static [&'static str];

    /// Values for `COLUMNS`, in order.
    fn column_values(&self) -> Vec<Value>;

    /// Builds the record from a row that exposes every column by name.
    fn from_row(row: &Row<'_>, meta: Metadata) -> RepoResult<Self>;

    /// Checked before every staged write.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Comma-separated select list for `T`, optionally qualified by a table
/// alias. Qualified columns are re-aliased to their bare names so row
/// parsing stays alias-agnostic.
pub(crate) fn select_list<T: Entity>(alias: Option<&str>) -> String {
    META_COLUMNS
        .iter()
        .chain(T::COLUMNS.iter())
        .map(|column| match alias {
            Some(alias) => format!("{alias}.{column} AS {column}"),
            None => (*column).to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn read_entity<T: Entity>(row: &Row<'_>) -> RepoResult<T> {
    let meta = parse_metadata(row, T::TABLE)?;
    T::from_row(row, meta)
}

fn parse_metadata(row: &Row<'_>, table: &str) -> RepoResult<Metadata> {
    let is_deleted = int_to_bool(row.get("is_deleted")?, table, "is_deleted")?;
    let created = AuditStamp::new(
        row.get("created_by")?,
        parse_millis(row.get("created_on")?, table, "created_on")?,
    );
    let last_modified = AuditStamp::new(
        row.get("last_modified_by")?,
        parse_millis(row.get("last_modified_on")?, table, "last_modified_on")?,
    );

    Ok(Metadata {
        id: Some(row.get("id")?),
        is_deleted,
        created: Some(created),
        last_modified: Some(last_modified),
    })
}

pub(crate) fn int_to_bool(value: i64, table: &str, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {table}.{column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn parse_millis(
    value: i64,
    table: &str,
    column: &str,
) -> RepoResult<chrono::DateTime<chrono::Utc>> {
    millis_to_datetime(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid timestamp `{value}` in {table}.{column}"))
    })
}

pub(crate) fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}
