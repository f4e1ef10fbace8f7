//! Composable, lazily executed reads over one entity table.
//!
//! A `Query` is only a description until one of the fetch methods runs,
//! so specialized repositories and services can keep adding predicates
//! without the generic layer knowing about them.
//!
//! # Invariants
//! - Soft-deleted rows are excluded unless `include_deleted` is called.
//! - Predicates are combined with `AND`; bind values are positional.
//! - Without an explicit order, rows come back by ascending id.

use crate::repo::entity::{read_entity, select_list, Entity};
use crate::repo::error::RepoResult;
use crate::repo::session::Session;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::marker::PhantomData;

pub struct Query<T: Entity> {
    session: Session,
    predicates: Vec<String>,
    params: Vec<Value>,
    include_deleted: bool,
    order_by: Option<String>,
    limit: Option<u32>,
    offset: u32,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            predicates: self.predicates.clone(),
            params: self.params.clone(),
            include_deleted: self.include_deleted,
            order_by: self.order_by.clone(),
            limit: self.limit,
            offset: self.offset,
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Query<T> {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            session,
            predicates: Vec::new(),
            params: Vec::new(),
            include_deleted: false,
            order_by: None,
            limit: None,
            offset: 0,
            _entity: PhantomData,
        }
    }

    /// Adds an SQL predicate over the entity's own columns.
    ///
    /// `?` placeholders in `predicate` bind `params` in order. `predicate`
    /// is spliced into the statement verbatim: it must come from trusted
    /// code, never from user input. Pass user values through `params`.
    pub fn filter(
        mut self,
        predicate: impl Into<String>,
        params: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.predicates.push(predicate.into());
        self.params.extend(params);
        self
    }

    /// Lifts the soft-delete visibility filter.
    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Replaces the default `id ASC` ordering.
    ///
    /// `expression` is spliced into the statement verbatim: it must come
    /// from trusted code, never from user input.
    pub fn order_by(mut self, expression: impl Into<String>) -> Self {
        self.order_by = Some(expression.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Renders the select statement and its bind values.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = format!(
            "SELECT {} FROM {}{}",
            select_list::<T>(None),
            T::TABLE,
            self.where_clause()
        );
        let mut bind_values = self.params.clone();

        sql.push_str(" ORDER BY ");
        sql.push_str(self.order_by.as_deref().unwrap_or("id ASC"));

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if self.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(self.offset)));
            }
        } else if self.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(self.offset)));
        }

        (sql, bind_values)
    }

    pub fn fetch_all(&self) -> RepoResult<Vec<T>> {
        let (sql, params) = self.to_sql();
        self.session
            .read(move |conn| fetch_entities::<T>(conn, &sql, params))
    }

    pub async fn fetch_all_async(&self) -> RepoResult<Vec<T>> {
        let (sql, params) = self.to_sql();
        self.session
            .read_async(move |conn| fetch_entities::<T>(conn, &sql, params))
            .await
    }

    /// First matching row, if any.
    pub fn fetch_optional(&self) -> RepoResult<Option<T>> {
        let (sql, params) = self.clone().limit(1).to_sql();
        self.session
            .read(move |conn| Ok(fetch_entities::<T>(conn, &sql, params)?.into_iter().next()))
    }

    pub async fn fetch_optional_async(&self) -> RepoResult<Option<T>> {
        let (sql, params) = self.clone().limit(1).to_sql();
        self.session
            .read_async(move |conn| {
                Ok(fetch_entities::<T>(conn, &sql, params)?.into_iter().next())
            })
            .await
    }

    /// Number of matching rows. Ordering and paging are ignored.
    pub fn count(&self) -> RepoResult<u64> {
        let (sql, params) = self.count_sql();
        self.session.read(move |conn| count_rows(conn, &sql, params))
    }

    pub async fn count_async(&self) -> RepoResult<u64> {
        let (sql, params) = self.count_sql();
        self.session
            .read_async(move |conn| count_rows(conn, &sql, params))
            .await
    }

    fn count_sql(&self) -> (String, Vec<Value>) {
        (
            format!("SELECT COUNT(*) FROM {}{}", T::TABLE, self.where_clause()),
            self.params.clone(),
        )
    }

    fn where_clause(&self) -> String {
        let mut clause = String::from(" WHERE 1 = 1");
        if !self.include_deleted {
            clause.push_str(" AND is_deleted = 0");
        }
        for predicate in &self.predicates {
            clause.push_str(" AND (");
            clause.push_str(predicate);
            clause.push(')');
        }
        clause
    }
}

fn fetch_entities<T: Entity>(
    conn: &Connection,
    sql: &str,
    params: Vec<Value>,
) -> RepoResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(params))?;
    let mut entities = Vec::new();

    while let Some(row) = rows.next()? {
        entities.push(read_entity::<T>(row)?);
    }

    Ok(entities)
}

fn count_rows(conn: &Connection, sql: &str, params: Vec<Value>) -> RepoResult<u64> {
    let count: i64 = conn.query_row(sql, params_from_iter(params), |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or(0))
}
