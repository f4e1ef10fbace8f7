//! Generic CRUD repository bound to a unit-of-work session.
//!
//! # Responsibility
//! - Provide uniform read/stage operations for every `Entity`.
//! - Stamp audit metadata on staged writes.
//! - Route deletion through the update path as a soft delete.
//!
//! # Invariants
//! - Writes are validated before anything reaches the store.
//! - Writes are staged in the session transaction; nothing is durable
//!   before the unit of work completes.
//! - `created_*` columns are written on insert only.
//! - `get_by_id` does not filter on `is_deleted`; `get_all(false)` and the
//!   default `query()` do.

use crate::model::entity::{audit_now, AuditStamp, EntityId, HasLifecycleMetadata};
use crate::repo::entity::{bool_to_int, parse_millis, Entity, META_COLUMNS};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::query::Query;
use crate::repo::session::Session;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::marker::PhantomData;

pub struct Repository<T: Entity> {
    session: Session,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self::new(self.session.clone())
    }
}

impl<T: Entity> Repository<T> {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    /// Unexecuted query over visible rows.
    pub fn query(&self) -> Query<T> {
        Query::new(self.session.clone())
    }

    pub fn get_all(&self, include_deleted: bool) -> RepoResult<Vec<T>> {
        self.all_rows(include_deleted).fetch_all()
    }

    pub async fn get_all_async(&self, include_deleted: bool) -> RepoResult<Vec<T>> {
        self.all_rows(include_deleted).fetch_all_async().await
    }

    /// Primary-key lookup, soft-deleted rows included.
    pub fn get_by_id(&self, id: EntityId) -> RepoResult<Option<T>> {
        self.by_id(id).fetch_optional()
    }

    pub async fn get_by_id_async(&self, id: EntityId) -> RepoResult<Option<T>> {
        self.by_id(id).fetch_optional_async().await
    }

    /// Stages an insert and writes the store-assigned id back to `entity`.
    pub fn add(&self, entity: &mut T) -> RepoResult<()> {
        if let Some(id) = entity.id() {
            return Err(RepoError::AlreadyPersisted(id));
        }
        entity.validate()?;

        let stamp = AuditStamp::new(self.session.actor(), audit_now());
        let stamp_millis = stamp.on.timestamp_millis();
        let columns: Vec<&str> = META_COLUMNS[1..]
            .iter()
            .chain(T::COLUMNS.iter())
            .copied()
            .collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            T::TABLE,
            columns.join(", ")
        );

        let mut values = vec![
            Value::Integer(bool_to_int(entity.is_deleted())),
            Value::Integer(stamp.by),
            Value::Integer(stamp_millis),
            Value::Integer(stamp.by),
            Value::Integer(stamp_millis),
        ];
        values.extend(entity.column_values());

        let id = self.session.stage(|conn| {
            let changed = conn.execute(&sql, params_from_iter(values))?;
            Ok((changed, conn.last_insert_rowid()))
        })?;

        let meta = entity.metadata_mut();
        meta.id = Some(id);
        meta.created = Some(stamp);
        meta.last_modified = Some(stamp);
        debug!(
            "event=stage_insert module=repo status=ok table={} id={}",
            T::TABLE,
            id
        );
        Ok(())
    }

    /// Stages a full-record replace of everything but the creation stamp.
    ///
    /// On success `entity` carries the stored audit stamps.
    pub fn update(&self, entity: &mut T) -> RepoResult<()> {
        let id = entity.id().ok_or(RepoError::NotPersisted)?;
        entity.validate()?;

        let actor = self.session.actor();
        let assignments = T::COLUMNS
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments}, is_deleted = ?, last_modified_by = ?, \
             last_modified_on = MAX(?, created_on) WHERE id = ?;",
            T::TABLE
        );
        let stamps_sql = format!(
            "SELECT created_by, created_on, last_modified_by, last_modified_on FROM {} WHERE id = ?1;",
            T::TABLE
        );

        let mut values = entity.column_values();
        values.push(Value::Integer(bool_to_int(entity.is_deleted())));
        values.push(Value::Integer(actor));
        values.push(Value::Integer(audit_now().timestamp_millis()));
        values.push(Value::Integer(id));

        // A changed row is counted even when reading its stamps back fails.
        let (created, last_modified) = self.session.stage(|conn| {
            let changed = conn.execute(&sql, params_from_iter(values))?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
            Ok((changed, read_stamps::<T>(conn, &stamps_sql, id)))
        })??;

        let meta = entity.metadata_mut();
        meta.created = Some(created);
        meta.last_modified = Some(last_modified);
        debug!(
            "event=stage_update module=repo status=ok table={} id={} is_deleted={}",
            T::TABLE,
            id,
            entity.is_deleted()
        );
        Ok(())
    }

    /// Soft delete: flags `entity` and stages it as an update.
    ///
    /// The flag is reverted on `entity` if staging fails.
    pub fn delete(&self, entity: &mut T) -> RepoResult<()> {
        let was_deleted = entity.is_deleted();
        entity.metadata_mut().soft_delete();
        if let Err(err) = self.update(entity) {
            entity.metadata_mut().is_deleted = was_deleted;
            return Err(err);
        }
        Ok(())
    }

    fn all_rows(&self, include_deleted: bool) -> Query<T> {
        let query = self.query();
        if include_deleted {
            query.include_deleted()
        } else {
            query
        }
    }

    fn by_id(&self, id: EntityId) -> Query<T> {
        self.query()
            .include_deleted()
            .filter("id = ?", [Value::Integer(id)])
    }
}

fn read_stamps<T: Entity>(
    conn: &Connection,
    sql: &str,
    id: EntityId,
) -> RepoResult<(AuditStamp, AuditStamp)> {
    let raw = conn.query_row(sql, params![id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
        ))
    })?;
    let created = AuditStamp::new(raw.0, parse_millis(raw.1, T::TABLE, "created_on")?);
    let last_modified = AuditStamp::new(raw.2, parse_millis(raw.3, T::TABLE, "last_modified_on")?);
    Ok((created, last_modified))
}
