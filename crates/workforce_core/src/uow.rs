//! Unit of work: one session, lazily built repositories, atomic commit.
//!
//! # Responsibility
//! - Own exactly one store connection per logical operation.
//! - Hand out repositories that all share that connection.
//! - Commit every staged write as one batch, or none of them.
//!
//! # Invariants
//! - Two units of work never share a connection.
//! - `complete` returns `0` when nothing was staged; callers treat that as
//!   "nothing persisted".
//! - The session is released on every exit path, committed or not.

use crate::db::{open_db, DbResult};
use crate::model::department::Department;
use crate::model::employee::Employee;
use crate::model::entity::ActorId;
use crate::repo::department_repo::DepartmentRepository;
use crate::repo::employee_repo::EmployeeRepository;
use crate::repo::entity::Entity;
use crate::repo::error::RepoResult;
use crate::repo::repository::Repository;
use crate::repo::session::Session;
use log::info;
use once_cell::sync::OnceCell;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// File-backed store that opens a fresh connection per unit of work.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Opens (and if needed creates) the database file once to make sure
    /// the schema is in place.
    pub fn open(path: impl Into<PathBuf>) -> DbResult<Self> {
        let path = path.into();
        open_db(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Starts a unit of work on its own connection.
    pub fn begin(&self, actor: ActorId) -> RepoResult<UnitOfWork> {
        let conn = open_db(&self.path)?;
        Ok(UnitOfWork::new(conn, actor))
    }
}

pub struct UnitOfWork {
    session: Session,
    departments: OnceCell<DepartmentRepository>,
    employees: OnceCell<EmployeeRepository>,
}

impl UnitOfWork {
    /// Wraps an already bootstrapped connection (see `db::open_db*`).
    pub fn new(conn: Connection, actor: ActorId) -> Self {
        info!("event=uow_begin module=uow status=ok actor={actor}");
        Self {
            session: Session::new(conn, actor),
            departments: OnceCell::new(),
            employees: OnceCell::new(),
        }
    }

    pub fn actor(&self) -> ActorId {
        self.session.actor()
    }

    pub fn departments(&self) -> &DepartmentRepository {
        self.departments
            .get_or_init(|| Repository::<Department>::new(self.session.clone()))
    }

    pub fn employees(&self) -> &EmployeeRepository {
        self.employees
            .get_or_init(|| Repository::<Employee>::new(self.session.clone()))
    }

    /// Another repository handle on this unit of work's session.
    pub fn repository<T: Entity>(&self) -> Repository<T> {
        Repository::new(self.session.clone())
    }

    pub fn has_pending_changes(&self) -> RepoResult<bool> {
        Ok(self.session.staged_rows()? > 0)
    }

    /// Commits all staged writes; returns how many rows were persisted.
    pub fn complete(&self) -> RepoResult<usize> {
        self.session.commit()
    }

    pub async fn complete_async(&self) -> RepoResult<usize> {
        self.session.commit_async().await
    }

    /// Rolls back anything uncommitted and closes the connection.
    ///
    /// Idempotent; also runs on drop.
    pub fn close(&self) {
        self.session.release();
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        self.session.release();
    }
}
