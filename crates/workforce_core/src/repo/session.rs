//! Persistence session shared by every repository of one unit of work.
//!
//! # Responsibility
//! - Own the single store connection of a unit of work.
//! - Open one store transaction lazily on the first staged write and keep
//!   it open until commit, rollback or release.
//! - Count staged rows so commit can report what it persisted.
//!
//! # Invariants
//! - Reads on the session observe its own uncommitted writes.
//! - Foreign-key checks are deferred to commit.
//! - A failed commit leaves nothing behind: the batch is rolled back.
//! - After `release` every operation fails with `RepoError::SessionClosed`.

use crate::model::entity::ActorId;
use crate::repo::error::{RepoError, RepoResult};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

struct SessionState {
    conn: Option<Connection>,
    staged_rows: usize,
}

/// Cloneable handle to one unit-of-work session.
///
/// Clones share the same connection and transaction; the handle is never
/// shared across units of work.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
    actor: ActorId,
}

impl Session {
    pub(crate) fn new(conn: Connection, actor: ActorId) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                conn: Some(conn),
                staged_rows: 0,
            })),
            actor,
        }
    }

    /// Actor stamped on every write staged through this session.
    pub fn actor(&self) -> ActorId {
        self.actor
    }

    /// Rows staged since the last commit.
    pub fn staged_rows(&self) -> RepoResult<usize> {
        Ok(self.lock()?.staged_rows)
    }

    pub fn is_closed(&self) -> bool {
        self.lock_ignoring_poison().conn.is_none()
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&Connection) -> RepoResult<R>) -> RepoResult<R> {
        let state = self.lock()?;
        let conn = state.conn.as_ref().ok_or(RepoError::SessionClosed)?;
        f(conn)
    }

    /// Runs a read on the blocking pool and suspends the caller until it
    /// finishes.
    pub(crate) async fn read_async<R, F>(&self, f: F) -> RepoResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&Connection) -> RepoResult<R> + Send + 'static,
    {
        let session = self.clone();
        tokio::task::spawn_blocking(move || session.read(f))
            .await
            .map_err(|err| RepoError::Task(err.to_string()))?
    }

    /// Runs one write inside the session transaction.
    ///
    /// The closure returns the number of rows it changed plus any value the
    /// caller needs back (e.g. a generated id).
    pub(crate) fn stage<R>(
        &self,
        f: impl FnOnce(&Connection) -> RepoResult<(usize, R)>,
    ) -> RepoResult<R> {
        let mut state = self.lock()?;
        let (changed, value) = {
            let conn = state.conn.as_ref().ok_or(RepoError::SessionClosed)?;
            if conn.is_autocommit() {
                conn.execute_batch("BEGIN DEFERRED; PRAGMA defer_foreign_keys = ON;")?;
                debug!("event=session_begin module=session status=ok");
            }
            f(conn)?
        };
        state.staged_rows += changed;
        Ok(value)
    }

    /// Commits the open batch and returns the number of staged rows.
    ///
    /// Returns `0` without touching the store when nothing was staged.
    pub(crate) fn commit(&self) -> RepoResult<usize> {
        let started_at = Instant::now();
        let mut state = self.lock()?;
        let staged = state.staged_rows;

        let outcome = {
            let conn = state.conn.as_ref().ok_or(RepoError::SessionClosed)?;
            if conn.is_autocommit() {
                None
            } else {
                Some(commit_or_rollback(conn))
            }
        };
        state.staged_rows = 0;

        match outcome {
            None => {
                debug!("event=session_commit module=session status=noop rows=0");
                Ok(0)
            }
            Some(Ok(())) => {
                info!(
                    "event=session_commit module=session status=ok rows={} duration_ms={}",
                    staged,
                    started_at.elapsed().as_millis()
                );
                Ok(staged)
            }
            Some(Err(err)) => {
                error!(
                    "event=session_commit module=session status=error rows={} duration_ms={} error_code=commit_failed error={}",
                    staged,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    pub(crate) async fn commit_async(&self) -> RepoResult<usize> {
        let session = self.clone();
        tokio::task::spawn_blocking(move || session.commit())
            .await
            .map_err(|err| RepoError::Task(err.to_string()))?
    }

    /// Discards anything uncommitted and closes the connection.
    ///
    /// Safe to call repeatedly and on a session that never staged anything.
    pub(crate) fn release(&self) {
        let mut state = self.lock_ignoring_poison();
        let Some(conn) = state.conn.take() else {
            return;
        };

        if !conn.is_autocommit() {
            match conn.execute_batch("ROLLBACK;") {
                Ok(()) => warn!(
                    "event=session_release module=session status=rolled_back discarded_rows={}",
                    state.staged_rows
                ),
                Err(err) => error!(
                    "event=session_release module=session status=error error_code=rollback_failed error={}",
                    err
                ),
            }
        }
        state.staged_rows = 0;

        if let Err((_, err)) = conn.close() {
            error!(
                "event=session_release module=session status=error error_code=close_failed error={}",
                err
            );
            return;
        }
        debug!("event=session_release module=session status=ok");
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, SessionState>> {
        self.inner.lock().map_err(|_| RepoError::SessionPoisoned)
    }

    fn lock_ignoring_poison(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn commit_or_rollback(conn: &Connection) -> rusqlite::Result<()> {
    match conn.execute_batch("COMMIT;") {
        Ok(()) => Ok(()),
        Err(err) => {
            // A deferred constraint failure leaves the transaction open.
            if !conn.is_autocommit() {
                if let Err(rollback_err) = conn.execute_batch("ROLLBACK;") {
                    error!(
                        "event=session_commit module=session status=error error_code=rollback_failed error={}",
                        rollback_err
                    );
                }
            }
            Err(err)
        }
    }
}
