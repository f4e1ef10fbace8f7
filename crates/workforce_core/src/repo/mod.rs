//! Repository layer: generic CRUD, query composition and the session that
//! binds repositories to one unit of work.
//!
//! # Responsibility
//! - Keep SQL details inside the persistence boundary.
//! - Enforce soft-delete visibility on default read paths.
//! - Stage writes without committing them.
//!
//! # Invariants
//! - Repository writes call `Entity::validate()` before touching the store.
//! - Repositories never commit; only the unit of work does.

pub mod department_repo;
pub mod employee_repo;
pub mod entity;
pub mod error;
pub mod query;
pub mod repository;
pub mod session;
