//! Domain model for departments and employees.
//!
//! # Responsibility
//! - Define the records handled by repositories and services.
//! - Keep identity, audit and tombstone fields in one composable shape.
//!
//! # Invariants
//! - Every persisted record carries a `Metadata` block.
//! - Deletion is represented by soft-delete tombstones, not hard delete.

pub mod department;
pub mod employee;
pub mod entity;
