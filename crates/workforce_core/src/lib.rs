//! Core domain logic for the workforce registry.
//! This crate is the single source of truth for business invariants.

pub mod attachment;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod uow;

pub use attachment::{
    AttachmentError, AttachmentService, IncomingFile, RejectReason, UploadOutcome,
    ALLOWED_EXTENSIONS, MAX_ATTACHMENT_BYTES,
};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::department::Department;
pub use model::employee::{Employee, EmployeeType, Gender};
pub use model::entity::{
    ActorId, AuditStamp, EntityId, HasLifecycleMetadata, Metadata, ValidationError,
};
pub use repo::department_repo::DepartmentRepository;
pub use repo::employee_repo::{EmployeeRepository, EmployeeWithDepartment};
pub use repo::entity::Entity;
pub use repo::error::{RepoError, RepoResult};
pub use repo::query::Query;
pub use repo::repository::Repository;
pub use service::department_service::{
    CreateDepartmentRequest, DepartmentService, UpdateDepartmentRequest,
};
pub use service::employee_service::{EmployeeRequest, EmployeeService, EMPLOYEE_IMAGES_FOLDER};
pub use service::{ServiceError, ServiceResult};
pub use uow::{Database, UnitOfWork};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
