//! Department use-cases.

use crate::model::department::Department;
use crate::model::entity::{EntityId, Metadata};
use crate::service::ServiceResult;
use crate::uow::UnitOfWork;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDepartmentRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub creation_date: NaiveDate,
}

/// Full replacement of an existing department's business fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDepartmentRequest {
    pub id: EntityId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub creation_date: NaiveDate,
}

pub struct DepartmentService<'uow> {
    uow: &'uow UnitOfWork,
}

impl<'uow> DepartmentService<'uow> {
    pub fn new(uow: &'uow UnitOfWork) -> Self {
        Self { uow }
    }

    /// Visible departments by ascending id.
    pub fn list(&self) -> ServiceResult<Vec<Department>> {
        Ok(self.uow.departments().get_all(false)?)
    }

    pub fn get(&self, id: EntityId) -> ServiceResult<Option<Department>> {
        Ok(self.uow.departments().get_by_id(id)?)
    }

    /// Returns the number of persisted rows; `0` means nothing was saved.
    pub fn create(&self, request: CreateDepartmentRequest) -> ServiceResult<usize> {
        let mut department = Department {
            meta: Metadata::default(),
            code: request.code,
            name: request.name,
            description: request.description,
            creation_date: request.creation_date,
        };
        self.uow.departments().add(&mut department)?;
        Ok(self.uow.complete()?)
    }

    pub fn update(&self, request: UpdateDepartmentRequest) -> ServiceResult<usize> {
        let mut department = Department {
            meta: Metadata {
                id: Some(request.id),
                ..Metadata::default()
            },
            code: request.code,
            name: request.name,
            description: request.description,
            creation_date: request.creation_date,
        };
        self.uow.departments().update(&mut department)?;
        Ok(self.uow.complete()?)
    }

    /// Soft-deletes the department; `false` when there was nothing to delete.
    pub fn delete(&self, id: EntityId) -> ServiceResult<bool> {
        let departments = self.uow.departments();
        if let Some(mut department) = departments.get_by_id(id)? {
            if department.meta.is_active() {
                departments.delete(&mut department)?;
            }
        }
        Ok(self.uow.complete()? > 0)
    }
}
