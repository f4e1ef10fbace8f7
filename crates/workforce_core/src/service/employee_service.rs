//! Employee use-cases, including image ingestion.
//!
//! # Invariants
//! - An image is stored before the employee row is staged; the stored key
//!   is what lands in `employees.image`.
//! - A rejected image aborts the use-case before anything is staged.
//! - If the commit fails, the freshly stored image is removed again.

use crate::attachment::{AttachmentService, IncomingFile, UploadOutcome};
use crate::model::employee::{Employee, EmployeeType, Gender};
use crate::model::entity::{EntityId, Metadata};
use crate::repo::employee_repo::EmployeeWithDepartment;
use crate::service::{ServiceError, ServiceResult};
use crate::uow::UnitOfWork;
use chrono::NaiveDate;
use log::warn;
use tokio::io::AsyncRead;

/// Folder under the attachment root that holds employee images.
pub const EMPLOYEE_IMAGES_FOLDER: &str = "images";

/// Business fields of an employee, shared by create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeRequest {
    pub name: String,
    pub age: Option<i32>,
    pub address: Option<String>,
    pub is_active: bool,
    pub salary: f64,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub hiring_date: NaiveDate,
    pub gender: Gender,
    pub employee_type: EmployeeType,
    pub department_id: EntityId,
}

impl EmployeeRequest {
    fn into_employee(self, meta: Metadata, image: Option<String>) -> Employee {
        Employee {
            meta,
            name: self.name,
            age: self.age,
            address: self.address,
            is_active: self.is_active,
            salary: self.salary,
            email: self.email,
            phone_number: self.phone_number,
            hiring_date: self.hiring_date,
            gender: self.gender,
            employee_type: self.employee_type,
            department_id: self.department_id,
            image,
        }
    }
}

pub struct EmployeeService<'a> {
    uow: &'a UnitOfWork,
    attachments: &'a AttachmentService,
}

impl<'a> EmployeeService<'a> {
    pub fn new(uow: &'a UnitOfWork, attachments: &'a AttachmentService) -> Self {
        Self { uow, attachments }
    }

    /// Visible employees whose name contains `search` (any case), with
    /// their department names.
    pub async fn list(&self, search: &str) -> ServiceResult<Vec<EmployeeWithDepartment>> {
        Ok(self
            .uow
            .employees()
            .list_with_department_async(search)
            .await?)
    }

    pub async fn get(&self, id: EntityId) -> ServiceResult<Option<EmployeeWithDepartment>> {
        Ok(self.uow.employees().get_with_department_async(id).await?)
    }

    pub async fn create(&self, request: EmployeeRequest) -> ServiceResult<usize> {
        let mut employee = request.into_employee(Metadata::default(), None);
        self.uow.employees().add(&mut employee)?;
        Ok(self.uow.complete_async().await?)
    }

    /// Stores `image` first, then stages and commits the employee.
    pub async fn create_with_image<R: AsyncRead + Unpin>(
        &self,
        request: EmployeeRequest,
        image: IncomingFile<R>,
    ) -> ServiceResult<usize> {
        let key = match self
            .attachments
            .upload_async(image, EMPLOYEE_IMAGES_FOLDER)
            .await?
        {
            UploadOutcome::Stored(key) => key,
            UploadOutcome::Rejected(reason) => return Err(ServiceError::AttachmentRejected(reason)),
        };

        let mut employee = request.into_employee(Metadata::default(), Some(key.clone()));
        let outcome = match self.uow.employees().add(&mut employee) {
            Ok(()) => self.uow.complete_async().await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(rows) => Ok(rows),
            Err(err) => {
                if !self.attachments.delete(EMPLOYEE_IMAGES_FOLDER, &key) {
                    warn!(
                        "event=employee_create module=service status=error error_code=orphan_image key={}",
                        key
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Replaces the employee's business fields, keeping `image` as given.
    pub async fn update(
        &self,
        id: EntityId,
        request: EmployeeRequest,
        image: Option<String>,
    ) -> ServiceResult<usize> {
        let meta = Metadata {
            id: Some(id),
            ..Metadata::default()
        };
        let mut employee = request.into_employee(meta, image);
        self.uow.employees().update(&mut employee)?;
        Ok(self.uow.complete_async().await?)
    }

    /// Soft-deletes the employee; `false` when there was nothing to delete.
    pub async fn delete(&self, id: EntityId) -> ServiceResult<bool> {
        let employees = self.uow.employees();
        if let Some(mut employee) = employees.get_by_id_async(id).await? {
            if employee.meta.is_active() {
                employees.delete(&mut employee)?;
            }
        }
        Ok(self.uow.complete_async().await? > 0)
    }
}
