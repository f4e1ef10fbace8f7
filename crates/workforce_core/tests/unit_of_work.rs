use chrono::NaiveDate;
use workforce_core::db::open_db_in_memory;
use workforce_core::{
    Database, Department, Employee, EmployeeType, Gender, HasLifecycleMetadata, RepoError,
    UnitOfWork,
};

fn founded() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn memory_uow() -> UnitOfWork {
    UnitOfWork::new(open_db_in_memory().unwrap(), 1)
}

fn file_database(dir: &tempfile::TempDir) -> Database {
    Database::open(dir.path().join("workforce.db")).unwrap()
}

#[test]
fn complete_without_staged_writes_returns_zero() {
    let uow = memory_uow();
    assert!(!uow.has_pending_changes().unwrap());
    assert_eq!(uow.complete().unwrap(), 0);

    uow.departments().get_all(true).unwrap();
    assert_eq!(uow.complete().unwrap(), 0);
}

#[test]
fn complete_persists_one_department() {
    let dir = tempfile::tempdir().unwrap();
    let database = file_database(&dir);

    let uow = database.begin(1).unwrap();
    let mut department = Department::new("D1", "Sales", founded());
    uow.departments().add(&mut department).unwrap();
    assert!(uow.has_pending_changes().unwrap());
    assert_eq!(uow.complete().unwrap(), 1);
    assert!(!uow.has_pending_changes().unwrap());
    drop(uow);

    let reader = database.begin(1).unwrap();
    let stored = reader.departments().get_all(false).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].code, "D1");
    assert_eq!(stored[0].name, "Sales");
}

#[test]
fn complete_counts_every_staged_row() {
    let uow = memory_uow();
    let mut sales = Department::new("D1", "Sales", founded());
    let mut support = Department::new("D2", "Support", founded());
    uow.departments().add(&mut sales).unwrap();
    uow.departments().add(&mut support).unwrap();
    sales.description = Some("Field sales".to_string());
    uow.departments().update(&mut sales).unwrap();

    assert_eq!(uow.complete().unwrap(), 3);
}

#[test]
fn repositories_share_uncommitted_writes() {
    let uow = memory_uow();
    let mut department = Department::new("D1", "Sales", founded());
    uow.departments().add(&mut department).unwrap();

    let mut employee = Employee::new(
        "Mona",
        Gender::Female,
        EmployeeType::FullTime,
        department.id().unwrap(),
        founded(),
    );
    uow.employees().add(&mut employee).unwrap();

    let other_handle = uow.repository::<Department>();
    assert_eq!(other_handle.get_all(false).unwrap().len(), 1);
    let joined = uow.employees().list_with_department("").unwrap();
    assert_eq!(joined[0].department_name.as_deref(), Some("Sales"));

    assert_eq!(uow.complete().unwrap(), 2);
}

#[test]
fn dangling_department_reference_fails_at_commit() {
    let uow = memory_uow();
    let mut employee = Employee::new(
        "Mona",
        Gender::Female,
        EmployeeType::FullTime,
        404,
        founded(),
    );
    uow.employees().add(&mut employee).unwrap();

    let err = uow.complete().unwrap_err();
    assert!(err.is_constraint_violation(), "unexpected error: {err}");

    assert!(uow.employees().get_all(true).unwrap().is_empty());
    assert_eq!(uow.complete().unwrap(), 0);
}

#[test]
fn dropping_without_complete_discards_writes() {
    let dir = tempfile::tempdir().unwrap();
    let database = file_database(&dir);

    {
        let uow = database.begin(1).unwrap();
        let mut department = Department::new("D1", "Sales", founded());
        uow.departments().add(&mut department).unwrap();
    }

    let reader = database.begin(1).unwrap();
    assert!(reader.departments().get_all(true).unwrap().is_empty());
}

#[test]
fn uncommitted_writes_are_invisible_to_other_units() {
    let dir = tempfile::tempdir().unwrap();
    let database = file_database(&dir);

    let writer = database.begin(1).unwrap();
    let mut department = Department::new("D1", "Sales", founded());
    writer.departments().add(&mut department).unwrap();

    let reader = database.begin(2).unwrap();
    assert!(reader.departments().get_all(true).unwrap().is_empty());

    assert_eq!(writer.complete().unwrap(), 1);
    assert_eq!(reader.departments().get_all(false).unwrap().len(), 1);
}

#[test]
fn close_is_idempotent_and_blocks_further_use() {
    let uow = memory_uow();
    let mut department = Department::new("D1", "Sales", founded());
    uow.departments().add(&mut department).unwrap();

    uow.close();
    uow.close();
    assert!(uow.is_closed());

    assert!(matches!(
        uow.departments().get_all(false),
        Err(RepoError::SessionClosed)
    ));
    assert!(matches!(uow.complete(), Err(RepoError::SessionClosed)));
}

#[test]
fn actor_is_stamped_on_writes() {
    let uow = UnitOfWork::new(open_db_in_memory().unwrap(), 42);
    assert_eq!(uow.actor(), 42);

    let mut department = Department::new("D1", "Sales", founded());
    uow.departments().add(&mut department).unwrap();
    assert_eq!(department.meta.created_by(), Some(42));
}

#[tokio::test]
async fn complete_async_commits_staged_writes() {
    let dir = tempfile::tempdir().unwrap();
    let database = file_database(&dir);

    let uow = database.begin(1).unwrap();
    let mut department = Department::new("D1", "Sales", founded());
    uow.departments().add(&mut department).unwrap();
    assert_eq!(uow.complete_async().await.unwrap(), 1);
    assert_eq!(uow.complete_async().await.unwrap(), 0);
    drop(uow);

    let reader = database.begin(1).unwrap();
    let stored = reader.departments().get_all_async(false).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn units_of_work_run_concurrently_on_separate_connections() {
    let dir = tempfile::tempdir().unwrap();
    let database = file_database(&dir);

    let mut handles = Vec::new();
    for index in 0..4 {
        let database = database.clone();
        handles.push(tokio::spawn(async move {
            let uow = database.begin(index).unwrap();
            let mut department =
                Department::new(format!("D{index}"), format!("Dept {index}"), founded());
            uow.departments().add(&mut department).unwrap();
            uow.complete_async().await.unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 1);
    }

    let reader = database.begin(1).unwrap();
    assert_eq!(reader.departments().query().count().unwrap(), 4);
}
