use chrono::NaiveDate;
use rusqlite::{params, Connection};
use workforce_core::db::open_db_in_memory;
use workforce_core::{
    Database, Department, Employee, EmployeeType, Gender, HasLifecycleMetadata, Metadata,
    RepoError, UnitOfWork, ValidationError,
};

const ACTOR: i64 = 7;

fn new_uow() -> UnitOfWork {
    UnitOfWork::new(open_db_in_memory().unwrap(), ACTOR)
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn add_department(uow: &UnitOfWork, code: &str, name: &str) -> Department {
    let mut department = Department::new(code, name, date(2020, 1, 1));
    uow.departments().add(&mut department).unwrap();
    department
}

#[test]
fn add_assigns_id_and_audit_stamps() {
    let uow = new_uow();
    let department = add_department(&uow, "D1", "Sales");

    let id = department.id().unwrap();
    assert!(id > 0);
    assert_eq!(department.meta.created_by(), Some(ACTOR));
    assert_eq!(department.meta.last_modified_by(), Some(ACTOR));
    assert_eq!(
        department.meta.created_on(),
        department.meta.last_modified_on()
    );

    let loaded = uow.departments().get_by_id(id).unwrap().unwrap();
    assert_eq!(loaded, department);
}

#[test]
fn add_rejects_already_persisted_entity() {
    let uow = new_uow();
    let mut department = add_department(&uow, "D1", "Sales");
    let id = department.id().unwrap();

    let err = uow.departments().add(&mut department).unwrap_err();
    assert!(matches!(err, RepoError::AlreadyPersisted(existing) if existing == id));
}

#[test]
fn add_validates_before_staging() {
    let uow = new_uow();
    let mut department = Department::new("D1", "x".repeat(51), date(2020, 1, 1));

    let err = uow.departments().add(&mut department).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::TooLong { field: "name", .. })
    ));
    assert_eq!(department.id(), None);
    assert!(!uow.has_pending_changes().unwrap());
}

#[test]
fn update_keeps_creation_stamp_and_orders_audit_times() {
    let uow = new_uow();
    let mut department = add_department(&uow, "D1", "Sales");
    let created_on = department.meta.created_on();

    department.name = "Sales & Marketing".to_string();
    uow.departments().update(&mut department).unwrap();

    let loaded = uow
        .departments()
        .get_by_id(department.id().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(loaded.name, "Sales & Marketing");
    assert_eq!(loaded.meta.created_on(), created_on);
    assert_eq!(loaded.meta.created_by(), Some(ACTOR));
    assert!(loaded.meta.created_on() <= loaded.meta.last_modified_on());
    assert_eq!(loaded.meta, department.meta);
}

#[test]
fn update_requires_a_stored_row() {
    let uow = new_uow();

    let mut unsaved = Department::new("D1", "Sales", date(2020, 1, 1));
    let err = uow.departments().update(&mut unsaved).unwrap_err();
    assert!(matches!(err, RepoError::NotPersisted));

    unsaved.meta.id = Some(404);
    let err = uow.departments().update(&mut unsaved).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(404)));
}

#[test]
fn update_counts_changed_row_when_stamps_cannot_be_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workforce.db");
    let database = Database::open(&path).unwrap();

    let uow = database.begin(ACTOR).unwrap();
    let department = add_department(&uow, "D1", "Sales");
    let id = department.id().unwrap();
    assert_eq!(uow.complete().unwrap(), 1);
    drop(uow);

    let raw = Connection::open(&path).unwrap();
    raw.execute(
        "UPDATE departments SET created_on = ?1, last_modified_on = ?1 WHERE id = ?2;",
        params![i64::MAX, id],
    )
    .unwrap();
    drop(raw);

    let uow = database.begin(ACTOR).unwrap();
    let mut renamed = Department::new("D1", "Sales EMEA", date(2020, 1, 1));
    renamed.meta = Metadata {
        id: Some(id),
        ..Metadata::default()
    };
    let err = uow.departments().update(&mut renamed).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));

    assert!(uow.has_pending_changes().unwrap());
    assert_eq!(uow.complete().unwrap(), 1);
}

#[test]
fn delete_hides_row_from_default_reads_only() {
    let uow = new_uow();
    let mut sales = add_department(&uow, "D1", "Sales");
    add_department(&uow, "D2", "Support");

    uow.departments().delete(&mut sales).unwrap();
    assert!(sales.is_deleted());

    let visible = uow.departments().get_all(false).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].code, "D2");

    let everything = uow.departments().get_all(true).unwrap();
    assert_eq!(everything.len(), 2);

    let by_id = uow
        .departments()
        .get_by_id(sales.id().unwrap())
        .unwrap()
        .unwrap();
    assert!(by_id.is_deleted());
    assert_eq!(uow.departments().query().count().unwrap(), 1);
}

#[test]
fn delete_reverts_flag_when_staging_fails() {
    let uow = new_uow();
    let mut department = Department::new("D1", "Sales", date(2020, 1, 1));
    department.meta.id = Some(404);

    assert!(uow.departments().delete(&mut department).is_err());
    assert!(!department.is_deleted());
}

#[test]
fn get_by_id_returns_none_for_unknown_id() {
    let uow = new_uow();
    assert!(uow.departments().get_by_id(12345).unwrap().is_none());
}

#[test]
fn query_runs_only_when_fetched() {
    let uow = new_uow();
    let query = uow.departments().search("sal");

    add_department(&uow, "D1", "Sales");
    add_department(&uow, "D2", "Support");

    let found = query.fetch_all().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Sales");
}

#[test]
fn query_supports_ordering_and_paging() {
    let uow = new_uow();
    for (code, name) in [("D1", "Alpha"), ("D2", "Beta"), ("D3", "Gamma")] {
        add_department(&uow, code, name);
    }

    let page = uow
        .departments()
        .query()
        .order_by("name DESC")
        .limit(2)
        .offset(1)
        .fetch_all()
        .unwrap();
    let names: Vec<_> = page.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["Beta", "Alpha"]);

    let skipped = uow.departments().query().offset(2).fetch_all().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].name, "Gamma");

    let first = uow.departments().query().fetch_optional().unwrap().unwrap();
    assert_eq!(first.code, "D1");
    assert_eq!(uow.departments().query().limit(1).count().unwrap(), 3);
}

#[test]
fn find_by_code_ignores_deleted_departments() {
    let uow = new_uow();
    let mut sales = add_department(&uow, "D1", "Sales");
    assert!(uow.departments().find_by_code("D1").unwrap().is_some());

    uow.departments().delete(&mut sales).unwrap();
    assert!(uow.departments().find_by_code("D1").unwrap().is_none());
}

#[test]
fn employee_roundtrip_keeps_every_field() {
    let uow = new_uow();
    let department = add_department(&uow, "D1", "Sales");

    let mut employee = Employee::new(
        "Ahmed Ali",
        Gender::Male,
        EmployeeType::PartTime,
        department.id().unwrap(),
        date(2023, 5, 17),
    );
    employee.age = Some(31);
    employee.address = Some("12 Nile St".to_string());
    employee.salary = 4200.5;
    employee.email = Some("ahmed@example.com".to_string());
    employee.phone_number = Some("+20 100 123 4567".to_string());
    employee.image = Some("0f8e.png".to_string());
    uow.employees().add(&mut employee).unwrap();

    let loaded = uow
        .employees()
        .get_by_id(employee.id().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(loaded, employee);
}

#[test]
fn generic_repository_handle_shares_the_session() {
    let uow = new_uow();
    add_department(&uow, "D1", "Sales");

    let departments = uow.repository::<Department>();
    assert_eq!(departments.get_all(false).unwrap().len(), 1);
}

#[tokio::test]
async fn async_reads_match_sync_reads() {
    let uow = new_uow();
    let department = add_department(&uow, "D1", "Sales");
    let id = department.id().unwrap();

    let all = uow.departments().get_all_async(false).await.unwrap();
    assert_eq!(all, uow.departments().get_all(false).unwrap());

    let loaded = uow.departments().get_by_id_async(id).await.unwrap();
    assert_eq!(loaded, Some(department));

    let count = uow.departments().query().count_async().await.unwrap();
    assert_eq!(count, 1);
}
