//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load configuration from the environment (and `.env` when present).
//! - Open the store and the attachment root and report what they hold.

use dotenv::dotenv;
use log::info;
use std::error::Error;
use workforce_core::{core_version, init_logging, AttachmentService, CoreConfig, Database};

fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    let config = CoreConfig::from_env()?;

    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, log_dir)?;
    }

    let database = Database::open(&config.database_path)?;
    let attachments = AttachmentService::new(&config.attachments_root);
    let uow = database.begin(config.actor)?;
    let departments = uow.departments().query().count()?;
    let employees = uow.employees().query().count()?;
    uow.close();

    info!(
        "event=cli_report module=cli status=ok departments={} employees={}",
        departments, employees
    );
    println!("workforce_core version={}", core_version());
    println!("database={}", database.path().display());
    println!("attachments_root={}", attachments.root().display());
    println!("departments={departments} employees={employees}");
    Ok(())
}
