//! `payroll` - CLI for the payroll record store
//!
//! This binary drives the record store, audit trail and archive manager from
//! the command line.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use payroll::cli::{
    AttendanceCommand, AuditCommand, Cli, Command, ConfigCommand, EmployeeCommand,
};
use payroll::store::EmployeeRecord;
use payroll::{init_logging, ArchiveManager, Config, EncryptionKey, RecordStore};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

/// Map a failure to the process exit status.
///
/// Rejected input and unknown records exit with 2, key and cipher failures
/// with 3, everything else with 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<payroll::Error>() {
        Some(e) if e.is_validation() || e.is_not_found() => 2,
        Some(e) if e.is_key_error() => 3,
        _ => 1,
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Init => handle_init(&config),
        Command::Employee(cmd) => handle_employee(&config, cmd),
        Command::Attendance(cmd) => handle_attendance(&config, cmd),
        Command::Log(cmd) => {
            let store = open_store(&config)?;
            let actor = cmd.actor.as_deref().unwrap_or(&config.audit.default_actor);
            let entry = store.log_action(actor, &cmd.action, &cmd.details)?;
            println!("{}", entry.action_id);
            Ok(())
        }
        Command::Audit(cmd) => handle_audit(&config, &cmd),
        Command::Backup(cmd) => {
            // Fold the WAL into the database file so the archive is complete.
            open_store(&config)?.checkpoint()?;
            let written = archive_manager(&config)
                .backup(&cmd.target)
                .with_context(|| format!("writing backup to {}", cmd.target.display()))?;
            println!("{}", written.display());
            Ok(())
        }
        Command::Restore(cmd) => {
            let db = archive_manager(&config)
                .restore(&cmd.archive, &cmd.target_dir)
                .with_context(|| format!("restoring {}", cmd.archive.display()))?;
            println!("{}", db.display());
            Ok(())
        }
        Command::Config(cmd) => handle_config(&config, &cmd),
    }
}

fn load_key(config: &Config) -> Result<EncryptionKey> {
    let key_path = config.key_path();
    EncryptionKey::load_or_create(&key_path.value)
        .with_context(|| format!("loading key from {}", key_path.value.display()))
}

fn open_store(config: &Config) -> Result<RecordStore> {
    let key = load_key(config)?;
    let db_path = config.database_path().value;
    RecordStore::open(&db_path, &key)
        .with_context(|| format!("opening database {}", db_path.display()))
}

fn archive_manager(config: &Config) -> ArchiveManager {
    ArchiveManager::new(config.database_path().value, config.documents_dir().value)
}

fn handle_init(config: &Config) -> Result<()> {
    let key = load_key(config)?;
    let db_path = config.database_path().value;
    let store = RecordStore::open(&db_path, &key)?;

    let docs = config.documents_dir().value;
    std::fs::create_dir_all(&docs)
        .with_context(|| format!("creating documents directory {}", docs.display()))?;

    let version = store
        .schema_version()?
        .map_or_else(|| "none".to_string(), |v| v.version.to_string());
    println!("Database:        {}", store.path().display());
    println!("Documents:       {}", docs.display());
    println!("Key fingerprint: {}", key.fingerprint());
    println!("Schema version:  {version}");
    Ok(())
}

fn handle_employee(config: &Config, cmd: EmployeeCommand) -> Result<()> {
    let store = open_store(config)?;

    match cmd {
        EmployeeCommand::Add(args) => {
            let actor = args.actor.as_deref().unwrap_or(&config.audit.default_actor);
            let id = store.add_employee(actor, args.to_fields())?;
            println!("{id}");
        }
        EmployeeCommand::Show { employee_id, json } => {
            let record = store
                .get_employee(&employee_id)?
                .ok_or_else(|| payroll::Error::not_found("employee", employee_id.clone()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print_employee(&record);
            }
        }
        EmployeeCommand::Delete {
            employee_id,
            reason,
            details,
            actor,
        } => {
            let actor = actor.as_deref().unwrap_or(&config.audit.default_actor);
            let deleted = store.delete_employee(&employee_id, actor, &reason, &details)?;
            println!(
                "Deleted {} ({})",
                deleted.employee_id,
                deleted.name.as_deref().unwrap_or("unnamed")
            );
        }
        EmployeeCommand::List { json, deleted } => {
            if deleted {
                let records = store.deleted_records()?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&records)?);
                } else {
                    for r in records {
                        println!(
                            "{}  {}  {}  {}  by {}",
                            r.deleted_at.format("%Y-%m-%d %H:%M:%S"),
                            r.employee_id,
                            r.name.as_deref().unwrap_or("-"),
                            r.reason,
                            r.deleted_by
                        );
                    }
                }
            } else {
                let employees = store.list_employees()?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&employees)?);
                } else {
                    for e in employees {
                        println!(
                            "{}  {}  {}",
                            e.employee_id,
                            e.name.as_deref().unwrap_or("-"),
                            e.hire_date.map_or_else(|| "-".to_string(), |d| d.to_string())
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_employee(record: &EmployeeRecord) {
    let f = &record.fields;
    let show = |label: &str, value: Option<&str>| {
        if let Some(value) = value {
            println!("{label:<22} {value}");
        }
    };

    show("Employee ID:", Some(record.employee_id.as_str()));
    show("Name:", f.name.as_deref());
    show("Address:", f.address.as_deref());
    show("Contact number:", f.contact_number.as_deref());
    show("Family contact:", f.family_contact_person.as_deref());
    show("Family contact number:", f.family_contact_number.as_deref());
    show("Relationship:", f.relationship.as_deref());
    show("Blood group:", f.blood_group.as_deref());
    show("Medicines:", f.medicines.as_deref());
    show("Reference:", f.reference.as_deref());
    show("National ID:", f.national_id.as_deref());
    show("Tax ID:", f.tax_id.as_deref());
    show("Address proof:", f.address_proof.as_deref());
    show("Photo:", f.photo.as_deref());
    let hire_date = f.hire_date.map(|d| d.to_string());
    show("Hire date:", hire_date.as_deref());
    show("Consent given:", Some(if f.consent_given { "yes" } else { "no" }));
    for (key, value) in &f.custom_fields {
        println!("{:<22} {value}", format!("{key}:"));
    }
}

fn handle_attendance(config: &Config, cmd: AttendanceCommand) -> Result<()> {
    let store = open_store(config)?;

    match cmd {
        AttendanceCommand::Record(args) => {
            let actor = args.actor.as_deref().unwrap_or(&config.audit.default_actor);
            let id = store.record_attendance(actor, &args.to_entry())?;
            println!("{id}");
        }
        AttendanceCommand::List { from, to, json } => {
            let entries = store.list_attendance(from, to)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for e in entries {
                    println!(
                        "{}  {}  {:>10.2}  {}{}",
                        e.date,
                        e.employee_id,
                        e.temporary_salary.unwrap_or(e.salary),
                        e.role,
                        e.leave_type
                            .map(|l| format!("  (leave: {l})"))
                            .unwrap_or_default()
                    );
                }
            }
        }
    }
    Ok(())
}

fn handle_audit(config: &Config, cmd: &AuditCommand) -> Result<()> {
    let store = open_store(config)?;

    let mut trail = store.audit_trail().page_size(config.audit.page_size);
    if let Some(actor) = &cmd.actor {
        trail = trail.by_actor(actor.clone());
    }

    let limit = cmd.limit.unwrap_or(usize::MAX);
    for entry in trail.iter().take(limit) {
        let entry = entry?;
        if cmd.json {
            println!("{}", serde_json::to_string(&entry)?);
        } else {
            println!(
                "{}  {:<12} {:<18} {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.actor,
                entry.action,
                entry.details
            );
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let db = config.database_path();
            let docs = config.documents_dir();
            let key = config.key_path();

            if *json {
                let resolved = serde_json::json!({
                    "config": config,
                    "resolved": {
                        "database_path": db,
                        "documents_dir": docs,
                        "key_path": key,
                    }
                });
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:  {} ({})", db.value.display(), db.source);
                println!("  Documents dir:  {} ({})", docs.value.display(), docs.source);
                println!("  Key path:       {} ({})", key.value.display(), key.source);
                println!();
                println!("[Audit]");
                println!("  Default actor:  {}", config.audit.default_actor);
                println!("  Page size:      {}", config.audit.page_size);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
    }
    Ok(())
}
