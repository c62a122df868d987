//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::{Map, Value};

use crate::store::{EmployeeFields, NewAttendance};

/// Employee record commands.
#[derive(Debug, Subcommand)]
pub enum EmployeeCommand {
    /// Add an employee
    Add(AddEmployeeArgs),

    /// Show one employee, sensitive fields decrypted
    Show {
        /// Employee identifier
        employee_id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete an employee, keeping a snapshot
    Delete {
        /// Employee identifier
        employee_id: String,

        /// Short reason for the deletion
        #[arg(short, long)]
        reason: String,

        /// Free-text details
        #[arg(short, long, default_value = "")]
        details: String,

        /// Actor recorded in the audit trail
        #[arg(long)]
        actor: Option<String>,
    },

    /// List employees by name
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// List deletion snapshots instead of active employees
        #[arg(long)]
        deleted: bool,
    },
}

/// Arguments for `employee add`.
#[derive(Debug, Args)]
pub struct AddEmployeeArgs {
    /// Full name
    #[arg(long)]
    pub name: Option<String>,

    /// Postal address
    #[arg(long)]
    pub address: Option<String>,

    /// Primary phone number
    #[arg(long)]
    pub contact_number: Option<String>,

    /// Family member to contact in an emergency
    #[arg(long)]
    pub family_contact_person: Option<String>,

    /// Phone number of the family contact
    #[arg(long)]
    pub family_contact_number: Option<String>,

    /// Blood group
    #[arg(long)]
    pub blood_group: Option<String>,

    /// Regular medication
    #[arg(long)]
    pub medicines: Option<String>,

    /// Relationship of the family contact
    #[arg(long)]
    pub relationship: Option<String>,

    /// Who referred the employee
    #[arg(long)]
    pub reference: Option<String>,

    /// National identity number (12 digits)
    #[arg(long)]
    pub national_id: Option<String>,

    /// Tax identifier (10 characters)
    #[arg(long)]
    pub tax_id: Option<String>,

    /// Address-proof scan, relative to the documents directory
    #[arg(long)]
    pub address_proof: Option<String>,

    /// Photo, relative to the documents directory
    #[arg(long)]
    pub photo: Option<String>,

    /// Date of hire (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub hire_date: Option<NaiveDate>,

    /// Record that the employee consented to data processing
    #[arg(long)]
    pub consent: bool,

    /// Extra field as KEY=VALUE (repeatable)
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub fields: Vec<(String, String)>,

    /// Actor recorded in the audit trail
    #[arg(long)]
    pub actor: Option<String>,
}

impl AddEmployeeArgs {
    /// Build the store input from the parsed flags.
    #[must_use]
    pub fn to_fields(&self) -> EmployeeFields {
        let custom_fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        EmployeeFields {
            name: self.name.clone(),
            address: self.address.clone(),
            contact_number: self.contact_number.clone(),
            family_contact_person: self.family_contact_person.clone(),
            family_contact_number: self.family_contact_number.clone(),
            blood_group: self.blood_group.clone(),
            medicines: self.medicines.clone(),
            relationship: self.relationship.clone(),
            reference: self.reference.clone(),
            national_id: self.national_id.clone(),
            tax_id: self.tax_id.clone(),
            address_proof: self.address_proof.clone(),
            photo: self.photo.clone(),
            hire_date: self.hire_date,
            salary_history: Map::new(),
            consent_given: self.consent,
            custom_fields,
        }
    }
}

/// Attendance commands.
#[derive(Debug, Subcommand)]
pub enum AttendanceCommand {
    /// Record a day of attendance
    Record(RecordAttendanceArgs),

    /// List attendance between two dates (inclusive)
    List {
        /// First day (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        from: NaiveDate,

        /// Last day (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        to: NaiveDate,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Arguments for `attendance record`.
#[derive(Debug, Args)]
pub struct RecordAttendanceArgs {
    /// Employee identifier
    pub employee_id: String,

    /// Day worked (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub date: NaiveDate,

    /// Salary earned for the day
    #[arg(long)]
    pub salary: f64,

    /// Role performed
    #[arg(long)]
    pub role: String,

    /// Leave type, if the day was a leave
    #[arg(long)]
    pub leave_type: Option<String>,

    /// Temporary salary override
    #[arg(long)]
    pub temporary_salary: Option<f64>,

    /// Anomaly flag
    #[arg(long)]
    pub anomaly_flag: Option<String>,

    /// Actor recorded in the audit trail
    #[arg(long)]
    pub actor: Option<String>,
}

impl RecordAttendanceArgs {
    /// Build the store input from the parsed flags.
    #[must_use]
    pub fn to_entry(&self) -> NewAttendance {
        let mut entry = NewAttendance::new(&self.employee_id, self.date, self.salary, &self.role);
        entry.leave_type.clone_from(&self.leave_type);
        entry.temporary_salary = self.temporary_salary;
        entry.anomaly_flag.clone_from(&self.anomaly_flag);
        entry
    }
}

/// `log` command arguments.
#[derive(Debug, Args)]
pub struct LogCommand {
    /// Action label, e.g. `login` or `export`
    pub action: String,

    /// Free-text details
    #[arg(short, long, default_value = "")]
    pub details: String,

    /// Actor recorded in the audit trail
    #[arg(long)]
    pub actor: Option<String>,
}

/// `audit` command arguments.
#[derive(Debug, Args)]
pub struct AuditCommand {
    /// Only show entries recorded for this actor
    #[arg(long)]
    pub actor: Option<String>,

    /// Stop after this many entries
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output as JSON lines
    #[arg(short, long)]
    pub json: bool,
}

/// `backup` command arguments.
#[derive(Debug, Args)]
pub struct BackupCommand {
    /// Archive to write
    #[arg(default_value = "backup.zip")]
    pub target: PathBuf,
}

/// `restore` command arguments.
#[derive(Debug, Args)]
pub struct RestoreCommand {
    /// Archive to restore
    pub archive: PathBuf,

    /// Directory to extract into
    #[arg(short, long, default_value = ".")]
    pub target_dir: PathBuf,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {value:?}")),
    }
}
