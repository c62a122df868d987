//! Command-line interface for payroll.
//!
//! This module provides the CLI structure for the `payroll` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddEmployeeArgs, AttendanceCommand, AuditCommand, BackupCommand, ConfigCommand,
    EmployeeCommand, LogCommand, RecordAttendanceArgs, RestoreCommand,
};

use crate::logging::Verbosity;

/// payroll - Personnel records with encrypted identifiers
///
/// Manages employee records, attendance and an append-only audit trail in a
/// local `SQLite` database, with zip backups that restore safely.
#[derive(Debug, Parser)]
#[command(name = "payroll")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the key file and database if missing
    Init,

    /// Manage employee records
    #[command(subcommand)]
    Employee(EmployeeCommand),

    /// Record and list attendance
    #[command(subcommand)]
    Attendance(AttendanceCommand),

    /// Append an entry to the audit trail
    Log(LogCommand),

    /// List the audit trail, oldest first
    Audit(AuditCommand),

    /// Write a backup archive of the database and documents
    Backup(BackupCommand),

    /// Restore a backup archive
    Restore(RestoreCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}
