//! `payroll` - A personnel-records store with encrypted identifiers
//!
//! This library keeps employee records in `SQLite`, encrypts government
//! identifiers with a locally held key, writes every mutation to an
//! append-only audit trail, and backs the data up to zip archives that
//! restore without escaping their target directory.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod archive;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod store;

pub use archive::ArchiveManager;
pub use config::Config;
pub use crypto::{EncryptionKey, FieldCipher};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use store::{AuditEntry, AuditTrail, EmployeeFields, EmployeeRecord, RecordStore};
