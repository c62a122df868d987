//! Storage layer for payroll.
//!
//! This module provides `SQLite`-based persistent storage for employee
//! records, attendance entries, deletion snapshots and the audit trail.
//! Sensitive fields are validated, then encrypted before they are written,
//! and decrypted only when a single record is explicitly fetched.

pub mod audit;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod validation;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::crypto::{EncryptionKey, FieldCipher};
use crate::error::{Error, Result};

pub use audit::{actions, AuditIter, AuditTrail};
pub use models::{
    AttendanceEntry, AuditEntry, DeletedRecord, EmployeeFields, EmployeeRecord, EmployeeSummary,
    NewAttendance, SchemaVersion,
};

use models::{format_timestamp, DATE_FORMAT};

const IN_MEMORY: &str = ":memory:";

/// The record store.
///
/// Owns the database connection and the field cipher. All access to the
/// connection is serialized through a mutex, and every mutation runs in a
/// single transaction together with its audit entry, so no reader ever sees
/// a half-written record.
#[derive(Debug)]
pub struct RecordStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
    /// Cipher for the sensitive fields.
    cipher: FieldCipher,
}

impl RecordStore {
    /// Open or create a store database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// then runs [`RecordStore::initialize`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>, key: &EncryptionKey) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL keeps readers from blocking on the single writer
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            path,
            conn: Mutex::new(conn),
            cipher: FieldCipher::new(key),
        };
        store.initialize()?;

        info!("Record store opened at {}", store.path.display());
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(key: &EncryptionKey) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(IN_MEMORY),
            source,
        })?;

        let store = Self {
            path: PathBuf::from(IN_MEMORY),
            conn: Mutex::new(conn),
            cipher: FieldCipher::new(key),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Create the schema if absent and record the initial schema version.
    ///
    /// Idempotent; safe to call on every process start.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;
        migrations::initialize_schema(&conn)
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add an employee and return the generated identifier.
    ///
    /// Government identifiers are validated before anything else happens; on
    /// success they are encrypted, and the record is inserted together with an
    /// `add_employee` audit entry in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed identifier, an encryption
    /// error if sealing fails, or a database error.
    pub fn add_employee(&self, actor: &str, mut fields: EmployeeFields) -> Result<String> {
        validation::validate_employee(&mut fields)?;

        let national_id = self.cipher.encrypt(fields.national_id.as_deref())?;
        let tax_id = self.cipher.encrypt(fields.tax_id.as_deref())?;
        let salary_history = serde_json::to_string(&fields.salary_history)?;
        let custom_fields = serde_json::to_string(&fields.custom_fields)?;
        let hire_date = fields
            .hire_date
            .map(|d| d.format(DATE_FORMAT).to_string());

        let employee_id = Uuid::new_v4().to_string();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            r"
            INSERT INTO employees (
                employee_id, name, address, contact_number, family_contact_person,
                family_contact_number, blood_group, medicines, relationship, reference,
                national_id, tax_id, address_proof, photo, hire_date,
                salary_history, consent_given, custom_fields
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            ",
            params![
                employee_id,
                fields.name,
                fields.address,
                fields.contact_number,
                fields.family_contact_person,
                fields.family_contact_number,
                fields.blood_group,
                fields.medicines,
                fields.relationship,
                fields.reference,
                national_id,
                tax_id,
                fields.address_proof,
                fields.photo,
                hire_date,
                salary_history,
                fields.consent_given,
                custom_fields,
            ],
        )?;
        audit::insert_entry(
            &tx,
            actor,
            actions::ADD_EMPLOYEE,
            &format!("employee_id={employee_id}"),
        )?;
        tx.commit()?;

        info!(%employee_id, actor, "Added employee");
        Ok(employee_id)
    }

    /// Fetch an employee by identifier, decrypting the sensitive fields.
    ///
    /// Reads are not audited; callers that need read auditing should call
    /// [`RecordStore::log_action`] themselves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decryption`] if a stored identifier cannot be opened
    /// under the current key, or a database error.
    pub fn get_employee(&self, employee_id: &str) -> Result<Option<EmployeeRecord>> {
        let stored = {
            let conn = self.lock()?;
            conn.query_row(
                r"
                SELECT employee_id, name, address, contact_number, family_contact_person,
                       family_contact_number, blood_group, medicines, relationship, reference,
                       national_id, tax_id, address_proof, photo, hire_date,
                       salary_history, consent_given, custom_fields
                FROM employees WHERE employee_id = ?1
                ",
                [employee_id],
                StoredEmployee::from_row,
            )
            .optional()?
        };

        stored.map(|s| s.decrypt(&self.cipher)).transpose()
    }

    /// List active employees by name without touching encrypted columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_employees(&self) -> Result<Vec<EmployeeSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r"
            SELECT employee_id, name, hire_date
            FROM employees ORDER BY name ASC, employee_id ASC
            ",
        )?;

        let employees = stmt
            .query_map([], |row| {
                Ok(EmployeeSummary {
                    employee_id: row.get(0)?,
                    name: row.get(1)?,
                    hire_date: optional_date_column(row, 2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(employees)
    }

    /// Count active employees.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn employee_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete an employee, keeping a snapshot in the deleted-records table.
    ///
    /// The snapshot, the removal and the `delete_employee` audit entry commit
    /// together.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no active employee has this identifier;
    /// nothing is written in that case.
    pub fn delete_employee(
        &self,
        employee_id: &str,
        actor: &str,
        reason: &str,
        details: &str,
    ) -> Result<DeletedRecord> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let name: Option<String> = tx
            .query_row(
                "SELECT name FROM employees WHERE employee_id = ?1",
                [employee_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::not_found("employee", employee_id))?;

        let deleted_at = models::now();
        tx.execute(
            r"
            INSERT INTO deleted_employees (
                employee_id, name, deletion_date, deletion_reason, deletion_details, deleted_by
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                employee_id,
                name,
                format_timestamp(&deleted_at),
                reason,
                details,
                actor
            ],
        )?;
        let snapshot_id = tx.last_insert_rowid();

        tx.execute("DELETE FROM employees WHERE employee_id = ?1", [employee_id])?;
        audit::insert_entry(
            &tx,
            actor,
            actions::DELETE_EMPLOYEE,
            &format!("employee_id={employee_id} reason={reason}"),
        )?;
        tx.commit()?;

        info!(%employee_id, actor, reason, "Deleted employee");
        Ok(DeletedRecord {
            id: snapshot_id,
            employee_id: employee_id.to_string(),
            name,
            deleted_at,
            reason: reason.to_string(),
            details: details.to_string(),
            deleted_by: actor.to_string(),
        })
    }

    /// List deletion snapshots, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn deleted_records(&self) -> Result<Vec<DeletedRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, employee_id, name, deletion_date, deletion_reason,
                   deletion_details, deleted_by
            FROM deleted_employees ORDER BY id ASC
            ",
        )?;

        let records = stmt
            .query_map([], |row| {
                Ok(DeletedRecord {
                    id: row.get(0)?,
                    employee_id: row.get(1)?,
                    name: row.get(2)?,
                    deleted_at: timestamp_column(row, 3)?,
                    reason: row.get(4)?,
                    details: row.get(5)?,
                    deleted_by: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Append an entry to the audit trail.
    ///
    /// Used by collaborators to record actions that do not go through the
    /// store, such as logins or exports.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn log_action(&self, actor: &str, action: &str, details: &str) -> Result<AuditEntry> {
        let conn = self.lock()?;
        let entry = audit::insert_entry(&conn, actor, action, details)?;
        debug!(actor, action, "Logged action");
        Ok(entry)
    }

    /// Record an attendance entry for an active employee.
    ///
    /// Several entries for the same employee and date are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the employee does not exist, or a
    /// database error.
    pub fn record_attendance(&self, actor: &str, entry: &NewAttendance) -> Result<i64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE employee_id = ?1)",
            [&entry.employee_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::not_found("employee", entry.employee_id.clone()));
        }

        let date = entry.date.format(DATE_FORMAT).to_string();
        tx.execute(
            r"
            INSERT INTO attendance (
                employee_id, date, salary, role, is_sunday,
                leave_type, temporary_salary, anomaly_flag
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                entry.employee_id,
                date,
                entry.salary,
                entry.role,
                entry.is_sunday,
                entry.leave_type,
                entry.temporary_salary,
                entry.anomaly_flag,
            ],
        )?;
        let id = tx.last_insert_rowid();

        audit::insert_entry(
            &tx,
            actor,
            actions::RECORD_ATTENDANCE,
            &format!("employee_id={} date={date} id={id}", entry.employee_id),
        )?;
        tx.commit()?;

        debug!(id, employee_id = %entry.employee_id, "Recorded attendance");
        Ok(id)
    }

    /// List attendance entries with `start <= date <= end`, ordered by date.
    ///
    /// An inverted range yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_attendance(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<AttendanceEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, employee_id, date, salary, role, is_sunday,
                   leave_type, temporary_salary, anomaly_flag
            FROM attendance
            WHERE date >= ?1 AND date <= ?2
            ORDER BY date ASC, id ASC
            ",
        )?;

        let entries = stmt
            .query_map(
                params![
                    start.format(DATE_FORMAT).to_string(),
                    end.format(DATE_FORMAT).to_string()
                ],
                Self::row_to_attendance,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Query the audit trail.
    #[must_use]
    pub fn audit_trail(&self) -> AuditTrail<'_> {
        AuditTrail::new(self)
    }

    /// Count all audit entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn audit_count(&self) -> Result<i64> {
        self.audit_trail().count()
    }

    /// Get the schema version row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn schema_version(&self) -> Result<Option<SchemaVersion>> {
        let conn = self.lock()?;
        migrations::get_schema_version(&conn)
    }

    /// Fold the write-ahead log into the database file.
    ///
    /// Run before copying the database file (for instance before a backup)
    /// so the file on disk holds every committed change.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint fails.
    pub fn checkpoint(&self) -> Result<()> {
        if self.path.as_os_str() == IN_MEMORY {
            return Ok(());
        }

        let conn = self.lock()?;
        let busy: i64 = conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| row.get(0))?;
        if busy != 0 {
            warn!("WAL checkpoint could not complete; database file may lag");
        } else {
            debug!("WAL checkpoint complete for {}", self.path.display());
        }
        Ok(())
    }

    /// Run an ad-hoc query against the underlying connection.
    ///
    /// The closure runs under the store lock. It is meant for reads; writes
    /// made through it bypass validation, encryption and auditing.
    ///
    /// # Errors
    ///
    /// Returns whatever error the closure produces.
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.lock()?;
        Ok(f(&conn)?)
    }

    /// Lock the connection.
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::storage("record store lock poisoned"))
    }

    /// Convert a database row to an attendance entry.
    fn row_to_attendance(row: &Row) -> rusqlite::Result<AttendanceEntry> {
        Ok(AttendanceEntry {
            id: row.get(0)?,
            employee_id: row.get(1)?,
            date: date_column(row, 2)?,
            salary: row.get(3)?,
            role: row.get(4)?,
            is_sunday: row.get(5)?,
            leave_type: row.get(6)?,
            temporary_salary: row.get(7)?,
            anomaly_flag: row.get(8)?,
        })
    }
}

/// An employee row as stored: identifiers still sealed, maps still JSON.
struct StoredEmployee {
    employee_id: String,
    fields: EmployeeFields,
    salary_history: String,
    custom_fields: String,
}

impl StoredEmployee {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            employee_id: row.get(0)?,
            fields: EmployeeFields {
                name: row.get(1)?,
                address: row.get(2)?,
                contact_number: row.get(3)?,
                family_contact_person: row.get(4)?,
                family_contact_number: row.get(5)?,
                blood_group: row.get(6)?,
                medicines: row.get(7)?,
                relationship: row.get(8)?,
                reference: row.get(9)?,
                national_id: row.get(10)?,
                tax_id: row.get(11)?,
                address_proof: row.get(12)?,
                photo: row.get(13)?,
                hire_date: optional_date_column(row, 14)?,
                consent_given: row.get(16)?,
                ..EmployeeFields::default()
            },
            salary_history: row.get(15)?,
            custom_fields: row.get(17)?,
        })
    }

    fn decrypt(self, cipher: &FieldCipher) -> Result<EmployeeRecord> {
        let mut fields = self.fields;
        fields.national_id = cipher.decrypt(fields.national_id.as_deref())?;
        fields.tax_id = cipher.decrypt(fields.tax_id.as_deref())?;
        fields.salary_history = serde_json::from_str(&self.salary_history)?;
        fields.custom_fields = serde_json::from_str(&self.custom_fields)?;

        Ok(EmployeeRecord {
            employee_id: self.employee_id,
            fields,
        })
    }
}

/// Read a timestamp column written by [`format_timestamp`].
pub(crate) fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn date_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_date_column(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        NaiveDate::parse_from_str(&value, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_store() -> RecordStore {
        RecordStore::open_in_memory(&EncryptionKey::generate()).expect("failed to create test store")
    }

    fn valid_fields(name: &str) -> EmployeeFields {
        EmployeeFields {
            name: Some(name.to_string()),
            national_id: Some("123456789012".to_string()),
            tax_id: Some("ABCDE1234F".to_string()),
            hire_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            consent_given: true,
            ..EmployeeFields::default()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_open_in_memory() {
        let store = create_test_store();
        assert_eq!(store.path().to_string_lossy(), ":memory:");
        assert_eq!(store.employee_count().unwrap(), 0);
    }

    #[test]
    fn test_add_and_get_round_trip() {
        let store = create_test_store();
        let mut fields = valid_fields("Ravi");
        fields.salary_history.insert("2024".to_string(), json!(18000));
        fields.custom_fields.insert("shift".to_string(), json!("night"));

        let id = store.add_employee("admin", fields.clone()).unwrap();
        let record = store.get_employee(&id).unwrap().unwrap();

        assert_eq!(record.employee_id, id);
        assert_eq!(record.fields, fields);
    }

    #[test]
    fn test_sensitive_fields_never_stored_in_plaintext() {
        let store = create_test_store();
        let id = store.add_employee("admin", valid_fields("Ravi")).unwrap();

        let (national_id, tax_id): (String, String) = store
            .with_connection(|conn| {
                conn.query_row(
                    "SELECT national_id, tax_id FROM employees WHERE employee_id = ?1",
                    [&id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
            })
            .unwrap();

        assert!(!national_id.contains("123456789012"));
        assert!(!tax_id.contains("ABCDE1234F"));
    }

    #[test]
    fn test_absent_sensitive_fields_stay_absent() {
        let store = create_test_store();
        let fields = EmployeeFields {
            name: Some("No IDs".to_string()),
            ..EmployeeFields::default()
        };

        let id = store.add_employee("admin", fields).unwrap();
        let record = store.get_employee(&id).unwrap().unwrap();
        assert!(record.fields.national_id.is_none());
        assert!(record.fields.tax_id.is_none());
    }

    #[test]
    fn test_invalid_national_ids_rejected_without_side_effects() {
        let store = create_test_store();

        for bad in ["12345", "1234567890123", "12a456789012"] {
            let mut fields = valid_fields("Bad");
            fields.national_id = Some(bad.to_string());

            let err = store.add_employee("admin", fields).unwrap_err();
            assert!(
                matches!(err, Error::Validation { field: "national_id", .. }),
                "{bad}"
            );
        }

        assert_eq!(store.employee_count().unwrap(), 0);
        assert_eq!(store.audit_count().unwrap(), 0);
    }

    #[test]
    fn test_invalid_tax_id_rejected() {
        let store = create_test_store();
        let mut fields = valid_fields("Bad");
        fields.tax_id = Some("ABCDE123".to_string());

        let err = store.add_employee("admin", fields).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "tax_id", .. }));
        assert_eq!(store.employee_count().unwrap(), 0);
        assert_eq!(store.audit_count().unwrap(), 0);
    }

    #[test]
    fn test_identifiers_are_unique() {
        let store = create_test_store();
        let a = store.add_employee("admin", valid_fields("A")).unwrap();
        let b = store.add_employee("admin", valid_fields("B")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_get_nonexistent() {
        let store = create_test_store();
        assert!(store.get_employee("missing").unwrap().is_none());
    }

    #[test]
    fn test_get_with_wrong_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("employees.sqlite");

        let id = {
            let store = RecordStore::open(&db_path, &EncryptionKey::generate()).unwrap();
            store.add_employee("admin", valid_fields("Ravi")).unwrap()
        };

        let store = RecordStore::open(&db_path, &EncryptionKey::generate()).unwrap();
        let err = store.get_employee(&id).unwrap_err();
        assert!(matches!(err, Error::Decryption { .. }));
    }

    #[test]
    fn test_audit_counts_follow_mutations_only() {
        let store = create_test_store();

        let id = store.add_employee("admin", valid_fields("Ravi")).unwrap();
        assert_eq!(store.audit_count().unwrap(), 1);

        store.get_employee(&id).unwrap();
        assert_eq!(store.audit_count().unwrap(), 1);

        store
            .delete_employee(&id, "admin", "resigned", "left for studies")
            .unwrap();
        assert_eq!(store.audit_count().unwrap(), 2);

        let labels: Vec<String> = store
            .audit_trail()
            .iter()
            .map(|e| e.unwrap().action)
            .collect();
        assert_eq!(labels, [actions::ADD_EMPLOYEE, actions::DELETE_EMPLOYEE]);
    }

    #[test]
    fn test_delete_moves_record_to_snapshot() {
        let store = create_test_store();
        let id = store.add_employee("admin", valid_fields("Ravi")).unwrap();

        let deleted = store
            .delete_employee(&id, "hr-lead", "terminated", "policy breach")
            .unwrap();
        assert_eq!(deleted.employee_id, id);
        assert_eq!(deleted.name.as_deref(), Some("Ravi"));
        assert_eq!(deleted.deleted_by, "hr-lead");

        assert!(store.get_employee(&id).unwrap().is_none());
        let snapshots = store.deleted_records().unwrap();
        assert_eq!(snapshots, vec![deleted]);
    }

    #[test]
    fn test_delete_nonexistent_changes_nothing() {
        let store = create_test_store();
        store.add_employee("admin", valid_fields("Ravi")).unwrap();

        let err = store
            .delete_employee("missing", "admin", "typo", "")
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("missing"));

        assert_eq!(store.employee_count().unwrap(), 1);
        assert_eq!(store.audit_count().unwrap(), 1);
        assert!(store.deleted_records().unwrap().is_empty());
    }

    #[test]
    fn test_log_action() {
        let store = create_test_store();
        let entry = store.log_action("clerk", "export", "attendance.xlsx").unwrap();

        assert_eq!(entry.actor, "clerk");
        assert_eq!(entry.action, "export");
        assert_eq!(store.audit_count().unwrap(), 1);

        let stored = store.audit_trail().iter().next().unwrap().unwrap();
        assert_eq!(stored, entry);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let store = create_test_store();
        let before = store.schema_version().unwrap().unwrap();
        store.initialize().unwrap();
        store.initialize().unwrap();
        assert_eq!(store.schema_version().unwrap().unwrap(), before);
        assert_eq!(before.version, migrations::CURRENT_VERSION);
    }

    #[test]
    fn test_record_and_list_attendance() {
        let store = create_test_store();
        let id = store.add_employee("admin", valid_fields("Ravi")).unwrap();

        store
            .record_attendance("admin", &NewAttendance::new(&id, date(2025, 1, 6), 500.0, "mason"))
            .unwrap();
        store
            .record_attendance(
                "admin",
                &NewAttendance::new(&id, date(2025, 1, 5), 0.0, "mason").with_leave_type("weekly"),
            )
            .unwrap();
        store
            .record_attendance("admin", &NewAttendance::new(&id, date(2025, 2, 1), 500.0, "mason"))
            .unwrap();

        let january = store
            .list_attendance(date(2025, 1, 1), date(2025, 1, 31))
            .unwrap();
        assert_eq!(january.len(), 2);
        assert_eq!(january[0].date, date(2025, 1, 5));
        assert!(january[0].is_sunday);
        assert_eq!(january[0].leave_type.as_deref(), Some("weekly"));
        assert_eq!(january[1].date, date(2025, 1, 6));

        // Range bounds are inclusive.
        let single = store
            .list_attendance(date(2025, 2, 1), date(2025, 2, 1))
            .unwrap();
        assert_eq!(single.len(), 1);

        assert!(store
            .list_attendance(date(2025, 3, 1), date(2025, 1, 1))
            .unwrap()
            .is_empty());
        assert_eq!(store.audit_count().unwrap(), 4);
    }

    #[test]
    fn test_duplicate_attendance_is_accepted() {
        let store = create_test_store();
        let id = store.add_employee("admin", valid_fields("Ravi")).unwrap();
        let entry = NewAttendance::new(&id, date(2025, 1, 6), 500.0, "mason");

        let a = store.record_attendance("admin", &entry).unwrap();
        let b = store.record_attendance("admin", &entry).unwrap();
        assert!(b > a);
        assert_eq!(
            store
                .list_attendance(date(2025, 1, 6), date(2025, 1, 6))
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_attendance_for_unknown_employee_rejected() {
        let store = create_test_store();
        let err = store
            .record_attendance("admin", &NewAttendance::new("ghost", date(2025, 1, 6), 1.0, "x"))
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.audit_count().unwrap(), 0);
    }

    #[test]
    fn test_list_employees() {
        let store = create_test_store();
        store.add_employee("admin", valid_fields("Zara")).unwrap();
        store.add_employee("admin", valid_fields("Anil")).unwrap();

        let names: Vec<Option<String>> = store
            .list_employees()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, [Some("Anil".to_string()), Some("Zara".to_string())]);
    }

    #[test]
    fn test_concurrent_adds_are_serialized() {
        let store = std::sync::Arc::new(create_test_store());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..5 {
                        store
                            .add_employee("admin", valid_fields(&format!("T{t}-{i}")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.employee_count().unwrap(), 20);
        assert_eq!(store.audit_count().unwrap(), 20);
    }

    #[test]
    fn test_open_file_based_and_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested/employees.sqlite");
        let key = EncryptionKey::generate();

        let store = RecordStore::open(&db_path, &key).unwrap();
        let id = store.add_employee("admin", valid_fields("Ravi")).unwrap();
        store.checkpoint().unwrap();
        assert_eq!(store.path(), db_path);
        drop(store);

        let reopened = RecordStore::open(&db_path, &key).unwrap();
        let record = reopened.get_employee(&id).unwrap().unwrap();
        assert_eq!(record.fields.national_id.as_deref(), Some("123456789012"));
    }
}
