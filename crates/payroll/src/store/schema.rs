//! `SQLite` schema definitions for the record store.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the active employees table.
///
/// `national_id` and `tax_id` only ever hold cipher tokens.
pub const CREATE_EMPLOYEES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS employees (
    employee_id TEXT PRIMARY KEY,
    name TEXT,
    address TEXT,
    contact_number TEXT,
    family_contact_person TEXT,
    family_contact_number TEXT,
    blood_group TEXT,
    medicines TEXT,
    relationship TEXT,
    reference TEXT,
    national_id TEXT,
    tax_id TEXT,
    address_proof TEXT,
    photo TEXT,
    hire_date TEXT,
    salary_history TEXT NOT NULL DEFAULT '{}',
    consent_given INTEGER NOT NULL DEFAULT 0,
    custom_fields TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the attendance table.
///
/// There is deliberately no uniqueness constraint on `(employee_id, date)`.
pub const CREATE_ATTENDANCE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS attendance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_id TEXT NOT NULL,
    date TEXT NOT NULL,
    salary REAL NOT NULL,
    role TEXT NOT NULL,
    is_sunday INTEGER NOT NULL DEFAULT 0,
    leave_type TEXT,
    temporary_salary REAL,
    anomaly_flag TEXT
)
";

/// SQL statement to create an index on attendance dates for range listings.
pub const CREATE_ATTENDANCE_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)
";

/// SQL statement to create an index on attendance `employee_id`.
pub const CREATE_ATTENDANCE_EMPLOYEE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_attendance_employee ON attendance(employee_id)
";

/// SQL statement to create the deleted employees table.
pub const CREATE_DELETED_EMPLOYEES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS deleted_employees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_id TEXT NOT NULL,
    name TEXT,
    deletion_date TEXT NOT NULL,
    deletion_reason TEXT NOT NULL,
    deletion_details TEXT NOT NULL,
    deleted_by TEXT NOT NULL
)
";

/// SQL statement to create the audit log table.
///
/// `seq` records insertion order and breaks timestamp ties.
pub const CREATE_AUDIT_LOG_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS audit_log (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    action_id TEXT NOT NULL UNIQUE,
    user_id TEXT NOT NULL,
    action TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    details TEXT NOT NULL
)
";

/// SQL statement to create an index matching the audit trail ordering.
pub const CREATE_AUDIT_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp, seq)
";

/// Trigger rejecting updates to audit entries.
pub const CREATE_AUDIT_NO_UPDATE_TRIGGER: &str = r"
CREATE TRIGGER IF NOT EXISTS audit_log_no_update
BEFORE UPDATE ON audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit_log is append-only');
END
";

/// Trigger rejecting deletes of audit entries.
pub const CREATE_AUDIT_NO_DELETE_TRIGGER: &str = r"
CREATE TRIGGER IF NOT EXISTS audit_log_no_delete
BEFORE DELETE ON audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit_log is append-only');
END
";

/// SQL statement to create the schema version table (a single row).
pub const CREATE_SCHEMA_VERSION_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS schema_version (
    version_id TEXT PRIMARY KEY,
    last_updated TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_EMPLOYEES_TABLE,
    CREATE_ATTENDANCE_TABLE,
    CREATE_ATTENDANCE_DATE_INDEX,
    CREATE_ATTENDANCE_EMPLOYEE_INDEX,
    CREATE_DELETED_EMPLOYEES_TABLE,
    CREATE_AUDIT_LOG_TABLE,
    CREATE_AUDIT_TIMESTAMP_INDEX,
    CREATE_AUDIT_NO_UPDATE_TRIGGER,
    CREATE_AUDIT_NO_DELETE_TRIGGER,
    CREATE_SCHEMA_VERSION_TABLE,
];
