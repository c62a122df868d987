//! Plain data types held by the record store.
//!
//! These structures carry no persistence logic; the mapping to and from
//! rows lives in the parent module.

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, SubsecRound, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Date format used for `hire_date` and attendance dates.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Personal fields of an employee.
///
/// Used both as the input to [`RecordStore::add_employee`] and, inside
/// [`EmployeeRecord`], as the decrypted output of a read.
///
/// [`RecordStore::add_employee`]: super::RecordStore::add_employee
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeFields {
    /// Full name.
    pub name: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Primary phone number.
    pub contact_number: Option<String>,
    /// Family member to contact in an emergency.
    pub family_contact_person: Option<String>,
    /// Phone number of the family contact.
    pub family_contact_number: Option<String>,
    /// Blood group.
    pub blood_group: Option<String>,
    /// Regular medication.
    pub medicines: Option<String>,
    /// Relationship of the family contact to the employee.
    pub relationship: Option<String>,
    /// Who referred the employee.
    pub reference: Option<String>,
    /// National identity number (12 digits). Encrypted at rest.
    pub national_id: Option<String>,
    /// Tax identifier (10 characters). Encrypted at rest.
    pub tax_id: Option<String>,
    /// Path of the address-proof scan, relative to the documents directory.
    pub address_proof: Option<String>,
    /// Path of the photo, relative to the documents directory.
    pub photo: Option<String>,
    /// Date of hire.
    pub hire_date: Option<NaiveDate>,
    /// Free-form salary history.
    pub salary_history: Map<String, Value>,
    /// Whether the employee consented to data processing.
    pub consent_given: bool,
    /// Arbitrary extra fields.
    pub custom_fields: Map<String, Value>,
}

/// An employee as returned by the store, sensitive fields decrypted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    /// Identifier generated when the record was added.
    pub employee_id: String,
    /// Personal fields.
    #[serde(flatten)]
    pub fields: EmployeeFields,
}

/// Lightweight listing row; never touches encrypted columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSummary {
    /// Employee identifier.
    pub employee_id: String,
    /// Full name.
    pub name: Option<String>,
    /// Date of hire.
    pub hire_date: Option<NaiveDate>,
}

/// Input for a new attendance entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttendance {
    /// Employee the entry belongs to.
    pub employee_id: String,
    /// Day worked.
    pub date: NaiveDate,
    /// Salary earned for the day.
    pub salary: f64,
    /// Role performed.
    pub role: String,
    /// Whether the day is a Sunday.
    pub is_sunday: bool,
    /// Leave type, if the day was a leave.
    pub leave_type: Option<String>,
    /// Temporary salary override for the day.
    pub temporary_salary: Option<f64>,
    /// Anomaly flag attached by an external checker.
    pub anomaly_flag: Option<String>,
}

impl NewAttendance {
    /// Create an attendance entry, deriving `is_sunday` from the date.
    #[must_use]
    pub fn new(
        employee_id: impl Into<String>,
        date: NaiveDate,
        salary: f64,
        role: impl Into<String>,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            date,
            salary,
            role: role.into(),
            is_sunday: date.weekday() == Weekday::Sun,
            leave_type: None,
            temporary_salary: None,
            anomaly_flag: None,
        }
    }

    /// Tag the entry with a leave type.
    #[must_use]
    pub fn with_leave_type(mut self, leave_type: impl Into<String>) -> Self {
        self.leave_type = Some(leave_type.into());
        self
    }

    /// Override the salary for this day only.
    #[must_use]
    pub fn with_temporary_salary(mut self, salary: f64) -> Self {
        self.temporary_salary = Some(salary);
        self
    }

    /// Attach an anomaly flag.
    #[must_use]
    pub fn with_anomaly_flag(mut self, flag: impl Into<String>) -> Self {
        self.anomaly_flag = Some(flag.into());
        self
    }
}

/// A stored attendance entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    /// Sequential identifier.
    pub id: i64,
    /// Employee the entry belongs to.
    pub employee_id: String,
    /// Day worked.
    pub date: NaiveDate,
    /// Salary earned for the day.
    pub salary: f64,
    /// Role performed.
    pub role: String,
    /// Whether the day is a Sunday.
    pub is_sunday: bool,
    /// Leave type, if any.
    pub leave_type: Option<String>,
    /// Temporary salary override, if any.
    pub temporary_salary: Option<f64>,
    /// Anomaly flag, if any.
    pub anomaly_flag: Option<String>,
}

/// Snapshot of an employee taken when the record was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRecord {
    /// Sequential identifier of the snapshot.
    pub id: i64,
    /// Identifier the employee had while active.
    pub employee_id: String,
    /// Name at deletion time.
    pub name: Option<String>,
    /// When the deletion happened.
    pub deleted_at: DateTime<Utc>,
    /// Short reason.
    pub reason: String,
    /// Free-text details.
    pub details: String,
    /// Actor who performed the deletion.
    pub deleted_by: String,
}

/// A single audit trail entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Insertion sequence; breaks timestamp ties.
    pub seq: i64,
    /// Generated unique identifier.
    pub action_id: String,
    /// Who performed the action.
    pub actor: String,
    /// Action label.
    pub action: String,
    /// When the action was recorded.
    pub timestamp: DateTime<Utc>,
    /// Free-text detail.
    pub details: String,
}

/// The schema version row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Schema version number.
    pub version: i32,
    /// When the row was last written.
    pub last_updated: DateTime<Utc>,
}

/// Current time at the precision timestamps are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Format a timestamp so that lexical order matches chronological order.
pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp written by [`format_timestamp`].
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
