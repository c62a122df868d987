//! Validation of government identifiers.
//!
//! Runs before any encryption or persistence so that a rejected record
//! leaves no trace in the store or the audit trail.

use std::sync::LazyLock;

use regex::Regex;

use super::models::EmployeeFields;
use crate::error::{Error, Result};

/// Length of a national identity number.
pub const NATIONAL_ID_LEN: usize = 12;

/// Length of a tax identifier.
pub const TAX_ID_LEN: usize = 10;

static NATIONAL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{12}$").expect("Invalid regex pattern"));

/// Check a national identity number: exactly 12 ASCII digits.
///
/// # Errors
///
/// Returns [`Error::Validation`] naming `national_id`.
pub fn validate_national_id(value: &str) -> Result<()> {
    if NATIONAL_ID.is_match(value) {
        Ok(())
    } else {
        Err(Error::validation(
            "national_id",
            format!("must be exactly {NATIONAL_ID_LEN} digits"),
        ))
    }
}

/// Check a tax identifier: exactly 10 characters.
///
/// # Errors
///
/// Returns [`Error::Validation`] naming `tax_id`.
pub fn validate_tax_id(value: &str) -> Result<()> {
    let len = value.chars().count();
    if len == TAX_ID_LEN {
        Ok(())
    } else {
        Err(Error::validation(
            "tax_id",
            format!("must be exactly {TAX_ID_LEN} characters, got {len}"),
        ))
    }
}

/// Normalize and validate the sensitive fields of a new employee.
///
/// Empty identifiers are treated as absent.
///
/// # Errors
///
/// Returns the first [`Error::Validation`] encountered.
pub fn validate_employee(fields: &mut EmployeeFields) -> Result<()> {
    for slot in [&mut fields.national_id, &mut fields.tax_id] {
        if slot.as_deref().is_some_and(str::is_empty) {
            *slot = None;
        }
    }

    if let Some(national_id) = fields.national_id.as_deref() {
        validate_national_id(national_id)?;
    }
    if let Some(tax_id) = fields.tax_id.as_deref() {
        validate_tax_id(tax_id)?;
    }
    Ok(())
}
