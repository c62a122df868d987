//! Error types for payroll.
//!
//! This module defines all error types used throughout the payroll crate.
//! Every variant carries enough context (field name, identifier, archive
//! entry, path) for a caller to act on it without inspecting internals.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for payroll operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Validation Errors ===
    /// A field failed validation before anything was written.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the validation failure.
        message: String,
    },

    /// The requested record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What kind of record was looked up.
        kind: &'static str,
        /// The identifier that did not resolve.
        id: String,
    },

    // === Key and Encryption Errors ===
    /// The key file could not be created or read.
    #[error("key file {path} unavailable: {source}")]
    KeyIo {
        /// Path to the key file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The key file exists but does not hold a usable key.
    #[error("key file {path} is invalid: {message}")]
    KeyInvalid {
        /// Path to the key file.
        path: PathBuf,
        /// Description of what is wrong with it.
        message: String,
    },

    /// A value could not be encrypted.
    #[error("encryption failed: {reason}")]
    Encryption {
        /// Description of what went wrong.
        reason: String,
    },

    /// A stored value could not be decrypted under the current key.
    #[error("decryption failed: {reason}")]
    Decryption {
        /// Description of what went wrong.
        reason: String,
    },

    // === Archive Errors ===
    /// A restore was rejected because an entry would escape the target directory.
    #[error("unsafe path in archive: {entry}")]
    UnsafeArchive {
        /// The offending entry name as stored in the archive.
        entry: String,
    },

    /// Reading or writing the zip container failed.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to create the schema or record its version.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// The persisted store is unavailable or holds unreadable data.
    #[error("storage unavailable: {message}")]
    Storage {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

}

/// A specialized Result type for payroll operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new validation error for the named field.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a new not-found error.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create a new decryption error.
    #[must_use]
    pub fn decryption(reason: impl Into<String>) -> Self {
        Self::Decryption {
            reason: reason.into(),
        }
    }

    /// Create a new storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Check if this error is a recoverable input validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error means the identifier did not resolve.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error came from the key file or the cipher.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::KeyIo { .. }
                | Self::KeyInvalid { .. }
                | Self::Encryption { .. }
                | Self::Decryption { .. }
        )
    }
}
