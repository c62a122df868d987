//! Database migration system for the record store.
//!
//! Creates the schema on first use and maintains the single
//! `schema_version` row. Safe to run on every process start.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::models::{format_timestamp, parse_timestamp, SchemaVersion};
use super::schema::SCHEMA_STATEMENTS;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Initialize the database schema.
///
/// Creates all tables, indexes and triggers if they don't exist. The version
/// row is inserted only when none exists yet; an existing row at the current
/// version is left untouched.
///
/// # Errors
///
/// Returns an error if schema creation fails or the stored version is newer
/// than this build understands.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    for statement in SCHEMA_STATEMENTS {
        tx.execute_batch(statement)?;
    }

    match get_schema_version(&tx)? {
        None => {
            run_migrations(&tx, 0)?;
            info!("Initialized schema at version {}", CURRENT_VERSION);
        }
        Some(existing) if existing.version < CURRENT_VERSION => {
            run_migrations(&tx, existing.version)?;
            info!(
                "Migrated schema from version {} to {}",
                existing.version, CURRENT_VERSION
            );
        }
        Some(existing) if existing.version > CURRENT_VERSION => {
            return Err(Error::DatabaseMigration {
                message: format!(
                    "database schema version {} is newer than supported version {}",
                    existing.version, CURRENT_VERSION
                ),
            });
        }
        Some(_) => debug!("Schema already at version {}", CURRENT_VERSION),
    }

    tx.commit()?;
    Ok(())
}

/// Get the schema version row, if one exists.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row cannot be parsed.
pub fn get_schema_version(conn: &Connection) -> Result<Option<SchemaVersion>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT version_id, last_updated FROM schema_version LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    row.map(|(version_id, last_updated)| {
        let version = version_id.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {version_id}"),
        })?;
        let last_updated = parse_timestamp(&last_updated).ok_or_else(|| {
            Error::DatabaseMigration {
                message: format!("invalid schema timestamp: {last_updated}"),
            }
        })?;
        Ok(SchemaVersion {
            version,
            last_updated,
        })
    })
    .transpose()
}

/// Replace the version row, keeping the table at exactly one row.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version_id, last_updated) VALUES (?1, ?2)",
        (version.to_string(), format_timestamp(&Utc::now())),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < CURRENT_VERSION {
        current += 1;
        run_migration(conn, current)?;
    }

    set_schema_version(conn, CURRENT_VERSION)
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Migration to version 1 (initial schema).
///
/// Version 1 is the base schema created by `SCHEMA_STATEMENTS`.
#[allow(clippy::unnecessary_wraps)]
fn migrate_v1(_conn: &Connection) -> Result<()> {
    Ok(())
}
