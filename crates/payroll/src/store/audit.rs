//! Read access to the append-only audit trail.
//!
//! Entries are only ever written by the store itself (inside the same
//! transaction as the change they describe) or through
//! [`RecordStore::log_action`]. This module exposes the read side: a
//! restartable, lazily paged listing ordered by timestamp, with ties broken
//! by insertion order.
//!
//! [`RecordStore::log_action`]: super::RecordStore::log_action

use std::collections::VecDeque;

use rusqlite::{params, Connection, Row};
use tracing::trace;
use uuid::Uuid;

use super::models::{self, format_timestamp, AuditEntry};
use super::{timestamp_column, RecordStore};
use crate::error::Result;

/// Action labels written by the store itself.
pub mod actions {
    /// An employee was added.
    pub const ADD_EMPLOYEE: &str = "add_employee";
    /// An employee was deleted.
    pub const DELETE_EMPLOYEE: &str = "delete_employee";
    /// An attendance entry was recorded.
    pub const RECORD_ATTENDANCE: &str = "record_attendance";
}

/// Default number of entries fetched per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A query over the audit trail.
///
/// Each call to [`AuditTrail::iter`] starts again from the oldest entry, so
/// the same query can be replayed for review and then for export.
#[derive(Debug, Clone)]
pub struct AuditTrail<'a> {
    store: &'a RecordStore,
    actor: Option<String>,
    page_size: usize,
}

impl<'a> AuditTrail<'a> {
    pub(super) fn new(store: &'a RecordStore) -> Self {
        Self {
            store,
            actor: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Only list entries recorded for `actor`.
    #[must_use]
    pub fn by_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Number of entries fetched from the database per page (minimum 1).
    #[must_use]
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Start a fresh pass over the matching entries.
    #[must_use]
    pub fn iter(&self) -> AuditIter<'a> {
        AuditIter {
            trail: self.clone(),
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Count the matching entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let conn = self.store.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM audit_log WHERE (?1 IS NULL OR user_id = ?1)",
            [self.actor.as_deref()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn fetch_page(&self, cursor: Option<&(String, i64)>) -> Result<Vec<AuditEntry>> {
        let conn = self.store.lock()?;
        let mut stmt = conn.prepare_cached(
            r"
            SELECT seq, action_id, user_id, action, timestamp, details
            FROM audit_log
            WHERE (?1 IS NULL OR user_id = ?1)
              AND (?2 IS NULL OR timestamp > ?2 OR (timestamp = ?2 AND seq > ?3))
            ORDER BY timestamp ASC, seq ASC
            LIMIT ?4
            ",
        )?;

        let limit = i64::try_from(self.page_size).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map(
                params![
                    self.actor,
                    cursor.map(|(ts, _)| ts.as_str()),
                    cursor.map_or(0, |(_, seq)| *seq),
                    limit
                ],
                row_to_audit_entry,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        trace!("Fetched {} audit entries", entries.len());
        Ok(entries)
    }
}

impl<'a> IntoIterator for &AuditTrail<'a> {
    type Item = Result<AuditEntry>;
    type IntoIter = AuditIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over audit entries.
///
/// Pages are fetched on demand; the store lock is held only while a page is
/// read. Iteration stops after the first error.
#[derive(Debug)]
pub struct AuditIter<'a> {
    trail: AuditTrail<'a>,
    cursor: Option<(String, i64)>,
    buffer: VecDeque<AuditEntry>,
    exhausted: bool,
}

impl Iterator for AuditIter<'_> {
    type Item = Result<AuditEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            match self.trail.fetch_page(self.cursor.as_ref()) {
                Ok(page) => {
                    self.exhausted = page.len() < self.trail.page_size;
                    if let Some(last) = page.last() {
                        self.cursor = Some((format_timestamp(&last.timestamp), last.seq));
                    }
                    self.buffer.extend(page);
                }
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }

        self.buffer.pop_front().map(Ok)
    }
}

/// Append an entry to the audit log using the given connection.
///
/// Callers pass the open transaction of the change being audited so that the
/// change and its entry commit together.
pub(super) fn insert_entry(
    conn: &Connection,
    actor: &str,
    action: &str,
    details: &str,
) -> Result<AuditEntry> {
    let action_id = Uuid::new_v4().to_string();
    let timestamp = models::now();

    conn.execute(
        r"
        INSERT INTO audit_log (action_id, user_id, action, timestamp, details)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ",
        params![action_id, actor, action, format_timestamp(&timestamp), details],
    )?;

    Ok(AuditEntry {
        seq: conn.last_insert_rowid(),
        action_id,
        actor: actor.to_string(),
        action: action.to_string(),
        timestamp,
        details: details.to_string(),
    })
}

fn row_to_audit_entry(row: &Row) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        seq: row.get(0)?,
        action_id: row.get(1)?,
        actor: row.get(2)?,
        action: row.get(3)?,
        timestamp: timestamp_column(row, 4)?,
        details: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EncryptionKey;

    fn create_test_store() -> RecordStore {
        RecordStore::open_in_memory(&EncryptionKey::generate()).expect("failed to create store")
    }

    #[test]
    fn test_empty_trail() {
        let store = create_test_store();
        let trail = store.audit_trail();
        assert_eq!(trail.count().unwrap(), 0);
        assert_eq!(trail.iter().count(), 0);
    }

    #[test]
    fn test_entries_in_insertion_order_across_pages() {
        let store = create_test_store();
        for i in 0..7 {
            store.log_action("admin", "login", &format!("n={i}")).unwrap();
        }

        let trail = store.audit_trail().page_size(3);
        let details: Vec<String> = trail.iter().map(|e| e.unwrap().details).collect();
        let expected: Vec<String> = (0..7).map(|i| format!("n={i}")).collect();
        assert_eq!(details, expected);
    }

    #[test]
    fn test_ties_broken_by_insertion_order() {
        let store = create_test_store();
        {
            let conn = store.lock().unwrap();
            for (id, detail) in [("b", "first"), ("a", "second"), ("c", "third")] {
                conn.execute(
                    "INSERT INTO audit_log (action_id, user_id, action, timestamp, details)
                     VALUES (?1, 'u', 'x', '2025-01-01T00:00:00.000000Z', ?2)",
                    [id, detail],
                )
                .unwrap();
            }
        }

        let details: Vec<String> = store
            .audit_trail()
            .page_size(2)
            .iter()
            .map(|e| e.unwrap().details)
            .collect();
        assert_eq!(details, ["first", "second", "third"]);
    }

    #[test]
    fn test_trail_is_restartable() {
        let store = create_test_store();
        store.log_action("admin", "login", "").unwrap();
        store.log_action("admin", "export", "").unwrap();

        let trail = store.audit_trail();
        let first: Vec<_> = trail.iter().map(|e| e.unwrap().action_id).collect();
        let second: Vec<_> = (&trail).into_iter().map(|e| e.unwrap().action_id).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_iterator_is_lazy() {
        let store = create_test_store();
        store.log_action("admin", "one", "").unwrap();

        let trail = store.audit_trail();
        let mut iter = trail.iter();
        // Entries added before the first page is fetched are visible.
        store.log_action("admin", "two", "").unwrap();
        assert_eq!(iter.next().unwrap().unwrap().action, "one");
        assert_eq!(iter.next().unwrap().unwrap().action, "two");
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_by_actor() {
        let store = create_test_store();
        store.log_action("alice", "login", "").unwrap();
        store.log_action("bob", "login", "").unwrap();
        store.log_action("alice", "export", "").unwrap();

        let trail = store.audit_trail().by_actor("alice");
        assert_eq!(trail.count().unwrap(), 2);
        assert!(trail.iter().all(|e| e.unwrap().actor == "alice"));
    }

    #[test]
    fn test_action_ids_are_unique() {
        let store = create_test_store();
        let a = store.log_action("admin", "login", "").unwrap();
        let b = store.log_action("admin", "login", "").unwrap();
        assert_ne!(a.action_id, b.action_id);
        assert!(a.seq < b.seq);
    }
}
