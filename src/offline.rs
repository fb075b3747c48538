//! Local queue of occurrences captured without connectivity.
//!
//! Drafts are stored with a `PENDING` flag and listed back when the user chooses to
//! send them. After a successful upload the caller marks them `SYNCED` or removes
//! them. There is no conflict resolution or automatic retry.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use uuid::Uuid;

use crate::{GeoPoint, OfflineDraft, Result, SyncStatus};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS offline_occurrences (
        id TEXT PRIMARY KEY,
        description TEXT,
        photo_uri TEXT,
        lat REAL NOT NULL,
        lon REAL NOT NULL,
        category_id TEXT,
        created_at TEXT NOT NULL,
        sync_status TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_offline_sync_status ON offline_occurrences(sync_status);
"#;

const SELECT_COLUMNS: &str =
    "id, description, photo_uri, lat, lon, category_id, created_at, sync_status";

impl OfflineDraft {
    /// New pending draft with a random id, stamped with the current time.
    pub fn new(
        description: Option<String>,
        photo_uri: Option<String>,
        position: GeoPoint,
        category_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description,
            photo_uri,
            latitude: position.latitude,
            longitude: position.longitude,
            category_id,
            created_at: Utc::now().to_rfc3339(),
            sync_status: SyncStatus::Pending,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let sync_status: String = row.get(7)?;
        Ok(Self {
            id: row.get(0)?,
            description: row.get(1)?,
            photo_uri: row.get(2)?,
            latitude: row.get(3)?,
            longitude: row.get(4)?,
            category_id: row.get(5)?,
            created_at: row.get(6)?,
            sync_status: SyncStatus::from_wire(&sync_status),
        })
    }
}

/// Re-express an RFC 3339 timestamp in UTC. Unparseable values are stored as given.
fn utc_timestamp(created_at: &str) -> String {
    match DateTime::parse_from_rfc3339(created_at) {
        Ok(time) => time.with_timezone(&Utc).to_rfc3339(),
        Err(e) => {
            warn!("[OfflineStore] Keeping non-RFC 3339 timestamp {:?}: {}", created_at, e);
            created_at.to_string()
        }
    }
}

/// SQLite-backed draft queue. Owns one connection; not shared between threads.
pub struct OfflineStore {
    conn: Connection,
}

impl OfflineStore {
    /// Open (or create) the queue at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!("[OfflineStore] Opened {}", path.as_ref().display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Queue a draft as `PENDING`, whatever its own `sync_status` says.
    ///
    /// `created_at` is stored in UTC so drafts written with different offsets still list
    /// in time order. Returns `false` if a draft with the same id is already stored (it
    /// is left untouched).
    pub fn insert(&self, draft: &OfflineDraft) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO offline_occurrences
                (id, description, photo_uri, lat, lon, category_id, created_at, sync_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &draft.id,
                &draft.description,
                &draft.photo_uri,
                draft.latitude,
                draft.longitude,
                &draft.category_id,
                utc_timestamp(&draft.created_at),
                SyncStatus::Pending.as_str(),
            ],
        )?;

        if inserted > 0 {
            info!("[OfflineStore] Queued draft {}", draft.id);
        }
        Ok(inserted > 0)
    }

    /// Drafts still waiting to be sent, oldest first.
    pub fn pending(&self) -> Result<Vec<OfflineDraft>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM offline_occurrences WHERE sync_status = ?1 ORDER BY created_at ASC",
            SELECT_COLUMNS
        ))?;
        let drafts = stmt
            .query_map(params![SyncStatus::Pending.as_str()], OfflineDraft::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(drafts)
    }

    pub fn pending_count(&self) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM offline_occurrences WHERE sync_status = ?1",
            params![SyncStatus::Pending.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Flag a draft as uploaded. Returns `false` if no such draft exists.
    pub fn mark_synced(&self, id: &str) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE offline_occurrences SET sync_status = ?1 WHERE id = ?2",
            params![SyncStatus::Synced.as_str(), id],
        )?;
        Ok(updated > 0)
    }

    /// Delete a draft. Returns `false` if no such draft exists.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM offline_occurrences WHERE id = ?1", params![id])?;
        if deleted > 0 {
            debug!("[OfflineStore] Removed draft {}", id);
        }
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn draft(id: &str, created_at: &str) -> OfflineDraft {
        OfflineDraft {
            id: id.to_string(),
            description: Some(format!("draft {}", id)),
            photo_uri: None,
            latitude: -15.5369,
            longitude: -47.3316,
            category_id: Some("2".to_string()),
            created_at: created_at.to_string(),
            sync_status: SyncStatus::Pending,
        }
    }

    #[test]
    fn test_new_draft_is_pending_with_fresh_id() {
        let a = OfflineDraft::new(None, None, GeoPoint::new(-15.5, -47.3), None);
        let b = OfflineDraft::new(None, None, GeoPoint::new(-15.5, -47.3), None);
        assert_ne!(a.id, b.id);
        assert_eq!(a.sync_status, SyncStatus::Pending);
        assert_eq!(a.position(), GeoPoint::new(-15.5, -47.3));
        assert!(chrono::DateTime::parse_from_rfc3339(&a.created_at).is_ok());
    }

    #[test]
    fn test_insert_and_list_pending_oldest_first() {
        let store = OfflineStore::open_in_memory().unwrap();
        assert!(store.insert(&draft("b", "2024-05-02T10:00:00+00:00")).unwrap());
        assert!(store.insert(&draft("a", "2024-05-01T10:00:00+00:00")).unwrap());

        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, "a");
        assert_eq!(pending[1], draft("b", "2024-05-02T10:00:00+00:00"));
        assert_eq!(store.pending_count().unwrap(), 2);
    }

    #[test]
    fn test_pending_order_ignores_utc_offset() {
        let store = OfflineStore::open_in_memory().unwrap();
        // 09:00 at -03:00 is 12:00 UTC, later than 11:00 UTC
        store.insert(&draft("local", "2024-05-01T09:00:00-03:00")).unwrap();
        store.insert(&draft("utc", "2024-05-01T11:00:00+00:00")).unwrap();

        let pending = store.pending().unwrap();
        assert_eq!(pending[0].id, "utc");
        assert_eq!(pending[1].id, "local");
        assert_eq!(pending[1].created_at, "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_duplicate_insert_is_ignored() {
        let store = OfflineStore::open_in_memory().unwrap();
        assert!(store.insert(&draft("a", "2024-05-01T10:00:00+00:00")).unwrap());

        let mut changed = draft("a", "2024-05-03T10:00:00+00:00");
        changed.description = Some("changed".to_string());
        assert!(!store.insert(&changed).unwrap());

        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].description.as_deref(), Some("draft a"));
    }

    #[test]
    fn test_insert_always_stores_pending() {
        let store = OfflineStore::open_in_memory().unwrap();
        let mut synced = draft("a", "2024-05-01T10:00:00+00:00");
        synced.sync_status = SyncStatus::Synced;
        store.insert(&synced).unwrap();
        assert_eq!(store.pending().unwrap()[0].sync_status, SyncStatus::Pending);
    }

    #[test]
    fn test_mark_synced_and_remove() {
        let store = OfflineStore::open_in_memory().unwrap();
        store.insert(&draft("a", "2024-05-01T10:00:00+00:00")).unwrap();
        store.insert(&draft("b", "2024-05-02T10:00:00+00:00")).unwrap();

        assert!(store.mark_synced("a").unwrap());
        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "b");

        assert!(store.remove("b").unwrap());
        assert!(store.pending().unwrap().is_empty());

        assert!(!store.mark_synced("missing").unwrap());
        assert!(!store.remove("missing").unwrap());
    }

    #[test]
    fn test_drafts_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("offline.db");

        {
            let store = OfflineStore::open(&path).unwrap();
            store.insert(&draft("a", "2024-05-01T10:00:00+00:00")).unwrap();
        }

        let store = OfflineStore::open(&path).unwrap();
        assert_eq!(store.pending().unwrap().len(), 1);
    }
}
