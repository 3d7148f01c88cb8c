//! SQLite store backend for persistent thumbnails.

use super::{Admission, AdmissionResult, CacheEntry, EntryMetadata, StoreStats, ThumbnailStore};
use crate::error::StoreError;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS thumbnails (
        key TEXT PRIMARY KEY,
        blob BLOB NOT NULL,
        size_bytes INTEGER NOT NULL,
        timestamp INTEGER NOT NULL,
        access_count INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_thumbnails_timestamp ON thumbnails(timestamp);
    CREATE INDEX IF NOT EXISTS idx_thumbnails_access_count ON thumbnails(access_count);
";

/// SQLite-backed persistent thumbnail store
///
/// Uses WAL (Write-Ahead Logging) mode so readers proceed while a write
/// is in flight. Every trait method runs inside a single transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a thumbnail database at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| open_error(path, e))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| open_error(path, e))?;

        Self::with_connection(conn, path)
    }

    /// Open a private, non-persistent database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let path = Path::new(":memory:");
        let conn = Connection::open_in_memory().map_err(|e| open_error(path, e))?;

        Self::with_connection(conn, path)
    }

    fn with_connection(conn: Connection, path: &Path) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(|e| open_error(path, e))?;

        tracing::debug!("Opened thumbnail store at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::LockPoisoned("SQLite connection".to_string()))
    }

    fn metadata_from_row(row: &Row<'_>) -> rusqlite::Result<EntryMetadata> {
        Ok(EntryMetadata {
            key: row.get(0)?,
            size_bytes: row.get::<_, i64>(1)? as u64,
            timestamp: row.get::<_, i64>(2)? as u64,
            access_count: row.get::<_, i64>(3)? as u64,
        })
    }

    fn select_metadata(conn: &Connection, key: &str) -> Result<Option<EntryMetadata>, StoreError> {
        Ok(conn
            .query_row(
                "SELECT key, size_bytes, timestamp, access_count FROM thumbnails WHERE key = ?",
                [key],
                Self::metadata_from_row,
            )
            .optional()?)
    }
}

/// A file that is not a database, or a damaged one, needs deleting
fn open_error(path: &Path, e: rusqlite::Error) -> StoreError {
    match e.sqlite_error_code() {
        Some(ErrorCode::NotADatabase) | Some(ErrorCode::DatabaseCorrupt) => StoreError::Corrupted {
            path: path.to_path_buf(),
        },
        _ => StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    }
}

impl ThumbnailStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let conn = self.lock()?;

        let entry = conn
            .query_row(
                "SELECT key, blob, size_bytes, timestamp, access_count
                 FROM thumbnails WHERE key = ?",
                [key],
                |row| {
                    Ok(CacheEntry {
                        key: row.get(0)?,
                        image_bytes: row.get(1)?,
                        size_bytes: row.get::<_, i64>(2)? as u64,
                        timestamp: row.get::<_, i64>(3)? as u64,
                        access_count: row.get::<_, i64>(4)? as u64,
                    })
                },
            )
            .optional()?;

        Ok(entry)
    }

    fn put(&self, entry: CacheEntry) -> Result<(), StoreError> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR REPLACE INTO thumbnails
             (key, blob, size_bytes, timestamp, access_count)
             VALUES (?, ?, ?, ?, ?)",
            params![
                entry.key,
                entry.image_bytes,
                entry.size_bytes as i64,
                entry.timestamp as i64,
                entry.access_count as i64,
            ],
        )?;

        Ok(())
    }

    fn touch(&self, key: &str, now_millis: u64) -> Result<Option<EntryMetadata>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let changed = tx.execute(
            "UPDATE thumbnails
             SET access_count = access_count + 1, timestamp = MAX(timestamp, ?)
             WHERE key = ?",
            params![now_millis as i64, key],
        )?;

        let meta = if changed == 0 {
            None
        } else {
            Self::select_metadata(&tx, key)?
        };

        tx.commit()?;
        Ok(meta)
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM thumbnails WHERE key = ?", [key])?;
        Ok(removed > 0)
    }

    fn put_with_eviction(
        &self,
        entry: CacheEntry,
        plan: &dyn Fn(&[EntryMetadata]) -> Admission,
    ) -> Result<AdmissionResult, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let others = {
            let mut stmt = tx.prepare(
                "SELECT key, size_bytes, timestamp, access_count FROM thumbnails
                 WHERE key != ? ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map([&entry.key], Self::metadata_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        let previous_total = others.iter().map(|m| m.size_bytes).sum();
        let admission = plan(&others);

        let mut evicted = Vec::with_capacity(admission.evict.len());
        for key in admission.evict.iter().filter(|key| **key != entry.key) {
            if let Some(meta) = Self::select_metadata(&tx, key)? {
                tx.execute("DELETE FROM thumbnails WHERE key = ?", [key])?;
                evicted.push(meta);
            }
        }

        let stored = if admission.admit {
            tx.execute(
                "INSERT OR REPLACE INTO thumbnails
                 (key, blob, size_bytes, timestamp, access_count)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    entry.key,
                    entry.image_bytes,
                    entry.size_bytes as i64,
                    entry.timestamp as i64,
                    entry.access_count as i64,
                ],
            )?;
            Some(entry.metadata())
        } else {
            None
        };

        tx.commit()?;
        Ok(AdmissionResult {
            previous_total,
            evicted,
            stored,
        })
    }

    fn all_metadata(&self) -> Result<Vec<EntryMetadata>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT key, size_bytes, timestamp, access_count FROM thumbnails ORDER BY rowid",
        )?;

        let entries = stmt
            .query_map([], Self::metadata_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    fn total_size(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;

        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM thumbnails",
            [],
            |row| row.get(0),
        )?;

        Ok(total as u64)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM thumbnails", [])?;
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.lock()?;

        let (count, total, oldest, newest): (i64, i64, Option<i64>, Option<i64>) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0), MIN(timestamp), MAX(timestamp)
                 FROM thumbnails",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        Ok(StoreStats {
            total_entries: count as usize,
            total_size_bytes: total as u64,
            oldest_entry: oldest.map(|t| t as u64),
            newest_entry: newest.map(|t| t as u64),
        })
    }
}
