//! `UploadQueue` (spec.md §4.2): a durable table of `PendingUpload` rows
//! backed by `rusqlite`, mirroring the teacher's habit of a small
//! embedded store for client-local state rather than hand-rolled file
//! bookkeeping.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

/// After this many failed attempts a row is parked as `failed` and the
/// worker stops retrying it (spec.md §4.2).
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Failed,
}

impl UploadStatus {
    fn from_str(s: &str) -> Self {
        match s {
            "failed" => UploadStatus::Failed,
            _ => UploadStatus::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub segment_id: Uuid,
    pub file_path: PathBuf,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub status: UploadStatus,
    pub created_at_unix: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A worker-exclusion guard is kept alongside the connection rather
/// than relying on SQLite's own locking: spec.md §4.2 requires "at
/// most one upload worker run concurrently per queue" as a
/// process-level invariant, not just a storage-level one.
pub struct UploadQueue {
    conn: Mutex<Connection>,
    draining: AtomicBool,
    max_size: usize,
    drop_oldest_on_overflow: bool,
}

impl UploadQueue {
    pub fn open(db_path: &Path, max_size: usize, drop_oldest_on_overflow: bool) -> Result<Self, QueueError> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS pending_uploads (
                segment_id   TEXT PRIMARY KEY,
                file_path    TEXT NOT NULL,
                retry_count  INTEGER NOT NULL DEFAULT 0,
                last_error   TEXT,
                status       TEXT NOT NULL DEFAULT 'pending',
                created_at   INTEGER NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            draining: AtomicBool::new(false),
            max_size,
            drop_oldest_on_overflow,
        })
    }

    /// Idempotent on `segment_id` (spec.md §4.2) — a retransmit of the
    /// same segment across client sessions is a no-op, not a duplicate
    /// row.
    pub fn enqueue(&self, segment_id: Uuid, file_path: &Path, now_unix: i64) -> Result<(), QueueError> {
        let conn = self.conn.lock().expect("queue mutex poisoned");

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pending_uploads", [], |r| r.get(0))?;
        if count as usize >= self.max_size {
            if self.drop_oldest_on_overflow {
                conn.execute(
                    "DELETE FROM pending_uploads WHERE segment_id = (
                        SELECT segment_id FROM pending_uploads ORDER BY created_at ASC LIMIT 1
                    )",
                    [],
                )?;
            } else {
                return Ok(());
            }
        }

        conn.execute(
            "INSERT INTO pending_uploads (segment_id, file_path, retry_count, status, created_at)
             VALUES (?1, ?2, 0, 'pending', ?3)
             ON CONFLICT(segment_id) DO NOTHING",
            params![segment_id.to_string(), file_path.to_string_lossy(), now_unix],
        )?;
        Ok(())
    }

    /// Oldest-first pending rows, for the worker's drain order
    /// (spec.md §4.2: "best-effort by creation time").
    pub fn pending(&self) -> Result<Vec<PendingUpload>, QueueError> {
        let conn = self.conn.lock().expect("queue mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT segment_id, file_path, retry_count, last_error, status, created_at
             FROM pending_uploads WHERE status = 'pending' ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let segment_id: String = row.get(0)?;
                let status: String = row.get(4)?;
                Ok(PendingUpload {
                    segment_id: Uuid::parse_str(&segment_id).unwrap_or_else(|_| Uuid::nil()),
                    file_path: PathBuf::from(row.get::<_, String>(1)?),
                    retry_count: row.get(2)?,
                    last_error: row.get(3)?,
                    status: UploadStatus::from_str(&status),
                    created_at_unix: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get(&self, segment_id: Uuid) -> Result<Option<PendingUpload>, QueueError> {
        let conn = self.conn.lock().expect("queue mutex poisoned");
        conn.query_row(
            "SELECT segment_id, file_path, retry_count, last_error, status, created_at
             FROM pending_uploads WHERE segment_id = ?1",
            params![segment_id.to_string()],
            |row| {
                let status: String = row.get(4)?;
                Ok(PendingUpload {
                    segment_id,
                    file_path: PathBuf::from(row.get::<_, String>(1)?),
                    retry_count: row.get(2)?,
                    last_error: row.get(3)?,
                    status: UploadStatus::from_str(&status),
                    created_at_unix: row.get(5)?,
                })
            },
        )
        .optional()
        .map_err(QueueError::from)
    }

    /// Success path: the row and its backing file are both removed,
    /// upholding zero-retention once the server has acknowledged a
    /// terminal result (spec.md §3: "discarded on client after
    /// server-confirmed terminal state").
    pub fn complete(&self, segment_id: Uuid) -> Result<(), QueueError> {
        let path = self.get(segment_id)?.map(|p| p.file_path);
        {
            let conn = self.conn.lock().expect("queue mutex poisoned");
            conn.execute(
                "DELETE FROM pending_uploads WHERE segment_id = ?1",
                params![segment_id.to_string()],
            )?;
        }
        if let Some(path) = path {
            let _ = std::fs::remove_file(path);
        }
        Ok(())
    }

    /// Failure path: bumps `retry_count`; after `MAX_RETRY_ATTEMPTS` the
    /// row is parked as `failed` and the worker stops retrying it
    /// (spec.md §4.2).
    pub fn record_failure(&self, segment_id: Uuid, error: &str) -> Result<UploadStatus, QueueError> {
        let conn = self.conn.lock().expect("queue mutex poisoned");
        let retry_count: u32 = conn.query_row(
            "UPDATE pending_uploads SET retry_count = retry_count + 1, last_error = ?2
             WHERE segment_id = ?1 RETURNING retry_count",
            params![segment_id.to_string(), error],
            |r| r.get(0),
        )?;

        let status = if retry_count >= MAX_RETRY_ATTEMPTS {
            conn.execute(
                "UPDATE pending_uploads SET status = 'failed' WHERE segment_id = ?1",
                params![segment_id.to_string()],
            )?;
            UploadStatus::Failed
        } else {
            UploadStatus::Pending
        };
        Ok(status)
    }

    /// Guards "at most one upload worker run concurrently per queue"
    /// (spec.md §4.2). Returns `false` if a drain is already in
    /// progress; the caller should skip this tick rather than block.
    pub fn try_begin_drain(&self) -> bool {
        self.draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn end_drain(&self) {
        self.draining.store(false, Ordering::Release);
    }

    pub fn len(&self) -> Result<usize, QueueError> {
        let conn = self.conn.lock().expect("queue mutex poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pending_uploads", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> (UploadQueue, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let q = UploadQueue::open(&dir.path().join("queue.sqlite3"), 10, true).unwrap();
        (q, dir)
    }

    #[test]
    fn enqueue_is_idempotent_on_segment_id() {
        let (q, dir) = queue();
        let id = Uuid::new_v4();
        let path = dir.path().join("seg.wav");
        std::fs::write(&path, b"x").unwrap();

        q.enqueue(id, &path, 1000).unwrap();
        q.enqueue(id, &path, 2000).unwrap();

        assert_eq!(q.len().unwrap(), 1);
    }

    #[test]
    fn complete_removes_row_and_file() {
        let (q, dir) = queue();
        let id = Uuid::new_v4();
        let path = dir.path().join("seg.wav");
        std::fs::write(&path, b"x").unwrap();
        q.enqueue(id, &path, 1000).unwrap();

        q.complete(id).unwrap();

        assert!(q.get(id).unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn failure_parks_row_after_max_attempts() {
        let (q, dir) = queue();
        let id = Uuid::new_v4();
        let path = dir.path().join("seg.wav");
        std::fs::write(&path, b"x").unwrap();
        q.enqueue(id, &path, 1000).unwrap();

        assert_eq!(q.record_failure(id, "e1").unwrap(), UploadStatus::Pending);
        assert_eq!(q.record_failure(id, "e2").unwrap(), UploadStatus::Pending);
        assert_eq!(q.record_failure(id, "e3").unwrap(), UploadStatus::Failed);

        let row = q.get(id).unwrap().unwrap();
        assert_eq!(row.status, UploadStatus::Failed);
        assert_eq!(row.retry_count, 3);

        // A failed row no longer appears in the pending drain list.
        assert!(q.pending().unwrap().is_empty());
    }

    #[test]
    fn only_one_drain_may_run_at_a_time() {
        let (q, _dir) = queue();
        assert!(q.try_begin_drain());
        assert!(!q.try_begin_drain());
        q.end_drain();
        assert!(q.try_begin_drain());
    }

    #[test]
    fn overflow_drops_oldest_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let q = UploadQueue::open(&dir.path().join("queue.sqlite3"), 2, true).unwrap();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            let path = dir.path().join(format!("{i}.wav"));
            std::fs::write(&path, b"x").unwrap();
            q.enqueue(*id, &path, i as i64).unwrap();
        }
        assert_eq!(q.len().unwrap(), 2);
        // The oldest (ids[0]) should have been evicted.
        assert!(q.get(ids[0]).unwrap().is_none());
        assert!(q.get(ids[2]).unwrap().is_some());
    }
}
