//! Version index: a durable, queryable record of every backed-up file
//! revision.
//!
//! Each row maps a normalized path and a point in time to the content
//! hash that was current at that time. The index is the only place that
//! remembers *when* a blob belonged to a path; the blob store itself is
//! oblivious to history.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub id: i64,
    pub path: PathBuf,
    pub hash: String,
    pub stored_at: DateTime<Utc>,
}

pub struct VersionIndex {
    conn: Connection,
}

impl VersionIndex {
    /// Opens (creating if necessary) a version index backed by a SQLite
    /// database at `db_path`.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = DELETE;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 10000;",
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL,
                hash TEXT(40) NOT NULL,
                stored_at INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_versions_path_time
             ON versions (path, stored_at)",
            [],
        )?;
        Ok(Self { conn })
    }

    /// Opens an in-memory index, primarily for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Records a new version of `path` stored as `hash` at `stored_at`.
    pub fn append(
        &self,
        path: &Path,
        hash: &str,
        stored_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO versions (path, hash, stored_at) VALUES (?1, ?2, ?3)",
            params![path.to_string_lossy(), hash, stored_at.timestamp_millis()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All versions of `path`, oldest first.
    pub fn versions_of(&self, path: &Path) -> Result<Vec<Version>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, path, hash, stored_at FROM versions
             WHERE path = ?1 ORDER BY stored_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![path.to_string_lossy()], row_to_version)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// The most recent version of `path` stored at or before `at`, ties
    /// broken by the highest id (i.e. the version appended last).
    pub fn version_at(&self, path: &Path, at: DateTime<Utc>) -> Result<Option<Version>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, path, hash, stored_at FROM versions
             WHERE path = ?1 AND stored_at <= ?2
             ORDER BY stored_at DESC, id DESC
             LIMIT 1",
        )?;
        let version = stmt
            .query_row(params![path.to_string_lossy(), at.timestamp_millis()], row_to_version)
            .optional()?;
        Ok(version)
    }
}

fn row_to_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<Version> {
    let id: i64 = row.get(0)?;
    let path: String = row.get(1)?;
    let hash: String = row.get(2)?;
    let stored_at_ms: i64 = row.get(3)?;
    let stored_at = Utc.timestamp_millis_opt(stored_at_ms).single().unwrap_or_else(Utc::now);
    Ok(Version {
        id,
        path: PathBuf::from(path),
        hash,
        stored_at,
    })
}
