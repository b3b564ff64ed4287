// src/services/hot.rs
//! Hot tier: single-connection SQLite (WAL) keyed store.
//!
//! - One writer, many readers; WAL keeps them from blocking each other.
//! - Rows carry cold-storage pointers (`archived_cid` + `archived_at`) so
//!   the archive tier can be consulted without a separate catalog.
//! - Eviction/promotion policy is the caller's concern; this store only
//!   exposes the primitives (`remember`, `forget`, `mark_archived`).

use rusqlite::Connection;
use std::path::Path;

use crate::errors::Result;

pub struct HotCache {
    pub(crate) db: Connection,
}

/// A full hot row, as needed for promotion into the DAG.
#[derive(Debug, Clone)]
pub struct HotRow {
    pub memory_id: String,
    pub lobe: String,
    pub key: String,
    pub content: Vec<u8>,
}

impl HotCache {
    /// Open/create the SQLite DB and ensure schema.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Connection::open(db_path)?;
        db.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS memories (
              memory_id     TEXT PRIMARY KEY,
              lobe          TEXT NOT NULL,
              key           TEXT NOT NULL,
              content       BLOB NOT NULL,
              created_at    TEXT NOT NULL,
              updated_at    TEXT NOT NULL,
              archived_cid  TEXT,
              archived_at   TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_mem_lobe_key ON memories(lobe, key);

            -- Archive-tier index: survives hot-row eviction so cold
            -- lookups still resolve memory_id -> cid.
            CREATE TABLE IF NOT EXISTS archive_index (
              memory_id   TEXT PRIMARY KEY,
              cid         TEXT NOT NULL,
              archived_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { db })
    }

    /// Upsert raw content. On conflict the row is refreshed and
    /// `updated_at` bumped; the archive pointer is left alone.
    pub fn remember(&self, memory_id: &str, lobe: &str, key: &str, content: &[u8]) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.db.execute(
            r#"
            INSERT INTO memories(memory_id, lobe, key, content, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(memory_id) DO UPDATE SET
              lobe       = excluded.lobe,
              key        = excluded.key,
              content    = excluded.content,
              updated_at = excluded.updated_at
            "#,
            (memory_id, lobe, key, content, &now),
        )?;
        Ok(())
    }

    /// Fetch raw content bytes, or `None` when absent.
    pub fn recall(&self, memory_id: &str) -> Result<Option<Vec<u8>>> {
        let mut stmt = self
            .db
            .prepare("SELECT content FROM memories WHERE memory_id=?1")?;
        let mut rows = stmt.query([memory_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(row.get(0)?));
        }
        Ok(None)
    }

    /// Full row fetch, for promotion into colder tiers.
    pub fn row(&self, memory_id: &str) -> Result<Option<HotRow>> {
        let mut stmt = self
            .db
            .prepare("SELECT lobe, key, content FROM memories WHERE memory_id=?1")?;
        let mut rows = stmt.query([memory_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(HotRow {
                memory_id: memory_id.to_string(),
                lobe: row.get(0)?,
                key: row.get(1)?,
                content: row.get(2)?,
            }));
        }
        Ok(None)
    }

    /// Drop a row from the hot tier. Returns true when a row existed.
    /// External demotion policy calls this after colder tiers hold the
    /// content.
    pub fn forget(&self, memory_id: &str) -> Result<bool> {
        let n = self
            .db
            .execute("DELETE FROM memories WHERE memory_id=?1", [memory_id])?;
        Ok(n > 0)
    }

    /// Record the cold-storage pointer. Written to both the row (for
    /// stats) and the standalone archive index (for post-eviction
    /// lookups).
    pub fn mark_archived(&self, memory_id: &str, cid: &str, archived_at: &str) -> Result<()> {
        self.db.execute(
            "UPDATE memories SET archived_cid=?1, archived_at=?2 WHERE memory_id=?3",
            (cid, archived_at, memory_id),
        )?;
        self.db.execute(
            "INSERT OR REPLACE INTO archive_index(memory_id, cid, archived_at) VALUES (?1, ?2, ?3)",
            (memory_id, cid, archived_at),
        )?;
        Ok(())
    }

    /// Archived content id for a memory id, if it was ever promoted.
    /// Consults the standalone index, so eviction of the hot row does not
    /// orphan the archive blob.
    pub fn archived_cid(&self, memory_id: &str) -> Result<Option<String>> {
        let mut stmt = self
            .db
            .prepare("SELECT cid FROM archive_index WHERE memory_id=?1")?;
        let mut rows = stmt.query([memory_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(row.get(0)?));
        }
        Ok(None)
    }

    /// Newest → oldest memory ids in a lobe.
    pub fn recent_ids(&self, lobe: &str, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.db.prepare(
            "SELECT memory_id FROM memories
             WHERE lobe = ?1
             ORDER BY updated_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map((lobe, limit as i64), |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn count(&self, lobe: Option<&str>) -> Result<u64> {
        let sql = match lobe {
            Some(_) => "SELECT COUNT(*) FROM memories WHERE lobe=?1",
            None => "SELECT COUNT(*) FROM memories",
        };
        let mut stmt = self.db.prepare(sql)?;
        let cnt: i64 = match lobe {
            Some(l) => stmt.query_row([l], |r| r.get(0))?,
            None => stmt.query_row([], |r| r.get(0))?,
        };
        Ok(cnt as u64)
    }

    pub fn count_archived(&self, lobe: Option<&str>) -> Result<u64> {
        let sql = match lobe {
            Some(_) => "SELECT COUNT(*) FROM memories WHERE lobe=?1 AND archived_cid IS NOT NULL",
            None => "SELECT COUNT(*) FROM memories WHERE archived_cid IS NOT NULL",
        };
        let mut stmt = self.db.prepare(sql)?;
        let cnt: i64 = match lobe {
            Some(l) => stmt.query_row([l], |r| r.get(0))?,
            None => stmt.query_row([], |r| r.get(0))?,
        };
        Ok(cnt as u64)
    }
}
