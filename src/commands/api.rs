// src/commands/api.rs
use serde::Serialize;
use serde_json::json;
use std::path::Path;

use crate::commands::init::{default_root, ensure_layout};
use crate::config::CoreConfig;
use crate::errors::Result;
use crate::memory::SnapshotStore;
use crate::services::{Archive, HotCache, Logbook};

/// Facade wiring the snapshot store and the tier collaborators behind the
/// caller-facing operations. One instance per workspace root; the hot
/// cache holds the single SQLite writer.
pub struct Commands {
    pub(crate) store: SnapshotStore,
    pub(crate) cache: HotCache,
    pub(crate) archive: Archive,
    pub(crate) logbook: Logbook,
    pub(crate) cfg: CoreConfig,
}

#[derive(Debug, Serialize)]
pub struct Stats {
    pub total: u64,
    pub archived: u64,
}

impl Commands {
    /// Open a workspace at `root`, creating the layout if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        ensure_layout(root)?;
        let cfg = CoreConfig::load(root)?;

        let store = SnapshotStore::open(&cfg.memory.dag_path)?;
        let cache = HotCache::open(&cfg.memory.cache_path)?;
        let archive = Archive::open(&cfg.memory.archive_path)?;
        let logbook = Logbook::from_config(&cfg);

        Ok(Self {
            store,
            cache,
            archive,
            logbook,
            cfg,
        })
    }

    /// Open at the default root (`ENGRAM_ROOT` or `.engram`).
    pub fn open_default() -> Result<Self> {
        Self::open(default_root())
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Direct access to the snapshot DAG for callers that need it.
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn logbook(&self) -> &Logbook {
        &self.logbook
    }

    /// Store content in the hot tier and return its memory id
    /// (`{lobe}_{digest}`; the digest covers key and content so the same
    /// fact re-remembered lands on the same id).
    pub fn remember(&self, lobe: &str, key: Option<&str>, content: &str) -> Result<String> {
        let lobe = if lobe.is_empty() { "notes" } else { lobe };
        let key = key.map(|k| k.to_string()).unwrap_or_else(|| {
            format!("{}_memory", chrono::Utc::now().format("%Y-%m-%dT%H_%M_%S"))
        });

        let memory_id = format!(
            "{}_{}",
            lobe,
            blake3::hash([key.as_bytes(), content.as_bytes()].concat().as_slice()).to_hex()
        );

        self.cache
            .remember(&memory_id, lobe, &key, content.as_bytes())?;

        self.logbook.record_action(
            "commands",
            "memory_stored",
            &json!({ "memory_id": memory_id, "lobe": lobe, "key": key, "len": content.len() }),
            "low",
        );
        Ok(memory_id)
    }

    /// Promote a hot row into the compressed archive; records the CID on
    /// the row. Returns the CID, or `None` when the row is absent or the
    /// archive tier is disabled.
    pub fn promote_to_archive(&self, memory_id: &str) -> Result<Option<String>> {
        if !self.cfg.services.archive_enabled {
            return Ok(None);
        }
        let Some(bytes) = self.cache.recall(memory_id)? else {
            return Ok(None);
        };
        let cid = self.archive.store(&bytes)?;
        self.cache
            .mark_archived(memory_id, &cid, &chrono::Utc::now().to_rfc3339())?;
        self.logbook.record_action(
            "commands",
            "memory_promoted_archive",
            &json!({ "memory_id": memory_id, "cid": cid }),
            "low",
        );
        Ok(Some(cid))
    }

    /// Promote a hot row into the DAG: append a snapshot on the lobe's
    /// branch and bind the memory id to the new node. Returns the node's
    /// content hash, or `None` when the row is absent.
    pub fn promote_to_dag(&self, memory_id: &str) -> Result<Option<String>> {
        let Some(row) = self.cache.row(memory_id)? else {
            return Ok(None);
        };
        let content = String::from_utf8_lossy(&row.content).to_string();
        let meta = json!({ "memory_id": memory_id, "key": row.key });
        let node = self
            .store
            .extend(&row.lobe, &content, &row.lobe, &row.key, meta)?;
        let fname = self
            .store
            .filename_for_hash(&node.hash)?
            .ok_or_else(|| crate::errors::MemoryError::NotFound(format!("snapshot {}", node.hash)))?;
        self.store.bind_id(memory_id, &fname, &row.lobe, &row.key)?;
        self.logbook.record_action(
            "commands",
            "memory_promoted_dag",
            &json!({ "memory_id": memory_id, "hash": node.hash, "lobe": row.lobe }),
            "low",
        );
        Ok(Some(node.hash))
    }

    /// Demotion hook for external cache policy: make sure colder tiers
    /// hold the content, then drop the hot row.
    pub fn demote(&self, memory_id: &str) -> Result<Option<String>> {
        let cid = self.promote_to_archive(memory_id)?;
        if cid.is_some() {
            let _ = self.promote_to_dag(memory_id)?;
            self.cache.forget(memory_id)?;
            self.logbook.record_action(
                "commands",
                "memory_demoted",
                &json!({ "memory_id": memory_id, "cid": cid }),
                "low",
            );
        }
        Ok(cid)
    }

    /// Newest → oldest memory ids in a lobe (hot tier view).
    pub fn recent(&self, lobe: &str, n: usize) -> Result<Vec<String>> {
        self.cache.recent_ids(lobe, n)
    }

    pub fn stats(&self, lobe: Option<&str>) -> Result<Stats> {
        Ok(Stats {
            total: self.cache.count(lobe)?,
            archived: self.cache.count_archived(lobe)?,
        })
    }
}
