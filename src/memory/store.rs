// src/memory/store.rs
//! Durable snapshot store: one JSON file per node under `<dag>/nodes`,
//! write-once hash index under `<dag>/refs/hashes`, id index under
//! `<dag>/refs/ids`. Write order is payload first, index pointer last, so
//! a crash mid-write yields "node absent" rather than a dangling index.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{MemoryError, Result};
use crate::memory::node::{envelope_hash, ParentRef, SnapshotNode};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HashIndexEntry {
    node: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdIndexEntry {
    node: String,
    lobe: String,
    key: String,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    /// Open (and lay out) the DAG root, e.g. `<engram_root>/dag`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in ["nodes", "refs/branches", "refs/hashes", "refs/ids"] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { root })
    }

    pub(crate) fn nodes_dir(&self) -> PathBuf {
        self.root.join("nodes")
    }

    pub(crate) fn branches_dir(&self) -> PathBuf {
        self.root.join("refs").join("branches")
    }

    fn hashes_dir(&self) -> PathBuf {
        self.root.join("refs").join("hashes")
    }

    fn ids_dir(&self) -> PathBuf {
        self.root.join("refs").join("ids")
    }

    /// Append an immutable node. Computes the envelope hash, persists the
    /// node file, then registers the hash index entry. Idempotent: an
    /// envelope already owned by a node returns that node unchanged.
    ///
    /// Deduplication consults the hash index only; a hand-deleted index
    /// entry lets a second node file claim the same hash. `verify`
    /// surfaces that as a hash conflict.
    pub fn append(
        &self,
        parent: Option<ParentRef>,
        content: &str,
        lobe: &str,
        key: &str,
        meta: Value,
    ) -> Result<SnapshotNode> {
        // Mutations are strict: an unresolvable parent is an error, not a
        // silently dangling reference.
        let parent_hash = match &parent {
            Some(p) => Some(
                self.resolve_parent(p)?
                    .ok_or_else(|| MemoryError::NotFound(format!("parent {:?}", p)))
                    .and_then(|f| self.load(&f))?
                    .hash,
            ),
            None => None,
        };

        let hash = envelope_hash(content, parent_hash.as_deref(), lobe, key);
        // Index-only check; the scan fallback is for read paths, not the
        // append hot path.
        if let Some(existing) = self.lookup_hash_index(&hash)? {
            tracing::debug!(%hash, node = %existing, "append deduplicated to existing node");
            return self.load(&existing);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let ts = chrono::Utc::now().to_rfc3339();
        let fname = format!("{}__{}.json", ts.replace(':', "-"), id);

        let node = SnapshotNode {
            id,
            hash: hash.clone(),
            content: content.to_string(),
            parent,
            lobe: lobe.to_string(),
            key: key.to_string(),
            ts,
            meta,
        };

        // Payload before pointer.
        self.write_atomic(&self.nodes_dir().join(&fname), &serde_json::to_vec_pretty(&node)?)?;
        self.write_hash_index(&hash, &fname)?;

        tracing::debug!(node = %fname, %hash, lobe, key, "snapshot appended");
        Ok(node)
    }

    /// Load a node by its filename.
    pub fn load(&self, filename: &str) -> Result<SnapshotNode> {
        let p = self.nodes_dir().join(filename);
        let bytes =
            fs::read(&p).map_err(|_| MemoryError::NotFound(format!("node {filename}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| MemoryError::CorruptRecord(format!("node {filename}: {e}")))
    }

    /// Resolve either addressing form: a direct node filename, or a
    /// content hash looked up through the hash index.
    pub fn read(&self, node_ref: &str) -> Result<SnapshotNode> {
        if node_ref.ends_with(".json") {
            return self.load(node_ref);
        }
        let fname = self
            .filename_for_hash(node_ref)?
            .ok_or_else(|| MemoryError::NotFound(format!("snapshot {node_ref}")))?;
        self.load(&fname)
    }

    /// Single indirection point for parent references.
    pub fn resolve_parent(&self, parent: &ParentRef) -> Result<Option<String>> {
        match parent {
            ParentRef::Direct(fname) => Ok(Some(fname.clone())),
            ParentRef::ByHash(hash) => self.filename_for_hash(hash),
        }
    }

    /// Hash → owning node filename. Consults the index first, then falls
    /// back to a directory scan so hand-edited stores stay readable.
    pub fn filename_for_hash(&self, hash: &str) -> Result<Option<String>> {
        if let Some(fname) = self.lookup_hash_index(hash)? {
            return Ok(Some(fname));
        }
        for fname in self.node_files()? {
            match self.load(&fname) {
                Ok(node) if node.hash == hash => return Ok(Some(fname)),
                _ => continue,
            }
        }
        Ok(None)
    }

    /// Node filenames, newest first. The RFC3339 prefix sorts
    /// lexicographically.
    pub fn node_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.nodes_dir())? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        names.reverse();
        Ok(names)
    }

    // ---------- id index (memory id → node) ----------

    /// Point a caller-facing memory id at a node. Used by the DAG recall
    /// tier; later bindings for the same id supersede earlier ones.
    pub fn bind_id(&self, memory_id: &str, filename: &str, lobe: &str, key: &str) -> Result<()> {
        let entry = IdIndexEntry {
            node: filename.to_string(),
            lobe: lobe.to_string(),
            key: key.to_string(),
        };
        let p = self.ids_dir().join(format!("{}.json", sanitize(memory_id)));
        self.write_atomic(&p, &serde_json::to_vec_pretty(&entry)?)
    }

    /// Load the node a memory id is bound to, if any.
    pub fn node_by_memory_id(&self, memory_id: &str) -> Result<Option<SnapshotNode>> {
        let p = self.ids_dir().join(format!("{}.json", sanitize(memory_id)));
        if !p.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&p)?;
        let entry: IdIndexEntry = match serde_json::from_slice(&bytes) {
            Ok(e) => e,
            Err(_) => return Ok(None),
        };
        match self.load(&entry.node) {
            Ok(node) => Ok(Some(node)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Content string for a memory id, if the DAG holds it.
    pub fn content_by_memory_id(&self, memory_id: &str) -> Result<Option<String>> {
        Ok(self.node_by_memory_id(memory_id)?.map(|n| n.content))
    }

    fn lookup_hash_index(&self, hash: &str) -> Result<Option<String>> {
        let p = self.hashes_dir().join(format!("{}.json", sanitize(hash)));
        if !p.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&p)?;
        match serde_json::from_slice::<HashIndexEntry>(&bytes) {
            Ok(entry) if !entry.node.is_empty() => Ok(Some(entry.node)),
            _ => Ok(None),
        }
    }

    // ---------- write plumbing ----------

    /// Hash index entries are write-once: the first owner of a hash keeps it.
    fn write_hash_index(&self, hash: &str, filename: &str) -> Result<()> {
        let p = self.hashes_dir().join(format!("{}.json", sanitize(hash)));
        if p.exists() {
            return Ok(());
        }
        let entry = HashIndexEntry {
            node: filename.to_string(),
        };
        self.write_atomic(&p, &serde_json::to_vec_pretty(&entry)?)
    }

    pub(crate) fn restore_hash_index(&self, hash: &str, filename: &str) -> Result<bool> {
        let p = self.hashes_dir().join(format!("{}.json", sanitize(hash)));
        if p.exists() {
            return Ok(false);
        }
        self.write_hash_index(hash, filename)?;
        Ok(true)
    }

    pub(crate) fn hash_index_files(&self) -> Result<Vec<(String, String)>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(self.hashes_dir())? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s.to_string(),
                None => continue,
            };
            let bytes = fs::read(&path)?;
            if let Ok(e) = serde_json::from_slice::<HashIndexEntry>(&bytes) {
                out.push((stem, e.node));
            }
        }
        Ok(out)
    }

    /// Write under a temporary name, then atomically rename into place.
    pub(crate) fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| MemoryError::StoreWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let tmp = path.with_extension("tmp");
        let write = |tmp: &Path| -> std::io::Result<()> {
            let mut f = fs::File::create(tmp)?;
            f.write_all(bytes)?;
            f.flush()?;
            Ok(())
        };
        write(&tmp).map_err(|e| MemoryError::StoreWrite {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, path).map_err(|e| MemoryError::StoreWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Filesystem-safe token: non-alphanumerics become underscores.
pub(crate) fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
