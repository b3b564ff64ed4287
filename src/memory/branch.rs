// src/memory/branch.rs
//! Named mutable branch pointers over the immutable snapshot DAG.
//!
//! A branch ref is one JSON file under `<dag>/refs/branches`, updated only
//! after the node it points at is durably written. Mutations here are
//! strict: they either complete or leave the registry untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;

use crate::errors::{MemoryError, Result};
use crate::memory::node::{ParentRef, SnapshotNode};
use crate::memory::store::{sanitize, SnapshotStore};

/// Mutable pointer: branch name → current head node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRef {
    pub name: String,
    /// Node filename and hash this branch diverged from.
    pub base_node: String,
    pub base_hash: String,
    /// Current newest node on this branch.
    pub head_node: String,
    pub head_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

impl SnapshotStore {
    /// Read a branch ref by (sanitized) name.
    pub fn branch(&self, name: &str) -> Result<Option<BranchRef>> {
        let p = self
            .branches_dir()
            .join(format!("{}.json", sanitize(name)));
        if !p.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&p)?;
        match serde_json::from_slice::<BranchRef>(&bytes) {
            Ok(r) if !r.head_node.is_empty() => Ok(Some(r)),
            _ => Ok(None),
        }
    }

    pub fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.branch(name)?.is_some())
    }

    /// All registered branch names, unordered.
    pub fn branch_names(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(self.branches_dir())? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            if let Ok(r) = serde_json::from_slice::<BranchRef>(&bytes) {
                out.push(r.name);
            }
        }
        Ok(out)
    }

    /// Create a branch headed at an existing node, without creating a new
    /// node. Fails with `DuplicateBranch` when the name is taken; callers
    /// needing idempotent re-runs pick fresh unique names.
    pub fn diverge(&self, base_ref: &str, name: &str) -> Result<BranchRef> {
        if self.branch_exists(name)? {
            return Err(MemoryError::DuplicateBranch(name.to_string()));
        }
        let base = self.read(base_ref)?;
        let base_node = self
            .filename_for_hash(&base.hash)?
            .ok_or_else(|| MemoryError::NotFound(format!("snapshot {}", base.hash)))?;
        let now = chrono::Utc::now().to_rfc3339();
        let r = BranchRef {
            name: name.to_string(),
            base_node: base_node.clone(),
            base_hash: base.hash.clone(),
            head_node: base_node,
            head_hash: base.hash,
            created_at: now.clone(),
            updated_at: now,
        };
        self.write_branch(&r)?;
        tracing::debug!(branch = name, base = %r.base_hash, "branch diverged");
        Ok(r)
    }

    /// Append a node parented at the branch head (direct reference, the
    /// modern form), then advance the head. The head update is written
    /// only after the node is durable. Extending an unknown branch seeds
    /// it with a root node.
    pub fn extend(
        &self,
        name: &str,
        content: &str,
        lobe: &str,
        key: &str,
        meta: Value,
    ) -> Result<SnapshotNode> {
        let existing = self.branch(name)?;
        let parent = existing
            .as_ref()
            .map(|r| ParentRef::Direct(r.head_node.clone()));

        let node = self.append(parent, content, lobe, key, meta)?;
        let node_file = self
            .filename_for_hash(&node.hash)?
            .ok_or_else(|| MemoryError::NotFound(format!("snapshot {}", node.hash)))?;

        let now = chrono::Utc::now().to_rfc3339();
        let r = match existing {
            Some(mut r) => {
                r.head_node = node_file;
                r.head_hash = node.hash.clone();
                r.updated_at = now;
                r
            }
            None => BranchRef {
                name: name.to_string(),
                base_node: node_file.clone(),
                base_hash: node.hash.clone(),
                head_node: node_file,
                head_hash: node.hash.clone(),
                created_at: now.clone(),
                updated_at: now,
            },
        };
        self.write_branch(&r)?;
        Ok(node)
    }

    /// Advance `dst`'s head to `src`'s head, permitted only when `dst`'s
    /// head lies on `src`'s ancestor chain (within `max_hops`). On
    /// failure nothing is mutated; no three-way merge is attempted. A
    /// missing `dst` branch is created at `src`'s head. Returns the new
    /// head hash.
    pub fn fast_forward(&self, src: &str, dst: &str, max_hops: usize) -> Result<String> {
        let src_ref = self
            .branch(src)?
            .ok_or_else(|| MemoryError::NotFound(format!("branch {src}")))?;

        let dst_ref = match self.branch(dst)? {
            Some(r) => r,
            None => {
                let now = chrono::Utc::now().to_rfc3339();
                let r = BranchRef {
                    name: dst.to_string(),
                    base_node: src_ref.head_node.clone(),
                    base_hash: src_ref.head_hash.clone(),
                    head_node: src_ref.head_node.clone(),
                    head_hash: src_ref.head_hash.clone(),
                    created_at: now.clone(),
                    updated_at: now,
                };
                self.write_branch(&r)?;
                return Ok(r.head_hash);
            }
        };

        if dst_ref.head_hash == src_ref.head_hash {
            return Ok(src_ref.head_hash);
        }
        if !self.is_ancestor(&dst_ref.head_hash, &src_ref.head_hash, max_hops)? {
            return Err(MemoryError::NotFastForwardable {
                src: src.to_string(),
                dst: dst.to_string(),
            });
        }

        let mut r = dst_ref;
        r.head_node = src_ref.head_node;
        r.head_hash = src_ref.head_hash.clone();
        r.updated_at = chrono::Utc::now().to_rfc3339();
        self.write_branch(&r)?;
        tracing::debug!(src, dst, head = %r.head_hash, "fast-forward consolidated");
        Ok(src_ref.head_hash)
    }

    fn write_branch(&self, r: &BranchRef) -> Result<()> {
        let p = self
            .branches_dir()
            .join(format!("{}.json", sanitize(&r.name)));
        self.write_atomic(&p, &serde_json::to_vec_pretty(r)?)
    }
}
