// src/memory/trace.rs
//! Walks a branch from head toward its root, resolving parent links
//! through either addressing scheme.
//!
//! Traversal favors availability over strictness: a missing or malformed
//! record stops the walk and yields whatever accumulated, because partial
//! history is more useful than total failure against stale or hand-edited
//! stores. Total hops are always capped by the caller's limit, so even a
//! corrupted parent chain cannot loop.

use crate::errors::{MemoryError, Result};
use crate::memory::node::SnapshotNode;
use crate::memory::store::SnapshotStore;

impl SnapshotStore {
    /// Trace a branch newest-first, up to `limit` nodes. Stops at the
    /// limit, at the root, or at the first unresolvable parent; in the
    /// failure case the valid prefix is returned rather than an error.
    pub fn trace(&self, branch_name: &str, limit: usize) -> Result<Vec<SnapshotNode>> {
        let r = self
            .branch(branch_name)?
            .ok_or_else(|| MemoryError::NotFound(format!("branch {branch_name}")))?;

        let mut out: Vec<SnapshotNode> = Vec::new();
        let mut cur = Some(r.head_node);
        while let Some(fname) = cur {
            if out.len() >= limit {
                break;
            }
            let node = match self.load(&fname) {
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!(branch = branch_name, node = %fname, error = %e,
                        "trace stopped at unreadable node; returning prefix");
                    break;
                }
            };
            let next = match &node.parent {
                Some(p) => match self.resolve_parent(p) {
                    Ok(resolved) => resolved,
                    Err(_) => None,
                },
                None => None,
            };
            out.push(node);
            cur = next;
        }
        Ok(out)
    }

    /// True when `ancestor_hash` lies on the parent chain of
    /// `descendant_hash` (or equals it). The walk is capped at `max_hops`
    /// as a defensive bound; an unresolvable link counts as "not found".
    pub fn is_ancestor(
        &self,
        ancestor_hash: &str,
        descendant_hash: &str,
        max_hops: usize,
    ) -> Result<bool> {
        if ancestor_hash == descendant_hash {
            return Ok(true);
        }
        let mut cur = match self.filename_for_hash(descendant_hash)? {
            Some(f) => Some(f),
            None => return Ok(false),
        };
        let mut hops = 0usize;
        while let Some(fname) = cur {
            if hops >= max_hops {
                return Ok(false);
            }
            let node = match self.load(&fname) {
                Ok(n) => n,
                Err(_) => return Ok(false),
            };
            if node.hash == ancestor_hash {
                return Ok(true);
            }
            cur = match &node.parent {
                Some(p) => self.resolve_parent(p).unwrap_or(None),
                None => None,
            };
            hops += 1;
        }
        Ok(false)
    }

    /// Lowest common ancestor of two branches, for visualizing divergent
    /// histories. Both branches are traced back toward root (bounded by
    /// `limit` hops each), reversed to oldest-first, and walked in
    /// lock-step while hashes are pairwise equal; the last matching
    /// position is the LCA. `None` means the histories share no node
    /// within `limit` (divergent or unrelated), which is not an error.
    pub fn lowest_common_ancestor(
        &self,
        branch_a: &str,
        branch_b: &str,
        limit: usize,
    ) -> Result<Option<String>> {
        let a = self.trace(branch_a, limit)?;
        let b = self.trace(branch_b, limit)?;

        let mut lca: Option<String> = None;
        for (x, y) in a.iter().rev().zip(b.iter().rev()) {
            if x.hash == y.hash {
                lca = Some(x.hash.clone());
            } else {
                break;
            }
        }
        Ok(lca)
    }
}
