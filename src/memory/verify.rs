// src/memory/verify.rs
//! Offline consistency checks, deliberately kept out of the hot read
//! path: `trace`/`recall` degrade gracefully, and this pass is where the
//! strict accounting lives.

use std::collections::HashMap;

use crate::errors::Result;
use crate::memory::store::SnapshotStore;

/// Findings from a read-only sweep over the node files and hash index.
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub nodes_examined: usize,
    /// Node files that failed to parse.
    pub corrupt_nodes: Vec<String>,
    /// Hashes claimed by more than one node file.
    pub hash_conflicts: Vec<String>,
    /// Hash-index entries pointing at missing node files.
    pub dangling_index: Vec<String>,
    /// Nodes whose parent reference cannot be resolved.
    pub unresolved_parents: Vec<String>,
    /// Node hashes with no index entry (repairable).
    pub unindexed: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.corrupt_nodes.is_empty()
            && self.hash_conflicts.is_empty()
            && self.dangling_index.is_empty()
            && self.unresolved_parents.is_empty()
            && self.unindexed.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RepairReport {
    /// Hash-index entries rewritten from surviving node files.
    pub index_restored: usize,
}

impl SnapshotStore {
    /// Read-only sweep: parse every node, check hash ownership, index
    /// targets, and parent resolvability. Never mutates.
    pub fn verify(&self) -> Result<VerifyReport> {
        let mut report = VerifyReport::default();
        let mut owners: HashMap<String, String> = HashMap::new();

        for fname in self.node_files()? {
            report.nodes_examined += 1;
            let node = match self.load(&fname) {
                Ok(n) => n,
                Err(_) => {
                    report.corrupt_nodes.push(fname);
                    continue;
                }
            };
            if let Some(prev) = owners.insert(node.hash.clone(), fname.clone()) {
                if prev != fname {
                    report.hash_conflicts.push(node.hash.clone());
                }
            }
            if let Some(parent) = &node.parent {
                let resolved = self
                    .resolve_parent(parent)
                    .unwrap_or(None)
                    .map(|f| self.load(&f).is_ok())
                    .unwrap_or(false);
                if !resolved {
                    report.unresolved_parents.push(fname.clone());
                }
            }
        }

        let mut indexed: HashMap<String, String> = HashMap::new();
        for (hash_key, target) in self.hash_index_files()? {
            if self.load(&target).is_err() {
                report.dangling_index.push(hash_key);
            } else {
                indexed.insert(target, hash_key);
            }
        }
        for (hash, fname) in &owners {
            if !indexed.contains_key(fname) {
                report.unindexed.push(hash.clone());
            }
        }

        Ok(report)
    }

    /// Rewrite missing hash-index entries from surviving node files.
    /// Write-once semantics hold: existing entries are never replaced.
    pub fn repair(&self) -> Result<RepairReport> {
        let mut report = RepairReport::default();
        for fname in self.node_files()? {
            let node = match self.load(&fname) {
                Ok(n) => n,
                Err(_) => continue,
            };
            if self.restore_hash_index(&node.hash, &fname)? {
                report.index_restored += 1;
            }
        }
        if report.index_restored > 0 {
            tracing::info!(restored = report.index_restored, "hash index repaired");
        }
        Ok(report)
    }
}
