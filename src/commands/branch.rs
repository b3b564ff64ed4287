// src/commands/branch.rs
use serde_json::{json, Value};

use crate::commands::Commands;
use crate::errors::Result;
use crate::memory::{BranchRef, RepairReport, SnapshotNode, VerifyReport};

impl Commands {
    /// Append content to a named branch and advance its head. The first
    /// extend on an unknown branch seeds it with a root node. Returns the
    /// new snapshot.
    pub fn extend(&self, branch: &str, content: &str, meta: Option<Value>) -> Result<SnapshotNode> {
        let meta = meta.unwrap_or_else(|| json!({}));
        let lobe = meta
            .get("lobe")
            .and_then(|v| v.as_str())
            .unwrap_or("branch")
            .to_string();
        let key = meta
            .get("key")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| branch.to_string());

        let node = self.store.extend(branch, content, &lobe, &key, meta)?;
        self.logbook.record_action(
            "commands",
            "branch_extended",
            &json!({ "branch": branch, "hash": node.hash, "preview": self.logbook.preview(content) }),
            "low",
        );
        Ok(node)
    }

    /// Create a branch headed at an existing snapshot (by node filename
    /// or content hash) without creating a new node.
    pub fn diverge(&self, base_ref: &str, name: &str) -> Result<BranchRef> {
        let r = self.store.diverge(base_ref, name)?;
        self.logbook.record_action(
            "commands",
            "branch_created",
            &json!({ "branch": name, "base": r.base_hash }),
            "low",
        );
        Ok(r)
    }

    /// Branch history, newest first. `limit` defaults from policy config.
    pub fn trace(&self, branch: &str, limit: Option<usize>) -> Result<Vec<SnapshotNode>> {
        let limit = limit.unwrap_or(self.cfg.policies.trace_limit);
        self.store.trace(branch, limit)
    }

    /// Current head hash of a branch, if it exists.
    pub fn head(&self, branch: &str) -> Result<Option<String>> {
        Ok(self.store.branch(branch)?.map(|r| r.head_hash))
    }

    /// Fast-forward `dst` onto `src`'s head. Fails with
    /// `NotFastForwardable` (and mutates nothing) when `dst`'s head is
    /// not an ancestor of `src`'s.
    pub fn consolidate(&self, src: &str, dst: &str) -> Result<String> {
        let head = self
            .store
            .fast_forward(src, dst, self.cfg.policies.ancestry_hops)?;
        self.logbook.record_action(
            "commands",
            "branches_consolidated",
            &json!({ "src": src, "dst": dst, "head": head }),
            "low",
        );
        Ok(head)
    }

    /// Nearest shared snapshot of two branches, or `None` when their
    /// histories are unrelated within `limit` hops (policy default: 512).
    pub fn lowest_common_ancestor(
        &self,
        branch_a: &str,
        branch_b: &str,
        limit: Option<usize>,
    ) -> Result<Option<String>> {
        let limit = limit.unwrap_or(self.cfg.policies.lca_limit);
        self.store.lowest_common_ancestor(branch_a, branch_b, limit)
    }

    /// Read-only store consistency sweep.
    pub fn verify(&self) -> Result<VerifyReport> {
        self.store.verify()
    }

    /// Rebuild missing hash-index entries from node files.
    pub fn repair(&self) -> Result<RepairReport> {
        let report = self.store.repair()?;
        if report.index_restored > 0 {
            self.logbook.record_action(
                "commands",
                "index_repaired",
                &json!({ "restored": report.index_restored }),
                "medium",
            );
        }
        Ok(report)
    }
}
