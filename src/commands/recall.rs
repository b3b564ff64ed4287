// src/commands/recall.rs
//! Tiered recall: resolve a memory id against the hot cache, the
//! compressed archive, or the snapshot DAG. An explicit tier preference
//! consults that tier only; `Auto` falls through hot, archive, DAG and
//! returns the first hit. Reads never restore or mutate rows.

use serde::Serialize;
use serde_json::json;

use crate::commands::Commands;
use crate::errors::Result;

/// Which tier a recall result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Hot,
    Archive,
    Dag,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Hot => "hot",
            Tier::Archive => "archive",
            Tier::Dag => "dag",
        }
    }
}

/// Caller's tier preference. Explicit tiers do not fall back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prefer {
    #[default]
    Auto,
    Hot,
    Archive,
    Dag,
}

impl Prefer {
    /// Lenient parse for callers taking the preference as a string.
    /// Unknown values mean `Auto`.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "hot" | "cache" => Prefer::Hot,
            "archive" | "cold" => Prefer::Archive,
            "dag" => Prefer::Dag,
            _ => Prefer::Auto,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecallHit {
    pub memory_id: String,
    pub content: String,
    pub tier: Tier,
}

impl Commands {
    /// Look a memory id up in the requested tier(s). `Ok(None)` means no
    /// tier holds it; errors are reserved for storage faults.
    pub fn recall(&self, memory_id: &str, prefer: Prefer) -> Result<Option<RecallHit>> {
        let hit = match prefer {
            Prefer::Hot => self.recall_hot(memory_id)?,
            Prefer::Archive => self.recall_archive(memory_id)?,
            Prefer::Dag => self.recall_dag(memory_id)?,
            Prefer::Auto => {
                let mut found = self.recall_hot(memory_id)?;
                if found.is_none() {
                    found = self.recall_archive(memory_id)?;
                }
                if found.is_none() {
                    found = self.recall_dag(memory_id)?;
                }
                found
            }
        };

        if let Some(h) = &hit {
            self.logbook.record_action(
                "commands",
                "memory_recalled",
                &json!({ "memory_id": memory_id, "tier": h.tier.as_str() }),
                "low",
            );
        }
        Ok(hit)
    }

    /// Batch recall. The output is positionally aligned with `ids`; a
    /// `None` slot marks a miss rather than being dropped.
    pub fn recall_many(&self, ids: &[&str], prefer: Prefer) -> Result<Vec<Option<RecallHit>>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push(self.recall(id, prefer)?);
        }
        Ok(out)
    }

    fn recall_hot(&self, memory_id: &str) -> Result<Option<RecallHit>> {
        Ok(self.cache.recall(memory_id)?.map(|bytes| RecallHit {
            memory_id: memory_id.to_string(),
            content: String::from_utf8_lossy(&bytes).to_string(),
            tier: Tier::Hot,
        }))
    }

    fn recall_archive(&self, memory_id: &str) -> Result<Option<RecallHit>> {
        let Some(cid) = self.cache.archived_cid(memory_id)? else {
            return Ok(None);
        };
        if !self.archive.contains(&cid) {
            return Ok(None);
        }
        let bytes = self.archive.retrieve(&cid)?;
        Ok(Some(RecallHit {
            memory_id: memory_id.to_string(),
            content: String::from_utf8_lossy(&bytes).to_string(),
            tier: Tier::Archive,
        }))
    }

    fn recall_dag(&self, memory_id: &str) -> Result<Option<RecallHit>> {
        Ok(self
            .store
            .content_by_memory_id(memory_id)?
            .map(|content| RecallHit {
                memory_id: memory_id.to_string(),
                content,
                tier: Tier::Dag,
            }))
    }
}
