// src/memory/node.rs
//! Immutable snapshot node records and the dual parent-addressing scheme.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to the preceding node in a branch's history.
///
/// Two legacy encodings exist on disk and both are supported indefinitely:
/// a direct node filename (modern form, ends in `.json`) or a bare content
/// hash resolved through the hash index. Serialized as a plain string so
/// nodes written under either scheme keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParentRef {
    /// Node filename under `dag/nodes/`.
    Direct(String),
    /// Content hash; owner looked up in the hash index.
    ByHash(String),
}

impl From<String> for ParentRef {
    fn from(s: String) -> Self {
        if s.ends_with(".json") {
            ParentRef::Direct(s)
        } else {
            ParentRef::ByHash(s)
        }
    }
}

impl From<ParentRef> for String {
    fn from(p: ParentRef) -> Self {
        match p {
            ParentRef::Direct(s) | ParentRef::ByHash(s) => s,
        }
    }
}

/// One immutable, content-addressed unit of stored memory.
///
/// Written once, never mutated. `hash` is computed over the node envelope
/// (content, resolved parent hash, lobe, key) so that hash ownership stays
/// unique by construction and identical payloads on different chains do
/// not collide in the write-once hash index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotNode {
    /// Opaque id assigned at creation (uuid v4). Stable, never reused.
    pub id: String,
    /// Content-derived fingerprint; canonical cross-reference key.
    pub hash: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    pub lobe: String,
    pub key: String,
    /// RFC3339 UTC creation time. Ordering/display only, never identity.
    pub ts: String,
    /// Caller-supplied metadata, carried but not interpreted. May hold
    /// `provenance.sources[] = {kind, locator, cid}` citations.
    #[serde(default)]
    pub meta: Value,
}

impl SnapshotNode {
    /// Provenance citations recorded on this node, if any.
    pub fn provenance_sources(&self) -> Vec<&Value> {
        self.meta
            .get("provenance")
            .and_then(|p| p.get("sources"))
            .and_then(|s| s.as_array())
            .map(|a| a.iter().collect())
            .unwrap_or_default()
    }
}

/// Envelope digest: blake3 over content, parent hash, lobe, and key with
/// NUL separators. Both parent encodings hash identically because the
/// *resolved* parent content hash is fed in, not the reference form.
pub fn envelope_hash(content: &str, parent_hash: Option<&str>, lobe: &str, key: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(content.as_bytes());
    hasher.update(&[0]);
    hasher.update(parent_hash.unwrap_or("").as_bytes());
    hasher.update(&[0]);
    hasher.update(lobe.as_bytes());
    hasher.update(&[0]);
    hasher.update(key.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_ref_round_trips_both_encodings() {
        let direct: ParentRef = "2024-01-01T00-00-00Z__abc.json".to_string().into();
        assert!(matches!(direct, ParentRef::Direct(_)));
        let by_hash: ParentRef = "deadbeef".to_string().into();
        assert!(matches!(by_hash, ParentRef::ByHash(_)));

        let s: String = by_hash.into();
        assert_eq!(s, "deadbeef");
    }

    #[test]
    fn envelope_hash_separates_chains() {
        let a = envelope_hash("same", None, "chat", "k");
        let b = envelope_hash("same", Some(&a), "chat", "k");
        assert_ne!(a, b);
        // Same inputs are deterministic.
        assert_eq!(a, envelope_hash("same", None, "chat", "k"));
    }
}
