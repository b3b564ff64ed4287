// src/services/archive.rs
//! Archive tier: content-addressed, gzip-compressed cold storage.
//!
//! Blobs live under `<root>/<cid>` where `cid = blake3(raw bytes)`. The
//! address is computed over the *uncompressed* content so the same bytes
//! always land at the same CID regardless of compression settings.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use crate::errors::{MemoryError, Result};

#[derive(Debug, Clone)]
pub struct Archive {
    root: PathBuf,
}

impl Archive {
    // Per-object size cap; textual memories fall well below this.
    const MAX_OBJECT_BYTES: usize = 16 * 1024 * 1024; // 16 MiB

    /// Initialize the archive root (idempotent).
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Compress and store raw bytes; returns the CID. Idempotent: a blob
    /// that already exists at its CID is left in place.
    pub fn store(&self, bytes: &[u8]) -> Result<String> {
        if bytes.len() > Self::MAX_OBJECT_BYTES {
            return Err(MemoryError::Config(format!(
                "archive object too large: {} bytes (max {})",
                bytes.len(),
                Self::MAX_OBJECT_BYTES
            )));
        }
        let cid = blake3::hash(bytes).to_hex().to_string();
        let path = self.root.join(&cid);
        if !path.exists() {
            let tmp = path.with_extension("tmp");
            {
                let f = fs::File::create(&tmp).map_err(|e| MemoryError::StoreWrite {
                    path: tmp.clone(),
                    source: e,
                })?;
                let mut enc = GzEncoder::new(f, Compression::default());
                enc.write_all(bytes)?;
                enc.finish()?;
            }
            fs::rename(&tmp, &path).map_err(|e| MemoryError::StoreWrite {
                path: path.clone(),
                source: e,
            })?;
        }
        tracing::debug!(%cid, bytes = bytes.len(), "archived blob");
        Ok(cid)
    }

    /// Retrieve and decompress a blob by CID. Inflation is bounded at the
    /// size cap while reading; a small on-disk blob cannot expand past it
    /// in memory.
    pub fn retrieve(&self, cid: &str) -> Result<Vec<u8>> {
        let path = self.root.join(cid);
        let f = fs::File::open(&path).map_err(|_| MemoryError::NotFound(format!("cid {cid}")))?;
        let mut dec = GzDecoder::new(f).take(Self::MAX_OBJECT_BYTES as u64 + 1);
        let mut out = Vec::new();
        dec.read_to_end(&mut out)
            .map_err(|e| MemoryError::CorruptRecord(format!("archive blob {cid}: {e}")))?;
        if out.len() > Self::MAX_OBJECT_BYTES {
            return Err(MemoryError::CorruptRecord(format!(
                "archive blob {cid} inflates past the size cap"
            )));
        }
        Ok(out)
    }

    /// True when a blob exists for this CID.
    pub fn contains(&self, cid: &str) -> bool {
        self.root.join(cid).exists()
    }
}
