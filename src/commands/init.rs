// src/commands/init.rs
//! Idempotent workspace layout: directories, seed config, seeded logbook
//! streams. Safe to call often.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{MemoryError, Result};

#[derive(Debug, Clone)]
pub struct InitReport {
    pub root: PathBuf,
    pub created: Vec<String>,
    pub existed: Vec<String>,
}

/// Resolve the default engram root. Override via ENGRAM_ROOT (tests,
/// embedded hosts).
pub fn default_root() -> PathBuf {
    std::env::var_os("ENGRAM_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".engram"))
}

/// Ensure the on-disk layout under `root` (idempotent).
pub fn ensure_layout(root: &Path) -> Result<InitReport> {
    let mut created = Vec::new();
    let mut existed = Vec::new();

    for rel in [
        "",
        "cache",
        "dag",
        "dag/nodes",
        "dag/refs",
        "dag/refs/branches",
        "dag/refs/hashes",
        "dag/refs/ids",
        "archive",
        "logbook",
    ] {
        ensure_dir(root, rel, &mut created, &mut existed)?;
    }

    ensure_file(root, "config.toml", DEFAULT_CONFIG_TOML, &mut created, &mut existed)?;

    let ts = chrono::Utc::now().to_rfc3339();
    let init_event = format!(
        r#"{{"timestamp":"{}","event":"system_init","agent":"system","data":{{"version":"0.1.0","architecture":"tiered_dag"}}}}"#,
        ts
    );
    let log_dir = root.join("logbook");
    ensure_seeded_jsonl(&log_dir, "actions.jsonl", &init_event, &mut created, &mut existed)?;
    ensure_seeded_jsonl(&log_dir, "decisions.jsonl", &init_event, &mut created, &mut existed)?;

    Ok(InitReport {
        root: root.to_path_buf(),
        created,
        existed,
    })
}

fn ensure_dir(
    base: &Path,
    rel: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let p = if rel.is_empty() {
        base.to_path_buf()
    } else {
        base.join(rel)
    };
    let label = if rel.is_empty() { "." } else { rel };
    if p.exists() {
        existed.push(label.to_string());
        return Ok(());
    }
    fs::create_dir_all(&p).map_err(|e| MemoryError::StoreWrite {
        path: p.clone(),
        source: e,
    })?;
    created.push(label.to_string());
    Ok(())
}

fn ensure_file(
    base: &Path,
    rel_file: &str,
    content_if_absent: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let p = base.join(rel_file);
    if p.exists() {
        existed.push(rel_file.to_string());
        return Ok(());
    }
    write_atomic(&p, content_if_absent.as_bytes())?;
    created.push(rel_file.to_string());
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)
            .map_err(|e| MemoryError::StoreWrite {
                path: tmp.clone(),
                source: e,
            })?;
        f.write_all(bytes)?;
        f.flush()?;
    }
    fs::rename(&tmp, path).map_err(|e| MemoryError::StoreWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

fn ensure_seeded_jsonl(
    dir: &Path,
    file: &str,
    init_line: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let p = dir.join(file);
    if !p.exists() {
        ensure_file(dir, file, &(init_line.to_string() + "\n"), created, existed)?;
        return Ok(());
    }
    existed.push(file.to_string());
    if fs::metadata(&p)?.len() == 0 {
        let mut f = OpenOptions::new().append(true).open(&p)?;
        f.write_all(init_line.as_bytes())?;
        f.write_all(b"\n")?;
    }
    Ok(())
}

const DEFAULT_CONFIG_TOML: &str = r#"[system]
name = "engram"
version = "0.1.0"

[memory]
cache_path = "cache/memory.db"
dag_path = "dag"
archive_path = "archive"

[logbook]
actions_log = "logbook/actions.jsonl"
decisions_log = "logbook/decisions.jsonl"

[services]
audit_enabled = true
archive_enabled = true

[policies]
trace_limit = 50
lca_limit = 512
ancestry_hops = 1024
log_preview_len = 160
"#;
