// src/config.rs
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{MemoryError, Result};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CoreConfig {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub logbook: LogbookConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub policies: PoliciesConfig,
}

impl CoreConfig {
    /// Load `<root>/config.toml`, falling back to defaults when absent.
    /// Relative paths in the file are resolved against `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("config.toml");
        let mut cfg = if path.exists() {
            let text = fs::read_to_string(&path)?;
            toml::from_str::<CoreConfig>(&text).map_err(|e| {
                MemoryError::Config(format!("parsing {}: {e}", path.display()))
            })?
        } else {
            tracing::info!("no config file at {}; using defaults", path.display());
            CoreConfig::default()
        };
        cfg.resolve_paths(root);
        Ok(cfg)
    }

    fn resolve_paths(&mut self, root: &Path) {
        self.memory.cache_path = absolutize(root, &self.memory.cache_path);
        self.memory.dag_path = absolutize(root, &self.memory.dag_path);
        self.memory.archive_path = absolutize(root, &self.memory.archive_path);
        self.logbook.actions_log = absolutize(root, &self.logbook.actions_log);
        self.logbook.decisions_log = absolutize(root, &self.logbook.decisions_log);
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "SystemConfig::default_name")]
    pub name: String,
    #[serde(default = "SystemConfig::default_version")]
    pub version: String,
}

impl SystemConfig {
    fn default_name() -> String {
        "engram".to_string()
    }

    fn default_version() -> String {
        "0.1.0".to_string()
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            version: Self::default_version(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "MemoryConfig::default_cache_path")]
    pub cache_path: PathBuf,
    #[serde(default = "MemoryConfig::default_dag_path")]
    pub dag_path: PathBuf,
    #[serde(default = "MemoryConfig::default_archive_path")]
    pub archive_path: PathBuf,
}

impl MemoryConfig {
    fn default_cache_path() -> PathBuf {
        PathBuf::from("cache/memory.db")
    }

    fn default_dag_path() -> PathBuf {
        PathBuf::from("dag")
    }

    fn default_archive_path() -> PathBuf {
        PathBuf::from("archive")
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            cache_path: Self::default_cache_path(),
            dag_path: Self::default_dag_path(),
            archive_path: Self::default_archive_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogbookConfig {
    #[serde(default = "LogbookConfig::default_actions_log")]
    pub actions_log: PathBuf,
    #[serde(default = "LogbookConfig::default_decisions_log")]
    pub decisions_log: PathBuf,
}

impl LogbookConfig {
    fn default_actions_log() -> PathBuf {
        PathBuf::from("logbook/actions.jsonl")
    }

    fn default_decisions_log() -> PathBuf {
        PathBuf::from("logbook/decisions.jsonl")
    }
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            actions_log: Self::default_actions_log(),
            decisions_log: Self::default_decisions_log(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "ServicesConfig::default_true")]
    pub audit_enabled: bool,
    #[serde(default = "ServicesConfig::default_true")]
    pub archive_enabled: bool,
}

impl ServicesConfig {
    fn default_true() -> bool {
        true
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            audit_enabled: true,
            archive_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoliciesConfig {
    /// Default hop bound for `trace` when the caller passes none.
    #[serde(default = "PoliciesConfig::default_trace_limit")]
    pub trace_limit: usize,
    /// Default hop bound per branch for lowest-common-ancestor search.
    /// Two unrelated histories give up after this many hops.
    #[serde(default = "PoliciesConfig::default_lca_limit")]
    pub lca_limit: usize,
    /// Hard cap on ancestry walks (fast-forward checks). Defensive bound
    /// so a corrupted parent chain cannot loop forever.
    #[serde(default = "PoliciesConfig::default_ancestry_hops")]
    pub ancestry_hops: usize,
    #[serde(default = "PoliciesConfig::default_log_preview_len")]
    pub log_preview_len: usize,
}

impl PoliciesConfig {
    fn default_trace_limit() -> usize {
        50
    }

    fn default_lca_limit() -> usize {
        512
    }

    fn default_ancestry_hops() -> usize {
        1024
    }

    fn default_log_preview_len() -> usize {
        160
    }
}

impl Default for PoliciesConfig {
    fn default() -> Self {
        Self {
            trace_limit: Self::default_trace_limit(),
            lca_limit: Self::default_lca_limit(),
            ancestry_hops: Self::default_ancestry_hops(),
            log_preview_len: Self::default_log_preview_len(),
        }
    }
}

fn absolutize(root: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        root.join(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CoreConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.policies.trace_limit, 50);
        assert_eq!(cfg.policies.lca_limit, 512);
        assert!(cfg.memory.dag_path.is_absolute());
        assert_eq!(cfg.memory.dag_path, dir.path().join("dag"));
    }

    #[test]
    fn partial_file_keeps_per_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "[policies]\ntrace_limit = 7\n",
        )
        .unwrap();
        let cfg = CoreConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.policies.trace_limit, 7);
        assert_eq!(cfg.policies.ancestry_hops, 1024);
        assert!(cfg.services.audit_enabled);
    }
}
