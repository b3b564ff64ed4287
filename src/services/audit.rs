// src/services/audit.rs
//! Append-only audit logbook (JSONL).
//!
//! Two streams: generic action telemetry, and safety-check decision
//! records of the shape `{timestamp, decision, risk, reason}`. Writes are
//! best-effort; the core never gates an operation on this sink.

use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::config::CoreConfig;

#[derive(Debug, Clone)]
pub struct Logbook {
    actions: PathBuf,
    decisions: PathBuf,
    enabled: bool,
    preview_len: usize,
}

impl Logbook {
    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self {
            actions: cfg.logbook.actions_log.clone(),
            decisions: cfg.logbook.decisions_log.clone(),
            enabled: cfg.services.audit_enabled,
            preview_len: cfg.policies.log_preview_len,
        }
    }

    /// Record a generic action event (lightweight telemetry).
    pub fn record_action(&self, agent: &str, action: &str, details: &Value, severity: &str) {
        if !self.enabled {
            return;
        }
        let entry = json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "event": "action",
            "agent": agent,
            "action": action,
            "severity": severity,
            "details": details,
        });
        append_jsonl(&self.actions, &entry);
    }

    /// Record a safety-check decision. The record shape is the external
    /// contract consumed by audit tooling.
    pub fn record_decision(&self, decision: &str, risk: &str, reason: &str) {
        if !self.enabled {
            return;
        }
        let entry = json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "decision": decision,
            "risk": risk,
            "reason": reason,
        });
        append_jsonl(&self.decisions, &entry);
    }

    /// Privacy-safe single-line preview for log payloads. Truncation is
    /// char-based so multibyte content never splits mid-character.
    pub fn preview(&self, s: &str) -> String {
        let flat = s.replace('\n', " ");
        if flat.chars().count() <= self.preview_len {
            return flat;
        }
        let mut t: String = flat.chars().take(self.preview_len).collect();
        t.push('…');
        t
    }
}

/// Append one JSON value as a line. Creates parents if missing; write
/// errors are ignored so the caller is never taken down by telemetry.
fn append_jsonl<S: Serialize>(path: &PathBuf, val: &S) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Ok(mut f) = fs::OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(val) {
            let _ = writeln!(f, "{}", line);
        }
    }
}
