// src/commands/mod.rs

pub mod api; // Commands facade over the tiers
pub mod branch; // branch ops: extend, diverge, trace, consolidate, LCA
pub mod init; // idempotent workspace layout
pub mod recall; // tiered recall resolver

pub use api::{Commands, Stats};
pub use init::{default_root, ensure_layout, InitReport};
pub use recall::{Prefer, RecallHit, Tier};
