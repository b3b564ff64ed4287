//! Engram-Core: append-only, content-addressed memory for conversational agents.
//!
//! The crate is built around three pieces:
//! - an immutable snapshot DAG anchored by named branch pointers (`memory`),
//! - tier collaborators: a hot SQLite cache, a compressed archive, and the
//!   DAG itself as the authoritative cold tier (`services`),
//! - a `Commands` facade exposing the caller-facing operations: remember,
//!   extend, diverge, trace, fast-forward consolidate, lowest common
//!   ancestor, and tiered recall (`commands`).

pub mod commands;
pub mod config;
pub mod errors;
pub mod memory;
pub mod services;

pub use commands::{Commands, Prefer, RecallHit, Tier};
pub use errors::{MemoryError, Result};
