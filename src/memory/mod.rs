// src/memory/mod.rs

pub mod branch;
pub mod node;
pub mod store;
pub mod trace;
pub mod verify;

pub use branch::BranchRef;
pub use node::{ParentRef, SnapshotNode};
pub use store::SnapshotStore;
pub use verify::{RepairReport, VerifyReport};
