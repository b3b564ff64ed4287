// src/services/mod.rs

pub mod archive; // compressed cold store (CID <-> bytes)
pub mod audit; // append-only JSONL logbook
pub mod hot; // the ONLY SQLite writer

pub use archive::Archive;
pub use audit::Logbook;
pub use hot::{HotCache, HotRow};
