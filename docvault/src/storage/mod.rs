//! Storage module
//!
//! The key-value persisted store contract and the cache for downloaded files.

pub mod file_cache;
pub mod kv;

pub use file_cache::FileCache;
pub use kv::{load_json, store_json, MemoryStore, PersistedStore};
