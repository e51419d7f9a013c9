//! # Cache Module
//!
//! The cache contract shared by the resource trie (whole-trie persistence)
//! and the plugin pipeline (invocation-order persistence), plus two
//! implementations: an in-process [`MemoryCache`] and a file-backed
//! [`FileCache`] with atomic persistence.
//!
//! Values are `serde_json::Value`; callers serialize whatever they need to
//! persist and deserialize on the way back out. Caches are read-mostly after
//! a one-time population.

mod core;
mod file;
mod memory;

pub use core::Cache;
pub use file::FileCache;
pub use memory::MemoryCache;
