//! # Storage Module
//!
//! The async key-value primitive and its adapters. Everything above this layer
//! sees only the `KeyValueStore` trait, so the backing store (a JSON file on
//! disk, an in-memory map in tests) can be swapped without touching the
//! domain layer.

pub mod error;
pub mod file;
pub mod keys;
pub mod memory;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::{get_json, get_json_list, set_json, KeyValueStore};
