//! Storage layer for keepsake.
//!
//! This crate provides a key-value document storage abstraction with two
//! backends:
//! - JSON file storage (the persisted project document)
//! - In-memory storage (for testing)
//!
//! All operations are synchronous; the engine runs single-threaded and every
//! mutation loads or saves the document wholesale.

pub mod error;
pub mod json;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use json::JsonStorage;
pub use memory::MemoryStorage;

use serde::{de::DeserializeOwned, Serialize};

/// A trait for key-value document storage backends.
///
/// Keys are represented as path segments, e.g. `["project"]` or
/// `["archive", "2024"]`. Values are serialized/deserialized as JSON.
pub trait Storage {
    /// Read a value from storage.
    ///
    /// Returns `None` if the key doesn't exist.
    fn read<T: DeserializeOwned>(&self, key: &[&str]) -> StorageResult<Option<T>>;

    /// Write a value to storage.
    ///
    /// Creates parent directories if necessary.
    fn write<T: Serialize>(&self, key: &[&str], value: &T) -> StorageResult<()>;

    /// Remove a value from storage.
    ///
    /// Removing a missing key is not an error.
    fn remove(&self, key: &[&str]) -> StorageResult<()>;

    /// List all keys directly under a prefix.
    ///
    /// Returns the full key paths for each item.
    fn list(&self, prefix: &[&str]) -> StorageResult<Vec<Vec<String>>>;

    /// Check if a key exists.
    fn exists(&self, key: &[&str]) -> StorageResult<bool>;
}
