//! Pluggable key-value storage for session continuity.
//!
//! The signed-in user is persisted between runs under a single key (see
//! [`crate::session`]). [`InMemorySessionStore`] serves tests and
//! embedders that keep the session only for the lifetime of the process;
//! [`FileSessionStore`] persists it as JSON on disk.

#[cfg(feature = "storage-file")]
mod file;
mod memory;

#[cfg(feature = "storage-file")]
pub use file::FileSessionStore;
pub use memory::InMemorySessionStore;

use crate::error::Result;

/// String key-value store holding session data.
pub trait SessionStore: core::fmt::Debug + Send + Sync {
    /// Returns the value stored under `key`, or `Ok(None)` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to write.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to write.
    fn remove(&self, key: &str) -> Result<()>;
}
