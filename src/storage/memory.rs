//! In-memory session store.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Result, SpenderError};

/// Thread-safe in-memory [`super::SessionStore`].
///
/// # Example
///
/// ```rust
/// use spender_rs::storage::{InMemorySessionStore, SessionStore};
///
/// let store = InMemorySessionStore::new();
/// store.set("spender_user", "{}").unwrap();
/// assert_eq!(store.get("spender_user").unwrap().as_deref(), Some("{}"));
/// ```
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    /// Stored entries.
    inner: Mutex<HashMap<String, String>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock and runs `f` on the entries.
    fn with_lock<R, F: FnOnce(&mut HashMap<String, String>) -> R>(&self, f: F) -> Result<R> {
        let mut guard = self.inner.lock().map_err(|err| lock_error(&err))?;
        Ok(f(&mut guard))
    }
}

/// Wraps a mutex poison error into a [`SpenderError::Storage`].
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> SpenderError {
    SpenderError::Storage(err.to_string().into())
}

impl super::SessionStore for InMemorySessionStore {
    #[inline]
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_lock(|entries| entries.get(key).cloned())
    }

    #[inline]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_lock(|entries| {
            let _old = entries.insert(key.to_owned(), value.to_owned());
        })
    }

    #[inline]
    fn remove(&self, key: &str) -> Result<()> {
        self.with_lock(|entries| {
            let _old = entries.remove(key);
        })
    }
}
