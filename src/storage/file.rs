//! JSON-file session store.
//!
//! Keeps every key in a single `session.json` under a configurable
//! directory (default: `$XDG_DATA_HOME/spender-rs/`).

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, SpenderError};

/// Application name used for the XDG data directory.
const APP_NAME: &str = "spender-rs";
/// File holding all session entries.
const SESSION_FILE: &str = "session.json";
/// Sentinel file used for cross-process file locking.
const LOCK_FILE: &str = "session.lock";

/// Entries as stored on disk.
type Entries = BTreeMap<String, String>;

/// File-backed [`super::SessionStore`].
///
/// # Concurrency
///
/// An in-process [`Mutex`] serializes access within the process and an
/// advisory lock on `session.lock` ([`std::fs::File::lock`] /
/// [`std::fs::File::lock_shared`]) guards against other processes.
/// Writes go to a temporary file that is then renamed into place.
///
/// # File layout
///
/// ```text
/// <dir>/
///   session.lock   (cross-process lock sentinel)
///   session.json
/// ```
#[derive(Debug)]
pub struct FileSessionStore {
    /// Directory containing the session files.
    dir: PathBuf,
    /// Mutex serializing concurrent in-process access.
    lock: Mutex<()>,
    /// Sentinel file for cross-process advisory locking.
    lock_file: fs::File,
}

impl FileSessionStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the lock
    /// file cannot be opened.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(storage_io_error)?;
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))
            .map_err(storage_io_error)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            lock_file,
        })
    }

    /// Returns the platform data directory for this application.
    ///
    /// On Linux: `$XDG_DATA_HOME/spender-rs/` (typically
    /// `~/.local/share/spender-rs/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|data_path| data_path.join(APP_NAME))
            .ok_or_else(|| {
                SpenderError::Storage("could not determine platform data directory".into())
            })
    }

    /// Returns the full path for a given file name.
    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Runs `op` under the in-process mutex and a shared file lock.
    fn with_shared_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock_shared().map_err(storage_io_error)?;
        let result = op();
        // The operation's own error takes precedence over an unlock failure.
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Runs `op` under the in-process mutex and an exclusive file lock.
    fn with_exclusive_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Reads all entries; a missing file is an empty map.
    fn read_entries(&self) -> Result<Entries> {
        match fs::read_to_string(self.path(SESSION_FILE)) {
            Ok(contents) => serde_json::from_str(&contents).map_err(SpenderError::from),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(err) => Err(storage_io_error(err)),
        }
    }

    /// Atomically writes all entries (write-to-tmp then rename).
    fn write_entries(&self, entries: &Entries) -> Result<()> {
        let path = self.path(SESSION_FILE);
        let tmp_path = self.path(&format!("{SESSION_FILE}.tmp"));
        let json = serde_json::to_string_pretty(entries).map_err(SpenderError::from)?;
        fs::write(&tmp_path, json).map_err(storage_io_error)?;
        fs::rename(&tmp_path, &path).map_err(storage_io_error)?;
        Ok(())
    }

    /// Read-modify-write of the entry map under an exclusive lock.
    fn update<F: FnOnce(&mut Entries)>(&self, op: F) -> Result<()> {
        self.with_exclusive_lock(|| {
            let mut entries = self.read_entries()?;
            op(&mut entries);
            self.write_entries(&entries)
        })
    }
}

/// Wraps an I/O error into a [`SpenderError::Storage`].
fn storage_io_error(err: std::io::Error) -> SpenderError {
    SpenderError::Storage(Box::new(err))
}

/// Wraps a mutex poison error into a [`SpenderError::Storage`].
fn lock_poison_error<T>(err: &std::sync::PoisonError<T>) -> SpenderError {
    SpenderError::Storage(err.to_string().into())
}

impl super::SessionStore for FileSessionStore {
    #[inline]
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_shared_lock(|| Ok(self.read_entries()?.remove(key)))
    }

    #[inline]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            let _old = entries.insert(key.to_owned(), value.to_owned());
        })
    }

    #[inline]
    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            let _old = entries.remove(key);
        })
    }
}
