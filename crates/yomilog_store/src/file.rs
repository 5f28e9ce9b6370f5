//! File-based record store for persistent storage.

use crate::backend::RecordStore;
use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Name of the advisory lock file inside the store directory.
const LOCK_FILE: &str = ".lock";

/// A file-based record store.
///
/// Each key is persisted as one `<key>.json` document inside the store
/// directory. Documents are replaced atomically (write to a temporary
/// file, then rename), so a crash mid-save leaves the previous document
/// intact rather than a torn one.
///
/// The directory is guarded by an exclusive advisory lock held for the
/// lifetime of the store, so two processes cannot mutate the same
/// directory concurrently.
///
/// # Example
///
/// ```no_run
/// use yomilog_store::{RecordStore, FileStore};
/// use std::path::Path;
///
/// let mut store = FileStore::open(Path::new("reading-log-data")).unwrap();
/// store.save("books", b"[]").unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    /// Held for the lifetime of the store; the OS releases it on drop.
    _lock: File,
}

impl FileStore {
    /// Opens or creates a record store at the given directory.
    ///
    /// Creates the directory (and parents) if missing and acquires an
    /// exclusive advisory lock on it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another process holds the lock,
    /// or an I/O error if the directory cannot be created or opened.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;

        let lock_path = dir.join(LOCK_FILE);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;

        if lock.try_lock_exclusive().is_err() {
            return Err(StoreError::locked(dir.display().to_string()));
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            _lock: lock,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

/// Keys become file names, so restrict them to a safe alphabet.
fn validate_key(key: &str) -> StoreResult<()> {
    let ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

impl RecordStore for FileStore {
    fn load(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.document_path(key)?;
        match fs::read(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, key: &str, blob: &[u8]) -> StoreResult<()> {
        let path = self.document_path(key)?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));

        let mut file = File::create(&tmp)?;
        file.write_all(blob)?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;

        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        let path = self.document_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("store");
        let _store = FileStore::open(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let temp = tempdir().unwrap();
        let mut store = FileStore::open(temp.path()).unwrap();

        store.save("books", b"[{\"title\":\"T\"}]").unwrap();
        assert_eq!(
            store.load("books").unwrap(),
            Some(b"[{\"title\":\"T\"}]".to_vec())
        );
    }

    #[test]
    fn load_absent_key_returns_none() {
        let temp = tempdir().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        assert_eq!(store.load("missing").unwrap(), None);
    }

    #[test]
    fn save_replaces_previous_document() {
        let temp = tempdir().unwrap();
        let mut store = FileStore::open(temp.path()).unwrap();

        store.save("goals", b"old").unwrap();
        store.save("goals", b"new").unwrap();
        assert_eq!(store.load("goals").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn remove_deletes_document() {
        let temp = tempdir().unwrap();
        let mut store = FileStore::open(temp.path()).unwrap();

        store.save("session", b"{}").unwrap();
        store.remove("session").unwrap();
        assert_eq!(store.load("session").unwrap(), None);

        // Removing again is still fine.
        store.remove("session").unwrap();
    }

    #[test]
    fn documents_survive_reopen() {
        let temp = tempdir().unwrap();

        {
            let mut store = FileStore::open(temp.path()).unwrap();
            store.save("accounts", b"persisted").unwrap();
        }

        let store = FileStore::open(temp.path()).unwrap();
        assert_eq!(store.load("accounts").unwrap(), Some(b"persisted".to_vec()));
    }

    #[test]
    fn second_open_is_rejected_while_locked() {
        let temp = tempdir().unwrap();
        let _store = FileStore::open(temp.path()).unwrap();

        let result = FileStore::open(temp.path());
        assert!(matches!(result, Err(StoreError::Locked { .. })));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let temp = tempdir().unwrap();
        {
            let _store = FileStore::open(temp.path()).unwrap();
        }
        assert!(FileStore::open(temp.path()).is_ok());
    }

    #[test]
    fn traversal_keys_are_rejected() {
        let temp = tempdir().unwrap();
        let mut store = FileStore::open(temp.path()).unwrap();

        assert!(matches!(
            store.save("../escape", b"x"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.load(""),
            Err(StoreError::InvalidKey(_))
        ));
    }
}
