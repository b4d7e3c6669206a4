//! Filesystem access behind a trait.
//!
//! The assembler only needs six operations on page and output files. Routing
//! them through [`PageStore`] keeps [`crate::PageAssembler`] free of ambient
//! filesystem state: tests (and embedders that keep pages somewhere other
//! than a local disk) inject a [`MemoryStore`] instead of [`FsStore`].

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Storage operations used by the assembly pipeline.
///
/// Implementations must be `Send + Sync` so an assembler can be moved onto a
/// blocking thread by [`crate::PageAssembler::convert_async`].
pub trait PageStore: Send + Sync {
    /// Read a whole file. A missing file must yield `io::ErrorKind::NotFound`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Delete a file.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Create `path` and any missing ancestors. An existing directory is fine.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Write `bytes` to `path` so that readers never observe a partial file.
    /// The parent directory must already exist; it is never created here.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;
}

/// [`PageStore`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl PageStore for FsStore {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // Temp file in the destination directory so the rename stays on one
        // filesystem.
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// In-memory [`PageStore`].
///
/// Directories are implicit (any ancestor of a stored file) or explicit via
/// [`MemoryStore::create_dir`]. Reads of individual paths can be forced to
/// fail with [`MemoryStore::fail_reads`] to exercise error handling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
    read_failures: Mutex<BTreeMap<PathBuf, io::ErrorKind>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` at `path`, replacing any previous content.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        lock(&self.files).insert(path.into(), bytes.into());
    }

    /// Mark `path` as an (empty) directory.
    pub fn create_dir(&self, path: impl Into<PathBuf>) {
        lock(&self.dirs).insert(path.into());
    }

    /// Make every read of `path` fail with `kind`.
    pub fn fail_reads(&self, path: impl Into<PathBuf>, kind: io::ErrorKind) {
        lock(&self.read_failures).insert(path.into(), kind);
    }

    /// Current content of `path`, if any.
    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        lock(&self.files).get(path).cloned()
    }

    /// All stored file paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        lock(&self.files).keys().cloned().collect()
    }
}

impl PageStore for MemoryStore {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        if let Some(kind) = lock(&self.read_failures).get(path) {
            return Err(io::Error::new(*kind, format!("{}: injected failure", path.display())));
        }
        lock(&self.files)
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        lock(&self.files)
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        if lock(&self.files).contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{}: is a file", path.display()),
            ));
        }
        self.create_dir(path);
        Ok(())
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        match path.parent() {
            Some(p) if !p.as_os_str().is_empty() && !self.is_dir(p) => Err(not_found(p)),
            _ => {
                self.insert(path, bytes);
                Ok(())
            }
        }
    }

    fn exists(&self, path: &Path) -> bool {
        lock(&self.files).contains_key(path) || self.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        if lock(&self.dirs).contains(path) {
            return true;
        }
        lock(&self.files)
            .keys()
            .any(|file| file.parent().is_some_and(|p| p.starts_with(path)))
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{}: no such file", path.display()))
}

// A panic while holding one of these locks cannot leave the maps half-updated.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
