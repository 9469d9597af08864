//! File access seam for the materializers.

use restitch_core::{MergeError, RestitchResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Minimal file collaborator contract.
///
/// The materializers need nothing more: existence, full reads, full writes.
pub trait FileAccess {
    fn exists(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> RestitchResult<Vec<u8>>;
    fn write(&self, path: &Path, bytes: &[u8]) -> RestitchResult<()>;
}

fn io_error(path: &Path, error: impl ToString) -> MergeError {
    MergeError::Io {
        path: path.display().to_string(),
        reason: error.to_string(),
    }
}

// ============================================================================
// STD IMPLEMENTATION
// ============================================================================

/// `std::fs`-backed file access. Creates parent directories on write.
#[derive(Debug, Clone, Default)]
pub struct StdFileAccess;

impl FileAccess for StdFileAccess {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> RestitchResult<Vec<u8>> {
        std::fs::read(path).map_err(|e| io_error(path, e).into())
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> RestitchResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;
        }
        std::fs::write(path, bytes).map_err(|e| io_error(path, e).into())
    }
}

// ============================================================================
// IN-MEMORY IMPLEMENTATION
// ============================================================================

/// In-memory file access for tests.
///
/// Cloning shares the underlying map, so a test can keep a handle while a
/// writer owns another. The write counter is what write-suppression tests
/// assert on.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileAccess {
    files: Arc<RwLock<HashMap<PathBuf, Vec<u8>>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryFileAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place content without counting a write, for test setup.
    pub fn seed(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.files
            .write()
            .expect("file map lock")
            .insert(path.into(), bytes);
    }

    /// Current content of a path, if any.
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().expect("file map lock").get(path).cloned()
    }

    /// Number of writes performed through the trait.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl FileAccess for InMemoryFileAccess {
    fn exists(&self, path: &Path) -> bool {
        self.files
            .read()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }

    fn read(&self, path: &Path) -> RestitchResult<Vec<u8>> {
        self.files
            .read()
            .map_err(|_| io_error(path, "lock poisoned"))?
            .get(path)
            .cloned()
            .ok_or_else(|| io_error(path, "not found").into())
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> RestitchResult<()> {
        self.files
            .write()
            .map_err(|_| io_error(path, "lock poisoned"))?
            .insert(path.to_path_buf(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_round_trip_and_counting() {
        let files = InMemoryFileAccess::new();
        let path = Path::new("views/order.view");

        assert!(!files.exists(path));
        files.write(path, b"content").unwrap();
        assert!(files.exists(path));
        assert_eq!(files.read(path).unwrap(), b"content");
        assert_eq!(files.write_count(), 1);
    }

    #[test]
    fn test_in_memory_seed_does_not_count() {
        let files = InMemoryFileAccess::new();
        files.seed("views/order.view", b"seeded".to_vec());
        assert_eq!(files.write_count(), 0);
        assert_eq!(files.read(Path::new("views/order.view")).unwrap(), b"seeded");
    }

    #[test]
    fn test_in_memory_read_missing_is_io_error() {
        let files = InMemoryFileAccess::new();
        assert!(files.read(Path::new("missing")).is_err());
    }

    #[test]
    fn test_std_file_access_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/order.view");
        let files = StdFileAccess;

        assert!(!files.exists(&path));
        files.write(&path, b"content").unwrap();
        assert!(files.exists(&path));
        assert_eq!(files.read(&path).unwrap(), b"content");
    }
}
