//! Scoped temporary directories for shallow clones.
//!
//! Every cache-miss load leases one directory and releases it on every exit
//! path via the guard's `Drop`. `close_all` is best-effort: removal errors
//! are ignored so provider shutdown always makes progress.

use crate::domain::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

type Registry = Arc<Mutex<Vec<PathBuf>>>;

/// Tracks and cleans up clone directories.
#[derive(Default)]
pub struct WorkspaceManager {
    registry: Registry,
}

/// A leased clone directory; removed and unregistered when dropped.
pub struct Workspace {
    path: PathBuf,
    registry: Registry,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        registry.retain(|p| p != &self.path);
    }
}

impl WorkspaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a fresh temporary directory.
    pub fn acquire(&self) -> Result<Workspace> {
        let dir = tempfile::Builder::new()
            .prefix("git-config-")
            .tempdir()
            .map_err(|e| Error::io("failed to create temporary directory", Some(e)))?;
        let path = dir.into_path();

        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        registry.push(path.clone());
        debug!(path = %path.display(), "created clone workspace");

        Ok(Workspace {
            path,
            registry: Arc::clone(&self.registry),
        })
    }

    /// Remove every outstanding directory, tolerating ones already gone.
    pub fn close_all(&self) {
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for path in registry.drain(..) {
            let _ = std::fs::remove_dir_all(&path);
        }
    }

    /// Number of directories currently outstanding
    pub fn active(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_creates_directory_and_drop_removes_it() {
        let manager = WorkspaceManager::new();
        let workspace = manager.acquire().unwrap();
        let path = workspace.path().to_path_buf();

        assert!(path.is_dir());
        assert_eq!(manager.active(), 1);

        drop(workspace);
        assert!(!path.exists());
        assert_eq!(manager.active(), 0);
    }

    #[test]
    fn close_all_removes_outstanding_directories() {
        let manager = WorkspaceManager::new();
        let first = manager.acquire().unwrap();
        let second = manager.acquire().unwrap();
        let paths = [first.path().to_path_buf(), second.path().to_path_buf()];

        // Leak the guards so only close_all can clean up.
        std::mem::forget(first);
        std::mem::forget(second);

        manager.close_all();
        assert_eq!(manager.active(), 0);
        for path in paths {
            assert!(!path.exists());
        }
    }

    #[test]
    fn close_all_tolerates_missing_directories() {
        let manager = WorkspaceManager::new();
        let workspace = manager.acquire().unwrap();
        std::fs::remove_dir_all(workspace.path()).unwrap();
        std::mem::forget(workspace);
        manager.close_all();
        assert_eq!(manager.active(), 0);
    }
}
