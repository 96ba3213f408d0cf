//! Per-table scratch directory.

use std::{
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

/// A uniquely named temporary directory owned by exactly one table.
///
/// Files created inside it are registered through [`ScratchDir::register`] and
/// deleted, together with the directory itself, when the `ScratchDir` is dropped.
/// Deletion failures are logged and otherwise ignored.
pub struct ScratchDir {
    dir: Option<tempfile::TempDir>,
    files: Mutex<Vec<PathBuf>>,
}

impl ScratchDir {
    /// Creates a fresh directory under `parent`, or under the system temp
    /// directory when `parent` is `None`.
    pub fn create(parent: Option<&Path>) -> std::io::Result<ScratchDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pqtable-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        log::debug!("created scratch directory {}", dir.path().display());
        Ok(ScratchDir {
            dir: Some(dir),
            files: Mutex::new(Vec::new()),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir
            .as_ref()
            .map(|dir| dir.path())
            .unwrap_or_else(|| Path::new(""))
    }

    /// Returns the path of a new file named `name` inside the directory and
    /// registers it for cleanup. The file itself is not created.
    pub fn register(&self, name: &str) -> PathBuf {
        let path = self.path().join(name);
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.clone());
        path
    }

    pub fn registered_files(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn cleanup(&mut self) {
        let files = std::mem::take(self.files.get_mut().unwrap_or_else(PoisonError::into_inner));
        for file in files {
            match std::fs::remove_file(&file) {
                Ok(()) => (),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => (),
                Err(e) => log::warn!("failed to delete temp file {}: {e}", file.display()),
            }
        }
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => log::debug!("removed scratch directory {}", path.display()),
                Err(e) => log::warn!("failed to remove temp directory {}: {e}", path.display()),
            }
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl std::fmt::Debug for ScratchDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchDir")
            .field("path", &self.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::ScratchDir;

    #[test]
    fn test_scratch_dir_cleanup() {
        let parent = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(Some(parent.path())).unwrap();
        let other = ScratchDir::create(Some(parent.path())).unwrap();
        assert_ne!(scratch.path(), other.path());

        let a = scratch.register("a.dat");
        let b = scratch.register("b.dat");
        std::fs::write(&a, b"1234").unwrap();
        std::fs::write(&b, b"5678").unwrap();
        assert_eq!(scratch.registered_files(), vec![a.clone(), b.clone()]);
        // Registered but never created.
        scratch.register("c.dat");

        drop(scratch);
        assert!(!a.exists());
        assert!(!b.exists());
        drop(other);
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }
}
