//! Directory operations

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        self.check().await.unwrap_or(false)
    }

    /// Whether the path is an existing directory
    ///
    /// Unlike [`Dir::exists`], only a missing path reads as `false`; other
    /// I/O failures (permissions, broken mounts) are returned.
    pub async fn check(&self) -> io::Result<bool> {
        match fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Get a subdirectory by relative path
    pub fn subdir(&self, relative: impl AsRef<Path>) -> Dir {
        Dir::new(self.path.join(relative))
    }

    /// Get a file within this directory
    pub fn file(&self, name: &str) -> crate::filesys::file::File {
        crate::filesys::file::File::new(self.path.join(name))
    }
}
