//! Maps client-supplied names onto paths inside the base directory

use std::path::{Component, Path, PathBuf};

use log::warn;
use tokio::fs;

use crate::storage::StorageError;

/// Resolves logical file names against a fixed base directory
#[derive(Debug, Clone)]
pub struct PathResolver {
    base_dir: PathBuf,
}

impl PathResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Join `name` onto the base directory.
    ///
    /// Pure string and path-component checks; no filesystem call is made, so
    /// a rejected name never reaches the disk. Rejects anything containing
    /// `..`, path separators or NUL, and anything that is not exactly one
    /// normal path component.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        if !is_plain_file_name(name) {
            warn!("Rejected file name: {:?}", name);
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.base_dir.join(name))
    }

    /// Check that an existing `path` still lands inside the base directory
    /// once symlinks are followed.
    pub async fn confine(&self, name: &str, path: &Path) -> Result<(), StorageError> {
        let base = fs::canonicalize(&self.base_dir)
            .await
            .map_err(StorageError::StorageUnavailable)?;
        let target = fs::canonicalize(path)
            .await
            .map_err(|e| StorageError::io(name, e))?;

        if target == base || !target.starts_with(&base) {
            warn!("File name {:?} resolves outside the base directory", name);
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    /// Check that creating `path` cannot write through a symlink.
    pub async fn confine_new(&self, name: &str, path: &Path) -> Result<(), StorageError> {
        match fs::symlink_metadata(path).await {
            Ok(meta) if meta.file_type().is_symlink() => {
                warn!("Refusing to write through symlink {:?}", name);
                Err(StorageError::InvalidName(name.to_string()))
            }
            Ok(meta) if meta.is_dir() => Err(StorageError::InvalidName(name.to_string())),
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::StorageUnavailable(e)),
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains("..") || name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
