//! Local filesystem storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::error::StorageError;

use super::Storage;

/// Writes each body to `root/<path>`, creating parent directories
#[derive(Clone, Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `root` (created on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory every path is resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path under the root
    ///
    /// Absolute paths and `..` components are refused so a generated name can
    /// never write outside the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(StorageError::Rejected {
                        path: path.to_string(),
                        reason: "parent directory references are not allowed".into(),
                    });
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::Rejected {
                        path: path.to_string(),
                        reason: "absolute paths are not allowed".into(),
                    });
                }
            }
        }
        if resolved == self.root {
            return Err(StorageError::Rejected {
                path: path.to_string(),
                reason: "path names no file".into(),
            });
        }
        Ok(resolved)
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&target, data)
            .await
            .map_err(|source| StorageError::Io {
                path: target.clone(),
                source,
            })?;
        tracing::trace!(path = %target.display(), bytes = data.len(), "Wrote response body");
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_stays_under_root() {
        let storage = FileStorage::new("/data/out");
        assert_eq!(
            storage.resolve("a/./b.json").unwrap(),
            PathBuf::from("/data/out/a/b.json")
        );
    }

    #[test]
    fn resolve_rejects_escapes() {
        let storage = FileStorage::new("/data/out");
        for bad in ["../x.json", "a/../../x", "/etc/passwd", "", "."] {
            assert!(
                matches!(storage.resolve(bad), Err(StorageError::Rejected { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
