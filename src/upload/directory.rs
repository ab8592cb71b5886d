use super::ObjectStore;
use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Object store backed by a local directory
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Map a store path onto the root, refusing anything that escapes it
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::Upload(format!("Refusing to write outside store root: {}", path)));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for DirectoryStore {
    fn put_file(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, bytes)?;

        tracing::debug!("Stored {} bytes at {}", bytes.len(), target.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "directory"
    }
}
