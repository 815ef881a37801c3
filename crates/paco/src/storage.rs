//! Page body persistence under the configured output root.

use std::path::{Path, PathBuf};

use crate::identity::TestIdentity;

/// Folder used by `store_page_body`.
pub const STORED_FOLDER: &str = "stored";

/// Folder receiving bodies of pages whose selector query matched nothing.
pub const NOT_FOUND_FOLDER: &str = "not-found";

/// Writes page bodies to `<root>/<folder>/<test identity>.html`.
#[derive(Debug, Clone)]
pub struct BodyStore {
    root: PathBuf,
}

impl BodyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic location of a body for `test` inside `folder`.
    pub fn path_for(&self, folder: &str, test: &TestIdentity) -> PathBuf {
        self.root
            .join(folder.trim_matches('/'))
            .join(format!("{test}.html"))
    }

    /// Write `body` verbatim, creating parent directories as needed.
    pub fn write(&self, folder: &str, test: &TestIdentity, body: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path_for(folder, test);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, body)?;
        tracing::debug!("stored page body for {test} at {}", path.display());
        Ok(path)
    }
}
