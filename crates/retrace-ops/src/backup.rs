//! Blob storage for file contents stashed before destructive steps
//!
//! Blobs are keyed by operation id: a strategy that is about to delete or
//! overwrite a file stashes the current bytes under its operation's id, and
//! a later redo/undo can recover them even when the operation record itself
//! carries no inline content.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Operation-id-keyed backup storage rooted at a per-workspace directory
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    /// Creates a store rooted at `root`; the directory is created lazily on
    /// first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        BackupStore { root: root.into() }
    }

    /// The directory blobs are written under
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copies the current bytes of `path` into the store under `op_id`
    ///
    /// Returns the blob path, or `None` when the source cannot be read.
    /// Backing up an unreadable file is never fatal: the caller decides
    /// whether the missing backup matters.
    pub async fn backup(&self, op_id: &str, path: &Path) -> Option<PathBuf> {
        let content = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    "Skipping backup for operation {}: cannot read {}: {}",
                    op_id,
                    path.display(),
                    e
                );
                return None;
            }
        };

        if let Err(e) = fs::create_dir_all(&self.root).await {
            warn!("Cannot create backup directory {}: {}", self.root.display(), e);
            return None;
        }

        let blob = self.blob_path(op_id);
        match fs::write(&blob, &content).await {
            Ok(()) => {
                debug!(
                    "Backed up {} ({} bytes) for operation {}",
                    path.display(),
                    content.len(),
                    op_id
                );
                Some(blob)
            }
            Err(e) => {
                warn!("Cannot write backup blob {}: {}", blob.display(), e);
                None
            }
        }
    }

    /// Path of the blob stored for `op_id`, when one exists
    pub async fn resolve(&self, op_id: &str) -> Option<PathBuf> {
        let blob = self.blob_path(op_id);
        match fs::try_exists(&blob).await {
            Ok(true) => Some(blob),
            _ => None,
        }
    }

    /// Contents of the blob stored for `op_id`, when one exists and is UTF-8
    pub async fn read(&self, op_id: &str) -> Option<String> {
        let blob = self.resolve(op_id).await?;
        fs::read_to_string(&blob).await.ok()
    }

    fn blob_path(&self, op_id: &str) -> PathBuf {
        // Tool ids are caller-supplied; keep only filename-safe characters.
        let safe: String = op_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.bak", safe))
    }
}
