//! Reversal of directory creations and removals
//!
//! Removal is always non-recursive: a directory that still has contents is
//! never deleted silently, the step fails instead and the cascade surfaces
//! the failure.

use std::path::Path;

use async_trait::async_trait;
use retrace_ops::{Operation, OperationData};
use tokio::fs;

use crate::preview::Preview;
use crate::strategies::{wrong_payload, OperationContext, ReversalResult, ReversalStrategy};

/// Undo removes the created directory (only when empty); redo recreates it
pub struct DirectoryCreateStrategy;

/// Undo recreates the removed directory; redo removes it again (only when
/// empty)
pub struct DirectoryDeleteStrategy;

async fn create_dir(path: &Path, verb: &str) -> ReversalResult {
    match fs::create_dir(path).await {
        Ok(()) => ReversalResult::ok(format!("Created directory {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            ReversalResult::ok(format!("Directory {} already exists", path.display()))
        }
        Err(e) => ReversalResult::failure(format!(
            "Cannot {} directory {}: {}",
            verb,
            path.display(),
            e
        )),
    }
}

async fn remove_dir(path: &Path) -> ReversalResult {
    match fs::remove_dir(path).await {
        Ok(()) => ReversalResult::ok(format!("Removed directory {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            ReversalResult::ok(format!("Directory {} was already absent", path.display()))
        }
        // Non-empty directories land here; contents are never deleted
        // implicitly.
        Err(e) => ReversalResult::failure(format!(
            "Cannot remove directory {}: {} (directories are only removed when empty)",
            path.display(),
            e
        )),
    }
}

#[async_trait]
impl ReversalStrategy for DirectoryCreateStrategy {
    async fn preview_undo(&self, op: &Operation) -> Preview {
        let OperationData::DirectoryCreate { path } = &op.data else {
            return Preview::info("Unexpected payload for a directory creation");
        };
        Preview::info(format!(
            "Undo will remove the directory {} (only if empty)",
            path.display()
        ))
    }

    async fn preview_redo(&self, op: &Operation) -> Preview {
        let OperationData::DirectoryCreate { path } = &op.data else {
            return Preview::info("Unexpected payload for a directory creation");
        };
        Preview::info(format!(
            "Redo will create the directory {}",
            path.display()
        ))
    }

    async fn undo(&self, op: &Operation, _ctx: &OperationContext) -> ReversalResult {
        let OperationData::DirectoryCreate { path } = &op.data else {
            return wrong_payload("DirectoryCreate");
        };
        remove_dir(path).await
    }

    async fn redo(&self, op: &Operation, _ctx: &OperationContext) -> ReversalResult {
        let OperationData::DirectoryCreate { path } = &op.data else {
            return wrong_payload("DirectoryCreate");
        };
        create_dir(path, "recreate").await
    }
}

#[async_trait]
impl ReversalStrategy for DirectoryDeleteStrategy {
    async fn preview_undo(&self, op: &Operation) -> Preview {
        let OperationData::DirectoryDelete { path } = &op.data else {
            return Preview::info("Unexpected payload for a directory removal");
        };
        Preview::info(format!(
            "Undo will recreate the directory {}",
            path.display()
        ))
        .warn("Files previously inside the directory are restored by their own operations")
    }

    async fn preview_redo(&self, op: &Operation) -> Preview {
        let OperationData::DirectoryDelete { path } = &op.data else {
            return Preview::info("Unexpected payload for a directory removal");
        };
        Preview::info(format!(
            "Redo will remove the directory {} (only if empty)",
            path.display()
        ))
    }

    async fn undo(&self, op: &Operation, _ctx: &OperationContext) -> ReversalResult {
        let OperationData::DirectoryDelete { path } = &op.data else {
            return wrong_payload("DirectoryDelete");
        };
        create_dir(path, "recreate").await
    }

    async fn redo(&self, op: &Operation, _ctx: &OperationContext) -> ReversalResult {
        let OperationData::DirectoryDelete { path } = &op.data else {
            return wrong_payload("DirectoryDelete");
        };
        remove_dir(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use retrace_ops::BackupStore;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn dir_create_op(path: PathBuf) -> Operation {
        Operation::new(
            OperationData::DirectoryCreate { path },
            Utc::now(),
            None,
            None,
            None,
        )
    }

    fn dir_delete_op(path: PathBuf) -> Operation {
        Operation::new(
            OperationData::DirectoryDelete { path },
            Utc::now(),
            None,
            None,
            None,
        )
    }

    fn ctx(temp: &TempDir) -> OperationContext {
        OperationContext::new(BackupStore::new(temp.path().join("backups")))
    }

    #[tokio::test]
    async fn test_create_undo_removes_empty_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("d");
        fs::create_dir(&dir).await.unwrap();
        let op = dir_create_op(dir.clone());

        assert!(DirectoryCreateStrategy.undo(&op, &ctx(&temp)).await.success);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_create_undo_refuses_non_empty_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("d");
        fs::create_dir(&dir).await.unwrap();
        fs::write(dir.join("keep.txt"), "content").await.unwrap();
        let op = dir_create_op(dir.clone());

        let result = DirectoryCreateStrategy.undo(&op, &ctx(&temp)).await;
        assert!(!result.success);
        assert!(result.message.contains("only removed when empty"));
        assert!(dir.join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_create_redo_recreates_and_tolerates_existing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("d");
        let op = dir_create_op(dir.clone());
        let ctx = ctx(&temp);

        assert!(DirectoryCreateStrategy.redo(&op, &ctx).await.success);
        assert!(dir.is_dir());
        // Second redo is a no-op success.
        assert!(DirectoryCreateStrategy.redo(&op, &ctx).await.success);
    }

    #[tokio::test]
    async fn test_delete_undo_recreates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("d");
        let op = dir_delete_op(dir.clone());

        assert!(DirectoryDeleteStrategy.undo(&op, &ctx(&temp)).await.success);
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_delete_redo_of_missing_directory_succeeds() {
        let temp = TempDir::new().unwrap();
        let op = dir_delete_op(temp.path().join("gone"));

        let result = DirectoryDeleteStrategy.redo(&op, &ctx(&temp)).await;
        assert!(result.success);
        assert!(result.message.contains("already absent"));
    }
}
