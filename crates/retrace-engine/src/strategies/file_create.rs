//! Reversal of file creations

use async_trait::async_trait;
use retrace_ops::{Operation, OperationData};
use tokio::fs;

use crate::preview::Preview;
use crate::strategies::{wrong_payload, write_file, OperationContext, ReversalResult, ReversalStrategy};

/// Undo deletes the created file (after stashing it); redo rewrites it from
/// the recorded content or, failing that, from the stashed backup
pub struct FileCreateStrategy;

#[async_trait]
impl ReversalStrategy for FileCreateStrategy {
    async fn preview_undo(&self, op: &Operation) -> Preview {
        let OperationData::FileCreate { path, .. } = &op.data else {
            return Preview::info("Unexpected payload for a file creation");
        };
        match fs::read_to_string(path).await {
            Ok(content) => Preview::content(content)
                .warn(format!("Undo will delete {}", path.display())),
            Err(_) => Preview::info(format!(
                "{} is missing or unreadable; undo will treat it as already removed",
                path.display()
            )),
        }
    }

    async fn preview_redo(&self, op: &Operation) -> Preview {
        let OperationData::FileCreate { path, content } = &op.data else {
            return Preview::info("Unexpected payload for a file creation");
        };
        match content {
            Some(content) => Preview::content(content.clone())
                .warn(format!("Redo will recreate {}", path.display())),
            None => Preview::info(format!(
                "Redo will recreate {} from the operation's backup",
                path.display()
            ))
            .warn("No inline content was captured; recreation depends on backup availability"),
        }
    }

    async fn undo(&self, op: &Operation, ctx: &OperationContext) -> ReversalResult {
        let OperationData::FileCreate { path, .. } = &op.data else {
            return wrong_payload("FileCreate");
        };
        // Stash current bytes so a later redo can recover them even when the
        // record carries no inline content.
        let backup = ctx.backup(&op.id, path).await;
        match fs::remove_file(path).await {
            Ok(()) => ReversalResult::ok_with_backup(
                format!("Deleted {}", path.display()),
                backup,
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Goal state is "file absent"; it already is.
                ReversalResult::ok(format!("{} was already absent", path.display()))
            }
            Err(e) => ReversalResult::failure(format!(
                "Cannot delete {}: {}",
                path.display(),
                e
            )),
        }
    }

    async fn redo(&self, op: &Operation, ctx: &OperationContext) -> ReversalResult {
        let OperationData::FileCreate { path, content } = &op.data else {
            return wrong_payload("FileCreate");
        };
        let content = match content {
            Some(content) => content.clone(),
            None => match ctx.read_backup(&op.id).await {
                Some(content) => content,
                None => {
                    return ReversalResult::failure(format!(
                        "Cannot recreate {}: no content was captured and no backup exists",
                        path.display()
                    ))
                }
            },
        };
        match write_file(path, &content).await {
            Ok(()) => ReversalResult::ok(format!("Recreated {}", path.display())),
            Err(e) => ReversalResult::failure(format!(
                "Cannot recreate {}: {}",
                path.display(),
                e
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::PreviewKind;
    use chrono::Utc;
    use retrace_ops::BackupStore;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn op_for(path: PathBuf, content: Option<String>) -> Operation {
        Operation::new(
            OperationData::FileCreate { path, content },
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
    async fn test_undo_deletes_and_redo_recreates_from_content() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "hello").await.unwrap();
        let op = op_for(file.clone(), Some("hello".into()));
        let ctx = ctx(&temp);

        let result = FileCreateStrategy.undo(&op, &ctx).await;
        assert!(result.success);
        assert!(result.backup_path.is_some());
        assert!(!file.exists());

        let result = FileCreateStrategy.redo(&op, &ctx).await;
        assert!(result.success);
        assert_eq!(fs::read_to_string(&file).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_undo_of_missing_file_succeeds() {
        let temp = TempDir::new().unwrap();
        let op = op_for(temp.path().join("gone.txt"), Some("x".into()));

        let result = FileCreateStrategy.undo(&op, &ctx(&temp)).await;
        assert!(result.success);
        assert!(result.message.contains("already absent"));
    }

    #[tokio::test]
    async fn test_redo_falls_back_to_backup() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "from disk").await.unwrap();
        // No inline content captured; the undo's backup is the only copy.
        let op = op_for(file.clone(), None);
        let ctx = ctx(&temp);

        assert!(FileCreateStrategy.undo(&op, &ctx).await.success);
        let result = FileCreateStrategy.redo(&op, &ctx).await;
        assert!(result.success);
        assert_eq!(fs::read_to_string(&file).await.unwrap(), "from disk");
    }

    #[tokio::test]
    async fn test_redo_without_content_or_backup_fails() {
        let temp = TempDir::new().unwrap();
        let op = op_for(temp.path().join("a.txt"), None);

        let result = FileCreateStrategy.redo(&op, &ctx(&temp)).await;
        assert!(!result.success);
        assert!(result.message.contains("no backup"));
    }

    #[tokio::test]
    async fn test_preview_undo_shows_current_content() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "current").await.unwrap();
        let op = op_for(file, Some("current".into()));

        let preview = FileCreateStrategy.preview_undo(&op).await;
        assert!(matches!(preview.kind, PreviewKind::Content { ref content } if content == "current"));
        assert!(!preview.warnings.is_empty());
        // Preview must not mutate.
        assert!(temp.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_preview_undo_missing_file_is_informational() {
        let temp = TempDir::new().unwrap();
        let op = op_for(temp.path().join("gone.txt"), None);
        let preview = FileCreateStrategy.preview_undo(&op).await;
        assert!(matches!(preview.kind, PreviewKind::Info { .. }));
    }
}
