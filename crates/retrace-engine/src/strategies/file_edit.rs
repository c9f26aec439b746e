//! Reversal of single string-substitution edits
//!
//! Both directions substitute against the file's *current* content rather
//! than restoring a stored snapshot, so unrelated later edits to the same
//! file survive an undo. The cost is divergence: when the expected text is
//! no longer present the edit cannot be reversed.

use async_trait::async_trait;
use retrace_ops::{Operation, OperationData};
use tokio::fs;

use crate::preview::Preview;
use crate::strategies::{substitute, wrong_payload, OperationContext, ReversalResult, ReversalStrategy};

/// Undo replaces `new_string` back to `old_string`; redo the inverse
pub struct FileEditStrategy;

impl FileEditStrategy {
    async fn apply(
        &self,
        op: &Operation,
        from_new_to_old: bool,
    ) -> ReversalResult {
        let OperationData::FileEdit {
            path,
            old_string,
            new_string,
            replace_all,
        } = &op.data
        else {
            return wrong_payload("FileEdit");
        };
        let (from, to) = if from_new_to_old {
            (new_string, old_string)
        } else {
            (old_string, new_string)
        };

        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                return ReversalResult::failure(format!(
                    "Cannot read {}: {}",
                    path.display(),
                    e
                ))
            }
        };
        let Some(updated) = substitute(&content, from, to, *replace_all) else {
            return ReversalResult::failure(format!(
                "Cannot reverse edit to {}: the expected text is no longer present; the file has diverged",
                path.display()
            ));
        };
        match fs::write(path, &updated).await {
            Ok(()) => ReversalResult::ok(format!("Updated {}", path.display())),
            Err(e) => ReversalResult::failure(format!(
                "Cannot write {}: {}",
                path.display(),
                e
            )),
        }
    }

    async fn preview(&self, op: &Operation, from_new_to_old: bool) -> Preview {
        let OperationData::FileEdit {
            path,
            old_string,
            new_string,
            replace_all,
        } = &op.data
        else {
            return Preview::info("Unexpected payload for a file edit");
        };
        let (from, to) = if from_new_to_old {
            (new_string, old_string)
        } else {
            (old_string, new_string)
        };

        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                return Preview::info(format!(
                    "Cannot preview edit to {}: {}",
                    path.display(),
                    e
                ))
            }
        };
        match substitute(&content, from, to, *replace_all) {
            Some(updated) => Preview::diff(&content, &updated),
            None => Preview::info(format!(
                "The edit to {} cannot be reversed: the expected text is no longer present",
                path.display()
            ))
            .warn("The file has diverged since this edit was recorded"),
        }
    }
}

#[async_trait]
impl ReversalStrategy for FileEditStrategy {
    async fn preview_undo(&self, op: &Operation) -> Preview {
        self.preview(op, true).await
    }

    async fn preview_redo(&self, op: &Operation) -> Preview {
        self.preview(op, false).await
    }

    async fn undo(&self, op: &Operation, _ctx: &OperationContext) -> ReversalResult {
        self.apply(op, true).await
    }

    async fn redo(&self, op: &Operation, _ctx: &OperationContext) -> ReversalResult {
        self.apply(op, false).await
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

    fn edit_op(path: PathBuf, old: &str, new: &str, replace_all: bool) -> Operation {
        Operation::new(
            OperationData::FileEdit {
                path,
                old_string: old.into(),
                new_string: new.into(),
                replace_all,
            },
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
    async fn test_undo_then_redo_round_trips() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "baz bar").await.unwrap();
        let op = edit_op(file.clone(), "foo", "baz", false);
        let ctx = ctx(&temp);

        assert!(FileEditStrategy.undo(&op, &ctx).await.success);
        assert_eq!(fs::read_to_string(&file).await.unwrap(), "foo bar");

        assert!(FileEditStrategy.redo(&op, &ctx).await.success);
        assert_eq!(fs::read_to_string(&file).await.unwrap(), "baz bar");
    }

    #[tokio::test]
    async fn test_undo_respects_replace_all() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "new new new").await.unwrap();
        let op = edit_op(file.clone(), "old", "new", true);

        assert!(FileEditStrategy.undo(&op, &ctx(&temp)).await.success);
        assert_eq!(fs::read_to_string(&file).await.unwrap(), "old old old");
    }

    #[tokio::test]
    async fn test_undo_of_diverged_file_fails() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "rewritten entirely").await.unwrap();
        let op = edit_op(file, "foo", "baz", false);

        let result = FileEditStrategy.undo(&op, &ctx(&temp)).await;
        assert!(!result.success);
        assert!(result.message.contains("diverged"));
    }

    #[tokio::test]
    async fn test_undo_of_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let op = edit_op(temp.path().join("gone.txt"), "foo", "baz", false);

        let result = FileEditStrategy.undo(&op, &ctx(&temp)).await;
        assert!(!result.success);
        assert!(result.message.contains("Cannot read"));
    }

    #[tokio::test]
    async fn test_preview_undo_is_a_diff_and_does_not_mutate() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "baz bar").await.unwrap();
        let op = edit_op(file.clone(), "foo", "baz", false);

        let preview = FileEditStrategy.preview_undo(&op).await;
        assert!(matches!(preview.kind, PreviewKind::Diff { .. }));
        let (added, removed) = preview.change_counts();
        assert_eq!((added, removed), (1, 1));
        assert_eq!(fs::read_to_string(&file).await.unwrap(), "baz bar");
    }

    #[tokio::test]
    async fn test_preview_of_diverged_file_is_informational() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "something else").await.unwrap();
        let op = edit_op(file, "foo", "baz", false);

        let preview = FileEditStrategy.preview_undo(&op).await;
        assert!(matches!(preview.kind, PreviewKind::Info { .. }));
        assert!(!preview.warnings.is_empty());
    }
}
