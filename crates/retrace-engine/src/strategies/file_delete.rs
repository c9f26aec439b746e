//! Reversal of file deletions

use async_trait::async_trait;
use retrace_ops::{Operation, OperationData};
use tokio::fs;

use crate::preview::Preview;
use crate::strategies::{wrong_payload, write_file, OperationContext, ReversalResult, ReversalStrategy};

/// Undo restores the file from the content captured at delete time; redo
/// deletes it again with a fresh backup
pub struct FileDeleteStrategy;

#[async_trait]
impl ReversalStrategy for FileDeleteStrategy {
    async fn preview_undo(&self, op: &Operation) -> Preview {
        let OperationData::FileDelete { path, content } = &op.data else {
            return Preview::info("Unexpected payload for a file deletion");
        };
        match content {
            Some(content) => Preview::content(content.clone())
                .warn(format!("Undo will restore {}", path.display())),
            None => Preview::info(format!(
                "{} cannot be restored: its content was never captured",
                path.display()
            ))
            .warn("Undo of this deletion will fail"),
        }
    }

    async fn preview_redo(&self, op: &Operation) -> Preview {
        let OperationData::FileDelete { path, .. } = &op.data else {
            return Preview::info("Unexpected payload for a file deletion");
        };
        match fs::read_to_string(path).await {
            Ok(content) => Preview::content(content)
                .warn(format!("Redo will delete {}", path.display())),
            Err(_) => Preview::info(format!(
                "{} is missing or unreadable; redo will treat it as already deleted",
                path.display()
            )),
        }
    }

    async fn undo(&self, op: &Operation, ctx: &OperationContext) -> ReversalResult {
        let OperationData::FileDelete { path, content } = &op.data else {
            return wrong_payload("FileDelete");
        };
        let content = match content {
            Some(content) => content.clone(),
            // A redo of this deletion stashes a backup; fall back to it
            // before giving up.
            None => match ctx.read_backup(&op.id).await {
                Some(content) => content,
                None => {
                    return ReversalResult::failure(format!(
                        "Cannot restore {}: its content was never captured",
                        path.display()
                    ))
                }
            },
        };
        match write_file(path, &content).await {
            Ok(()) => ReversalResult::ok(format!("Restored {}", path.display())),
            Err(e) => ReversalResult::failure(format!(
                "Cannot restore {}: {}",
                path.display(),
                e
            )),
        }
    }

    async fn redo(&self, op: &Operation, ctx: &OperationContext) -> ReversalResult {
        let OperationData::FileDelete { path, .. } = &op.data else {
            return wrong_payload("FileDelete");
        };
        let backup = ctx.backup(&op.id, path).await;
        match fs::remove_file(path).await {
            Ok(()) => ReversalResult::ok_with_backup(
                format!("Deleted {}", path.display()),
                backup,
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ReversalResult::ok(format!("{} was already absent", path.display()))
            }
            Err(e) => ReversalResult::failure(format!(
                "Cannot delete {}: {}",
                path.display(),
                e
            )),
        }
    }
}
