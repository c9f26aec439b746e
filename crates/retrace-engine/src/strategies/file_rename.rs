//! Reversal of file renames

use async_trait::async_trait;
use retrace_ops::{Operation, OperationData};
use tokio::fs;

use crate::preview::Preview;
use crate::strategies::{wrong_payload, OperationContext, ReversalResult, ReversalStrategy};

/// Undo and redo swap the old and new paths in a rename; no backup needed
pub struct FileRenameStrategy;

impl FileRenameStrategy {
    async fn rename(
        &self,
        op: &Operation,
        back: bool,
    ) -> ReversalResult {
        let OperationData::FileRename { old_path, new_path } = &op.data else {
            return wrong_payload("FileRename");
        };
        let (from, to) = if back {
            (new_path, old_path)
        } else {
            (old_path, new_path)
        };
        match fs::rename(from, to).await {
            Ok(()) => ReversalResult::ok(format!(
                "Renamed {} to {}",
                from.display(),
                to.display()
            )),
            Err(e) => ReversalResult::failure(format!(
                "Cannot rename {} to {}: {}",
                from.display(),
                to.display(),
                e
            )),
        }
    }
}

#[async_trait]
impl ReversalStrategy for FileRenameStrategy {
    async fn preview_undo(&self, op: &Operation) -> Preview {
        let OperationData::FileRename { old_path, new_path } = &op.data else {
            return Preview::info("Unexpected payload for a file rename");
        };
        Preview::info(format!(
            "Undo will rename {} back to {}",
            new_path.display(),
            old_path.display()
        ))
    }

    async fn preview_redo(&self, op: &Operation) -> Preview {
        let OperationData::FileRename { old_path, new_path } = &op.data else {
            return Preview::info("Unexpected payload for a file rename");
        };
        Preview::info(format!(
            "Redo will rename {} to {}",
            old_path.display(),
            new_path.display()
        ))
    }

    async fn undo(&self, op: &Operation, _ctx: &OperationContext) -> ReversalResult {
        self.rename(op, true).await
    }

    async fn redo(&self, op: &Operation, _ctx: &OperationContext) -> ReversalResult {
        self.rename(op, false).await
    }
}
