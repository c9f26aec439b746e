//! Reversal of batched string-substitution edits
//!
//! Undo applies the edit list in reverse order, redo in forward order, both
//! against current on-disk content. A single missing substring fails the
//! whole step before anything is written.

use async_trait::async_trait;
use retrace_ops::{EditSpec, Operation, OperationData};
use tokio::fs;

use crate::preview::Preview;
use crate::strategies::{substitute, wrong_payload, OperationContext, ReversalResult, ReversalStrategy};

/// Undo walks the edits newest-to-oldest swapping new for old; redo replays
/// them oldest-to-newest
pub struct MultiEditStrategy;

/// Applies the whole edit list to `content` in memory, or reports the
/// 1-based index of the first edit whose expected text is missing
fn apply_edits(content: &str, edits: &[EditSpec], reverse: bool) -> Result<String, usize> {
    let mut current = content.to_string();
    let indexed: Vec<(usize, &EditSpec)> = if reverse {
        edits.iter().enumerate().rev().collect()
    } else {
        edits.iter().enumerate().collect()
    };
    for (idx, edit) in indexed {
        let (from, to) = if reverse {
            (&edit.new_string, &edit.old_string)
        } else {
            (&edit.old_string, &edit.new_string)
        };
        match substitute(&current, from, to, edit.replace_all) {
            Some(updated) => current = updated,
            None => return Err(idx + 1),
        }
    }
    Ok(current)
}

impl MultiEditStrategy {
    async fn apply(&self, op: &Operation, reverse: bool) -> ReversalResult {
        let OperationData::MultiEdit { path, edits } = &op.data else {
            return wrong_payload("MultiEdit");
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
        let updated = match apply_edits(&content, edits, reverse) {
            Ok(updated) => updated,
            Err(idx) => {
                return ReversalResult::failure(format!(
                    "Cannot reverse edit {} of {} in {}: the expected text is no longer present; the file has diverged",
                    idx,
                    edits.len(),
                    path.display()
                ))
            }
        };
        match fs::write(path, &updated).await {
            Ok(()) => ReversalResult::ok(format!(
                "Applied {} edit(s) to {}",
                edits.len(),
                path.display()
            )),
            Err(e) => ReversalResult::failure(format!(
                "Cannot write {}: {}",
                path.display(),
                e
            )),
        }
    }

    async fn preview(&self, op: &Operation, reverse: bool) -> Preview {
        let OperationData::MultiEdit { path, edits } = &op.data else {
            return Preview::info("Unexpected payload for a multi-edit");
        };
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                return Preview::info(format!(
                    "Cannot preview edits to {}: {}",
                    path.display(),
                    e
                ))
            }
        };
        match apply_edits(&content, edits, reverse) {
            Ok(updated) => Preview::diff(&content, &updated),
            Err(idx) => Preview::info(format!(
                "Edit {} of {} in {} cannot be reversed: the expected text is no longer present",
                idx,
                edits.len(),
                path.display()
            ))
            .warn("The file has diverged since these edits were recorded"),
        }
    }
}

#[async_trait]
impl ReversalStrategy for MultiEditStrategy {
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
    use chrono::Utc;
    use retrace_ops::BackupStore;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn spec(old: &str, new: &str) -> EditSpec {
        EditSpec {
            old_string: old.into(),
            new_string: new.into(),
            replace_all: false,
        }
    }

    fn multi_op(path: PathBuf, edits: Vec<EditSpec>) -> Operation {
        Operation::new(
            OperationData::MultiEdit { path, edits },
            Utc::now(),
            None,
            None,
            None,
        )
    }

    fn ctx(temp: &TempDir) -> OperationContext {
        OperationContext::new(BackupStore::new(temp.path().join("backups")))
    }

    #[test]
    fn test_apply_edits_reverse_order_matters() {
        // Forward: "a" -> "b", then "b c" -> "d". Reversing must unwind the
        // second edit before the first.
        let edits = vec![spec("a", "b"), spec("b c", "d")];
        let forward = apply_edits("a c", &edits, false).unwrap();
        assert_eq!(forward, "d");
        let back = apply_edits(&forward, &edits, true).unwrap();
        assert_eq!(back, "a c");
    }

    #[test]
    fn test_apply_edits_reports_failing_index() {
        let edits = vec![spec("a", "b"), spec("x", "y")];
        assert_eq!(apply_edits("b only", &edits, true), Err(1));
    }

    #[tokio::test]
    async fn test_undo_then_redo_round_trips() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "two four").await.unwrap();
        let op = multi_op(
            file.clone(),
            vec![spec("one", "two"), spec("three", "four")],
        );
        let ctx = ctx(&temp);

        assert!(MultiEditStrategy.undo(&op, &ctx).await.success);
        assert_eq!(fs::read_to_string(&file).await.unwrap(), "one three");

        assert!(MultiEditStrategy.redo(&op, &ctx).await.success);
        assert_eq!(fs::read_to_string(&file).await.unwrap(), "two four");
    }

    #[tokio::test]
    async fn test_divergent_edit_fails_without_writing() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "two gone").await.unwrap();
        let op = multi_op(
            file.clone(),
            vec![spec("one", "two"), spec("three", "four")],
        );

        let result = MultiEditStrategy.undo(&op, &ctx(&temp)).await;
        assert!(!result.success);
        assert!(result.message.contains("edit 2 of 2"));
        // Nothing was written.
        assert_eq!(fs::read_to_string(&file).await.unwrap(), "two gone");
    }
}
