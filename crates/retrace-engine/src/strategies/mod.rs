//! Per-operation-kind reversal strategies
//!
//! Every strategy exposes the same four operations: read-only undo/redo
//! previews and the undo/redo executions themselves. Expected failures
//! (divergent edits, missing backups, shell commands) come back as
//! `ReversalResult { success: false, .. }` so a cascade step can fail
//! without poisoning the journal.

pub mod bash_command;
pub mod directory;
pub mod file_create;
pub mod file_delete;
pub mod file_edit;
pub mod file_rename;
pub mod multi_edit;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use retrace_ops::{BackupStore, Operation, OperationData};
use tokio::fs;

use crate::preview::Preview;

pub use bash_command::BashCommandStrategy;
pub use directory::{DirectoryCreateStrategy, DirectoryDeleteStrategy};
pub use file_create::FileCreateStrategy;
pub use file_delete::FileDeleteStrategy;
pub use file_edit::FileEditStrategy;
pub use file_rename::FileRenameStrategy;
pub use multi_edit::MultiEditStrategy;

/// Shared handles a strategy needs while executing
#[derive(Debug, Clone)]
pub struct OperationContext {
    backups: BackupStore,
}

impl OperationContext {
    /// Wraps the backup store strategies stash bytes into
    pub fn new(backups: BackupStore) -> Self {
        OperationContext { backups }
    }

    /// The underlying store
    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Stashes the current bytes of `path` under `op_id`; `None` when the
    /// source cannot be read
    pub async fn backup(&self, op_id: &str, path: &Path) -> Option<PathBuf> {
        self.backups.backup(op_id, path).await
    }

    /// Path of the blob previously stashed for `op_id`, when one exists
    pub async fn resolve_backup(&self, op_id: &str) -> Option<PathBuf> {
        self.backups.resolve(op_id).await
    }

    /// Contents of the blob previously stashed for `op_id`
    pub async fn read_backup(&self, op_id: &str) -> Option<String> {
        self.backups.read(op_id).await
    }
}

/// Outcome of one undo or redo step
#[derive(Debug, Clone)]
pub struct ReversalResult {
    /// Whether the step reached its goal state
    pub success: bool,
    /// What happened, phrased for the user
    pub message: String,
    /// Blob stashed while executing the step, when one was taken
    pub backup_path: Option<PathBuf>,
}

impl ReversalResult {
    /// Successful step
    pub fn ok(message: impl Into<String>) -> Self {
        ReversalResult {
            success: true,
            message: message.into(),
            backup_path: None,
        }
    }

    /// Successful step that stashed a backup along the way
    pub fn ok_with_backup(message: impl Into<String>, backup_path: Option<PathBuf>) -> Self {
        ReversalResult {
            success: true,
            message: message.into(),
            backup_path,
        }
    }

    /// Failed step; the cascade stops here
    pub fn failure(message: impl Into<String>) -> Self {
        ReversalResult {
            success: false,
            message: message.into(),
            backup_path: None,
        }
    }
}

/// Preview and execution of both reversal directions for one operation kind
#[async_trait]
pub trait ReversalStrategy: Send + Sync {
    /// What undoing this operation would do; never mutates the filesystem
    async fn preview_undo(&self, op: &Operation) -> Preview;
    /// What redoing this operation would do; never mutates the filesystem
    async fn preview_redo(&self, op: &Operation) -> Preview;
    /// Reverts the operation's mutation
    async fn undo(&self, op: &Operation, ctx: &OperationContext) -> ReversalResult;
    /// Reapplies the operation's mutation
    async fn redo(&self, op: &Operation, ctx: &OperationContext) -> ReversalResult;
}

/// The strategy responsible for an operation payload
pub fn strategy_for(data: &OperationData) -> &'static dyn ReversalStrategy {
    match data {
        OperationData::FileCreate { .. } => &FileCreateStrategy,
        OperationData::FileEdit { .. } => &FileEditStrategy,
        OperationData::MultiEdit { .. } => &MultiEditStrategy,
        OperationData::FileDelete { .. } => &FileDeleteStrategy,
        OperationData::FileRename { .. } => &FileRenameStrategy,
        OperationData::DirectoryCreate { .. } => &DirectoryCreateStrategy,
        OperationData::DirectoryDelete { .. } => &DirectoryDeleteStrategy,
        OperationData::BashCommand { .. } => &BashCommandStrategy,
    }
}

/// Replaces `from` with `to` in `content`; `None` when `from` is absent,
/// which means the file has diverged and the edit cannot be reversed
pub(crate) fn substitute(content: &str, from: &str, to: &str, replace_all: bool) -> Option<String> {
    if !content.contains(from) {
        return None;
    }
    Some(if replace_all {
        content.replace(from, to)
    } else {
        content.replacen(from, to, 1)
    })
}

/// Writes `content` to `path`, creating parent directories as needed
pub(crate) async fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(path, content).await
}

/// Soft failure for a strategy handed the wrong payload variant; indicates an
/// internal dispatch inconsistency, reported rather than panicking
pub(crate) fn wrong_payload(expected: &str) -> ReversalResult {
    ReversalResult::failure(format!(
        "Internal inconsistency: expected a {} payload",
        expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_substitute_first_occurrence() {
        assert_eq!(
            substitute("foo bar foo", "foo", "baz", false).as_deref(),
            Some("baz bar foo")
        );
    }

    #[test]
    fn test_substitute_replace_all() {
        assert_eq!(
            substitute("foo bar foo", "foo", "baz", true).as_deref(),
            Some("baz bar baz")
        );
    }

    #[test]
    fn test_substitute_divergent_content() {
        assert!(substitute("something else", "foo", "baz", false).is_none());
    }

    #[test]
    fn test_strategy_dispatch_covers_every_kind() {
        // Dispatch is by payload variant; this pins each arm to a strategy
        // that accepts the payload.
        let payloads = vec![
            OperationData::FileCreate {
                path: PathBuf::from("a"),
                content: None,
            },
            OperationData::FileEdit {
                path: PathBuf::from("a"),
                old_string: "x".into(),
                new_string: "y".into(),
                replace_all: false,
            },
            OperationData::MultiEdit {
                path: PathBuf::from("a"),
                edits: vec![],
            },
            OperationData::FileDelete {
                path: PathBuf::from("a"),
                content: None,
            },
            OperationData::FileRename {
                old_path: PathBuf::from("a"),
                new_path: PathBuf::from("b"),
            },
            OperationData::DirectoryCreate {
                path: PathBuf::from("d"),
            },
            OperationData::DirectoryDelete {
                path: PathBuf::from("d"),
            },
            OperationData::BashCommand {
                command: "ls".into(),
            },
        ];
        for payload in payloads {
            let _ = strategy_for(&payload);
        }
    }
}
