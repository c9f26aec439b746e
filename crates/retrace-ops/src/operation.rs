//! Operation records and their typed payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A single substitution inside a [`OperationData::MultiEdit`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSpec {
    /// Text expected to be present in the file
    pub old_string: String,
    /// Text that replaced `old_string`
    pub new_string: String,
    /// Whether every occurrence was replaced, or only the first
    #[serde(default)]
    pub replace_all: bool,
}

/// Payload of a tracked operation, one variant per mutation kind
///
/// Each variant carries only the fields that mutation needs, so strategy
/// dispatch never has to guess at optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationData {
    /// A file was created
    FileCreate {
        /// Path of the created file
        path: PathBuf,
        /// Content written at creation time, when the caller captured it
        content: Option<String>,
    },
    /// A single string substitution was applied to a file
    FileEdit {
        /// Path of the edited file
        path: PathBuf,
        /// Text that was replaced
        old_string: String,
        /// Text it was replaced with
        new_string: String,
        /// Whether every occurrence was replaced
        #[serde(default)]
        replace_all: bool,
    },
    /// A batch of substitutions was applied to a file in order
    MultiEdit {
        /// Path of the edited file
        path: PathBuf,
        /// The substitutions, in application order
        edits: Vec<EditSpec>,
    },
    /// A file was deleted
    FileDelete {
        /// Path of the deleted file
        path: PathBuf,
        /// Content captured at delete time; required to restore the file
        content: Option<String>,
    },
    /// A file was renamed or moved
    FileRename {
        /// Path before the rename
        old_path: PathBuf,
        /// Path after the rename
        new_path: PathBuf,
    },
    /// A directory was created
    DirectoryCreate {
        /// Path of the created directory
        path: PathBuf,
    },
    /// A directory was removed
    DirectoryDelete {
        /// Path of the removed directory
        path: PathBuf,
    },
    /// A shell command was executed; never automatically reversible
    BashCommand {
        /// The command text as executed
        command: String,
    },
}

impl OperationData {
    /// The kind tag for this payload
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationData::FileCreate { .. } => OperationKind::FileCreate,
            OperationData::FileEdit { .. } => OperationKind::FileEdit,
            OperationData::MultiEdit { .. } => OperationKind::MultiEdit,
            OperationData::FileDelete { .. } => OperationKind::FileDelete,
            OperationData::FileRename { .. } => OperationKind::FileRename,
            OperationData::DirectoryCreate { .. } => OperationKind::DirectoryCreate,
            OperationData::DirectoryDelete { .. } => OperationKind::DirectoryDelete,
            OperationData::BashCommand { .. } => OperationKind::BashCommand,
        }
    }

    /// Every filesystem path this operation touches (renames report both)
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            OperationData::FileCreate { path, .. }
            | OperationData::FileEdit { path, .. }
            | OperationData::MultiEdit { path, .. }
            | OperationData::FileDelete { path, .. }
            | OperationData::DirectoryCreate { path }
            | OperationData::DirectoryDelete { path } => vec![path.as_path()],
            OperationData::FileRename { old_path, new_path } => {
                vec![old_path.as_path(), new_path.as_path()]
            }
            OperationData::BashCommand { .. } => Vec::new(),
        }
    }

    /// Whether this operation mutates a file (as opposed to a directory or
    /// the shell)
    pub fn is_file_operation(&self) -> bool {
        matches!(
            self,
            OperationData::FileCreate { .. }
                | OperationData::FileEdit { .. }
                | OperationData::MultiEdit { .. }
                | OperationData::FileDelete { .. }
                | OperationData::FileRename { .. }
        )
    }
}

/// Discriminant for [`OperationData`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// File creation
    FileCreate,
    /// Single string substitution
    FileEdit,
    /// Ordered batch of substitutions
    MultiEdit,
    /// File deletion
    FileDelete,
    /// File rename or move
    FileRename,
    /// Directory creation
    DirectoryCreate,
    /// Directory removal
    DirectoryDelete,
    /// Shell command execution
    BashCommand,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::FileCreate => "FileCreate",
            OperationKind::FileEdit => "FileEdit",
            OperationKind::MultiEdit => "MultiEdit",
            OperationKind::FileDelete => "FileDelete",
            OperationKind::FileRename => "FileRename",
            OperationKind::DirectoryCreate => "DirectoryCreate",
            OperationKind::DirectoryDelete => "DirectoryDelete",
            OperationKind::BashCommand => "BashCommand",
        };
        write!(f, "{}", name)
    }
}

/// Reversal position of an operation
///
/// A failed attempt never moves the operation away from its pre-attempt
/// position: a failed undo leaves the mutation applied, a failed redo leaves
/// it reverted. The two failure variants record which direction failed so a
/// retry is only ever accepted in that same direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    /// The mutation is applied to the workspace
    Active,
    /// The mutation has been undone
    Undone,
    /// The last undo attempt failed; the mutation is still applied
    FailedUndo,
    /// The last redo attempt failed; the mutation is still reverted
    FailedRedo,
}

impl OperationStatus {
    /// Whether the mutation is currently on disk in this position
    pub fn is_applied(&self) -> bool {
        matches!(self, OperationStatus::Active | OperationStatus::FailedUndo)
    }

    /// Whether the mutation is currently reverted in this position
    pub fn is_reverted(&self) -> bool {
        matches!(self, OperationStatus::Undone | OperationStatus::FailedRedo)
    }

    /// Whether the last reversal attempt failed
    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            OperationStatus::FailedUndo | OperationStatus::FailedRedo
        )
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStatus::Active => write!(f, "active"),
            OperationStatus::Undone => write!(f, "undone"),
            OperationStatus::FailedUndo => write!(f, "failed undo"),
            OperationStatus::FailedRedo => write!(f, "failed redo"),
        }
    }
}

/// One recorded, potentially reversible mutation performed by the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Unique identifier; the caller's tool-invocation id when supplied
    pub id: String,
    /// Typed payload describing the mutation
    pub data: OperationData,
    /// When the operation was tracked; non-decreasing per journal
    pub timestamp: DateTime<Utc>,
    /// Message that produced this operation, when known
    pub message_id: Option<String>,
    /// Session the operation belongs to; absent before a session exists
    pub session_id: Option<String>,
    /// Current reversal position
    pub status: OperationStatus,
    /// Ids of operations that must be applied before this one
    pub depends_on: HashSet<String>,
    /// Ids of operations that require this one (inverse of `depends_on`)
    pub dependents: HashSet<String>,
    /// Message from the last failed reversal attempt
    pub error: Option<String>,
}

impl Operation {
    /// Build a new active operation, minting a fresh id when the caller did
    /// not supply a tool id
    pub fn new(
        data: OperationData,
        timestamp: DateTime<Utc>,
        message_id: Option<String>,
        session_id: Option<String>,
        tool_id: Option<String>,
    ) -> Self {
        Operation {
            id: tool_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            data,
            timestamp,
            message_id,
            session_id,
            status: OperationStatus::Active,
            depends_on: HashSet::new(),
            dependents: HashSet::new(),
            error: None,
        }
    }

    /// Kind tag of the payload
    pub fn kind(&self) -> OperationKind {
        self.data.kind()
    }

    /// Whether the mutation is currently applied to the workspace
    pub fn is_active(&self) -> bool {
        self.status == OperationStatus::Active
    }

    /// Whether the mutation has been undone
    pub fn is_undone(&self) -> bool {
        self.status == OperationStatus::Undone
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match &self.data {
            OperationData::BashCommand { command } => command.clone(),
            OperationData::FileRename { old_path, new_path } => {
                format!("{} -> {}", old_path.display(), new_path.display())
            }
            other => other
                .paths()
                .first()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        };
        write!(
            f,
            "[{}] {} - {} ({})",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.kind(),
            target,
            self.status
        )
    }
}
