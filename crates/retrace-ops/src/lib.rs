#![warn(missing_docs)]

//! Operation tracking for retrace
//!
//! Records every workspace mutation performed by the coding agent as an
//! [`Operation`], links operations into a dependency graph, and persists the
//! resulting journal per workspace. The reversal strategies and cascade
//! orchestration that consume this journal live in `retrace-engine`.

pub mod backup;
pub mod error;
pub mod journal;
pub mod operation;
pub mod persist;

// Re-export public API
pub use backup::BackupStore;
pub use error::RetraceError;
pub use journal::{CascadeDirection, JournalObserver, OperationJournal};
pub use operation::{EditSpec, Operation, OperationData, OperationKind, OperationStatus};
pub use persist::{journal_file_name, workspace_id, JournalSnapshot};
