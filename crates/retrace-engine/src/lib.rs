#![warn(missing_docs)]

//! Reversible execution engine for retrace
//!
//! Consumes the operation journal from `retrace-ops` and provides the pieces
//! that actually touch the workspace: one reversal strategy per operation
//! kind, a cascade orchestrator that undoes/redoes an operation together with
//! its transitive dependents/dependencies, and a preview generator that shows
//! what a reversal would do without mutating anything.

pub mod orchestrator;
pub mod preview;
pub mod strategies;

// Re-export public API
pub use orchestrator::{CascadeOrchestrator, CascadeOutcome};
pub use preview::{DiffHunk, DiffLine, Preview, PreviewKind};
pub use strategies::{strategy_for, OperationContext, ReversalResult, ReversalStrategy};
