//! Cascading undo/redo over the operation journal
//!
//! The orchestrator owns the journal behind an async mutex and holds the lock
//! for the full duration of a cascade, so concurrent callers queue and every
//! cascade runs against a stable graph. Steps execute sequentially; the first
//! failing step stops the cascade and the failure is recorded on the failing
//! operation, while everything already reversed keeps its new status.

use std::fmt;
use std::sync::Arc;

use retrace_ops::{CascadeDirection, Operation, OperationJournal};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::preview::Preview;
use crate::strategies::{strategy_for, OperationContext};

/// What a cascade did, phrased for the caller
#[derive(Debug, Clone)]
pub struct CascadeOutcome {
    /// Whether every planned step succeeded
    pub success: bool,
    /// Steps the cascade planned to execute (closure plus the target)
    pub planned: usize,
    /// Steps that completed successfully
    pub succeeded: usize,
    /// Steps that failed (0 or 1; the cascade stops at the first failure)
    pub failed: usize,
    /// Ids whose status changed, in execution order
    pub touched: Vec<String>,
    /// Human-readable summary
    pub message: String,
}

impl CascadeOutcome {
    fn refusal(message: impl Into<String>) -> Self {
        CascadeOutcome {
            success: false,
            planned: 0,
            succeeded: 0,
            failed: 0,
            touched: Vec::new(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CascadeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Executes undo/redo cascades and read-only previews
pub struct CascadeOrchestrator {
    journal: Arc<Mutex<OperationJournal>>,
    context: OperationContext,
}

impl CascadeOrchestrator {
    /// Wires the orchestrator to a shared journal and a backup context
    pub fn new(journal: Arc<Mutex<OperationJournal>>, context: OperationContext) -> Self {
        CascadeOrchestrator { journal, context }
    }

    /// The shared journal handle
    pub fn journal(&self) -> Arc<Mutex<OperationJournal>> {
        Arc::clone(&self.journal)
    }

    /// Undoes `id` together with its active dependents, newest first
    pub async fn undo(&self, id: &str) -> CascadeOutcome {
        self.cascade(id, CascadeDirection::Undo).await
    }

    /// Redoes `id` together with its undone dependencies, oldest first
    pub async fn redo(&self, id: &str) -> CascadeOutcome {
        self.cascade(id, CascadeDirection::Redo).await
    }

    /// What undoing `id` would do, without touching the workspace
    pub async fn preview_undo(&self, id: &str) -> Preview {
        self.preview(id, CascadeDirection::Undo).await
    }

    /// What redoing `id` would do, without touching the workspace
    pub async fn preview_redo(&self, id: &str) -> Preview {
        self.preview(id, CascadeDirection::Redo).await
    }

    async fn cascade(&self, id: &str, direction: CascadeDirection) -> CascadeOutcome {
        let mut journal = self.journal.lock().await;

        let Some(target) = journal.get(id).cloned() else {
            return CascadeOutcome::refusal(format!("Operation {} not found", id));
        };
        // Refusals happen before any step runs, so nothing changes status.
        // Position, not the failure flag, decides: an operation whose undo
        // failed is still applied and must never be redone on top of itself.
        match direction {
            CascadeDirection::Undo if target.status.is_reverted() => {
                return CascadeOutcome::refusal(format!(
                    "Operation {} is already undone",
                    id
                ));
            }
            CascadeDirection::Redo if target.status.is_applied() => {
                return CascadeOutcome::refusal(format!(
                    "Operation {} is still applied and cannot be redone",
                    id
                ));
            }
            _ => {}
        }

        let mut plan = match journal.cascade_closure(id, direction) {
            Ok(closure) => closure,
            Err(e) => return CascadeOutcome::refusal(e.to_string()),
        };
        // The target always runs last: its dependents come down before it for
        // undo, its dependencies come back before it for redo.
        plan.push(target);

        let verb = match direction {
            CascadeDirection::Undo => "undone",
            CascadeDirection::Redo => "redone",
        };
        debug!("Cascade of {} step(s) to get {} {}", plan.len(), id, verb);

        let planned = plan.len();
        let mut touched = Vec::new();
        let mut failure: Option<String> = None;

        for op in &plan {
            let result = self.execute_step(op, direction).await;
            if result.success {
                let marked = match direction {
                    CascadeDirection::Undo => journal.mark_undone(&op.id),
                    CascadeDirection::Redo => journal.mark_redone(&op.id),
                };
                if let Err(e) = marked {
                    // The filesystem step succeeded but the journal refused
                    // the transition; surface it as a cascade failure.
                    warn!("Transition for {} refused: {}", op.id, e);
                    failure = Some(e.to_string());
                    break;
                }
                touched.push(op.id.clone());
            } else {
                warn!("Step for {} failed: {}", op.id, result.message);
                if let Err(e) = journal.mark_failed(&op.id, result.message.clone()) {
                    warn!("Could not record failure on {}: {}", op.id, e);
                }
                failure = Some(result.message);
                break;
            }
        }

        let succeeded = touched.len();
        match failure {
            Some(message) => CascadeOutcome {
                success: false,
                planned,
                succeeded,
                failed: 1,
                touched,
                message: format!("{} {}, 1 failed: {}", succeeded, verb, message),
            },
            None => CascadeOutcome {
                success: true,
                planned,
                succeeded,
                failed: 0,
                touched,
                message: format!("{} operation(s) {}", succeeded, verb),
            },
        }
    }

    async fn execute_step(
        &self,
        op: &Operation,
        direction: CascadeDirection,
    ) -> crate::strategies::ReversalResult {
        let strategy = strategy_for(&op.data);
        match direction {
            CascadeDirection::Undo => strategy.undo(op, &self.context).await,
            CascadeDirection::Redo => strategy.redo(op, &self.context).await,
        }
    }

    async fn preview(&self, id: &str, direction: CascadeDirection) -> Preview {
        let journal = self.journal.lock().await;

        let Some(target) = journal.get(id).cloned() else {
            return Preview::info(format!("Operation {} not found", id));
        };
        let cascade_size = journal
            .cascade_closure(id, direction)
            .map(|closure| closure.len())
            .unwrap_or(0);
        drop(journal);

        let strategy = strategy_for(&target.data);
        let preview = match direction {
            CascadeDirection::Undo => strategy.preview_undo(&target).await,
            CascadeDirection::Redo => strategy.preview_redo(&target).await,
        };
        if cascade_size > 0 {
            let wording = match direction {
                CascadeDirection::Undo => format!(
                    "Undoing this operation will also undo {} dependent operation(s)",
                    cascade_size
                ),
                CascadeDirection::Redo => format!(
                    "Redoing this operation will first redo {} operation(s) it depends on",
                    cascade_size
                ),
            };
            preview.warn(wording)
        } else {
            preview
        }
    }
}
