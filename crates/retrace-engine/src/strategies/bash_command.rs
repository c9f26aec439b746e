//! Shell commands are recorded but never reversed automatically
//!
//! A command's side effects are opaque: it may have touched the network,
//! spawned processes, or written anywhere on disk. Both directions report a
//! graceful failure pointing the user at manual intervention.

use async_trait::async_trait;
use retrace_ops::{Operation, OperationData};

use crate::preview::Preview;
use crate::strategies::{wrong_payload, OperationContext, ReversalResult, ReversalStrategy};

/// Always fails with a manual-intervention message; shell side effects are
/// not tracked
pub struct BashCommandStrategy;

fn irreversible(command: &str, direction: &str) -> ReversalResult {
    ReversalResult::failure(format!(
        "Shell commands cannot be {} automatically; manual intervention required to revert `{}`",
        direction, command
    ))
}

#[async_trait]
impl ReversalStrategy for BashCommandStrategy {
    async fn preview_undo(&self, op: &Operation) -> Preview {
        let OperationData::BashCommand { command } = &op.data else {
            return Preview::info("Unexpected payload for a shell command");
        };
        Preview::info(format!("`{}` cannot be undone automatically", command))
            .warn("Shell command side effects are not tracked; revert them manually")
    }

    async fn preview_redo(&self, op: &Operation) -> Preview {
        let OperationData::BashCommand { command } = &op.data else {
            return Preview::info("Unexpected payload for a shell command");
        };
        Preview::info(format!("`{}` cannot be redone automatically", command))
            .warn("Shell command side effects are not tracked; rerun it manually if needed")
    }

    async fn undo(&self, op: &Operation, _ctx: &OperationContext) -> ReversalResult {
        let OperationData::BashCommand { command } = &op.data else {
            return wrong_payload("BashCommand");
        };
        irreversible(command, "undone")
    }

    async fn redo(&self, op: &Operation, _ctx: &OperationContext) -> ReversalResult {
        let OperationData::BashCommand { command } = &op.data else {
            return wrong_payload("BashCommand");
        };
        irreversible(command, "redone")
    }
}
