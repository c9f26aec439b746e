//! Operation journal: tracking, indexes, and the dependency graph

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::RetraceError;
use crate::operation::{Operation, OperationData, OperationStatus};
use crate::persist::{journal_file_name, workspace_id, JournalSnapshot};

/// Bucket key for operations tracked before any session was established
pub(crate) const NO_SESSION_KEY: &str = "__no_session__";

/// Default cap on retained operations
pub const DEFAULT_MAX_OPERATIONS: usize = 1000;

/// Traversal direction for [`OperationJournal::cascade_closure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeDirection {
    /// Collect active dependents that must be undone first, newest first
    Undo,
    /// Collect undone dependencies that must be redone first, oldest first
    Redo,
}

/// Fire-and-forget notifications for live UI updates
///
/// Registered by the caller; the journal never waits on an acknowledgment.
pub trait JournalObserver: Send + Sync {
    /// A new operation was tracked
    fn operation_tracked(&self, _op: &Operation) {}
    /// An existing operation changed status
    fn operation_changed(&self, _op: &Operation) {}
}

/// In-memory registry of all tracked operations and their indexes
///
/// Operations are keyed by their externally supplied tool id (or a minted
/// UUID); dependency edges are always added in pairs through [`link`] so
/// `depends_on` and `dependents` stay mirror images of each other.
///
/// [`link`]: OperationJournal::link
pub struct OperationJournal {
    workspace_root: PathBuf,
    operations: HashMap<String, Operation>,
    insertion_order: VecDeque<String>,
    by_message: HashMap<String, Vec<String>>,
    by_session: HashMap<String, Vec<String>>,
    current_session_id: Option<String>,
    max_operations: usize,
    last_timestamp: DateTime<Utc>,
    observer: Option<Arc<dyn JournalObserver>>,
}

impl OperationJournal {
    /// Creates an empty journal for the given workspace root
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self::with_max_operations(workspace_root, DEFAULT_MAX_OPERATIONS)
    }

    /// Creates an empty journal with a custom retention cap
    pub fn with_max_operations(workspace_root: impl Into<PathBuf>, max_operations: usize) -> Self {
        OperationJournal {
            workspace_root: workspace_root.into(),
            operations: HashMap::new(),
            insertion_order: VecDeque::new(),
            by_message: HashMap::new(),
            by_session: HashMap::new(),
            current_session_id: None,
            max_operations: max_operations.max(1),
            last_timestamp: DateTime::<Utc>::MIN_UTC,
            observer: None,
        }
    }

    /// Registers the observer notified on track and status changes
    pub fn set_observer(&mut self, observer: Arc<dyn JournalObserver>) {
        self.observer = Some(observer);
    }

    /// The workspace this journal belongs to
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Identity tag derived from the workspace root
    pub fn workspace_id(&self) -> String {
        workspace_id(&self.workspace_root)
    }

    /// The active session id, when one has been established
    pub fn session_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    /// Establishes the active session
    ///
    /// Operations tracked before any session existed stay visible through
    /// [`by_session`](Self::by_session) afterwards.
    pub fn set_session(&mut self, session_id: impl Into<String>) {
        self.current_session_id = Some(session_id.into());
    }

    /// Number of retained operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the journal holds no operations
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Drops every operation and index; used when a new session replaces the
    /// journal wholesale
    pub fn clear(&mut self) {
        self.operations.clear();
        self.insertion_order.clear();
        self.by_message.clear();
        self.by_session.clear();
        debug!("Journal cleared");
    }

    /// Records a mutation the agent just performed
    ///
    /// Adopts `tool_id` as the operation id when supplied, stamps a
    /// non-decreasing timestamp, derives dependency edges against the
    /// still-active operations of the current session, indexes the record,
    /// enforces the retention cap, and notifies the observer.
    pub fn track(
        &mut self,
        data: OperationData,
        message_id: Option<String>,
        tool_id: Option<String>,
    ) -> Operation {
        // Tool ids are caller-supplied and may be retried; re-tracking an
        // already known id must not duplicate the record or skew eviction.
        if let Some(existing_id) = tool_id.as_deref() {
            if let Some(existing) = self.operations.get(existing_id) {
                warn!("Operation {} already tracked; ignoring duplicate", existing_id);
                return existing.clone();
            }
        }

        let timestamp = Utc::now().max(self.last_timestamp);
        self.last_timestamp = timestamp;

        let op = Operation::new(
            data,
            timestamp,
            message_id.clone(),
            self.current_session_id.clone(),
            tool_id,
        );
        let id = op.id.clone();

        // Predecessors must be discovered before the new record joins the
        // session scope.
        let predecessors: Vec<String> = self
            .session_scope_ids()
            .into_iter()
            .filter_map(|cand_id| {
                let cand = self.operations.get(&cand_id)?;
                if cand.status.is_applied() && depends_between(&op.data, &cand.data) {
                    Some(cand_id)
                } else {
                    None
                }
            })
            .collect();

        self.operations.insert(id.clone(), op);
        self.insertion_order.push_back(id.clone());
        if let Some(message_id) = message_id {
            self.by_message.entry(message_id).or_default().push(id.clone());
        }
        let bucket = self
            .current_session_id
            .clone()
            .unwrap_or_else(|| NO_SESSION_KEY.to_string());
        self.by_session.entry(bucket).or_default().push(id.clone());

        for pred in predecessors {
            self.link(&id, &pred);
        }

        self.evict();

        // Eviction never removes the record just inserted (cap >= 1).
        let op = self.operations[&id].clone();
        if let Some(observer) = &self.observer {
            observer.operation_tracked(&op);
        }
        debug!("Tracked operation {} ({})", op.id, op.kind());
        op
    }

    /// Looks up an operation by id
    pub fn get(&self, id: &str) -> Option<&Operation> {
        self.operations.get(id)
    }

    /// Operations tracked for one message, timestamp ascending
    pub fn by_message(&self, message_id: &str) -> Vec<Operation> {
        let ids = match self.by_message.get(message_id) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };
        self.sorted_ops(ids.into_iter().collect())
    }

    /// Operations of the current session, timestamp ascending
    ///
    /// Includes the no-session bucket so records tracked before a session was
    /// established remain visible; entries present in both buckets appear
    /// once.
    pub fn by_session(&self) -> Vec<Operation> {
        self.sorted_ops(self.session_scope_ids())
    }

    /// All operations with status `Active`, timestamp ascending
    pub fn active(&self) -> Vec<Operation> {
        self.filter_by_status(OperationStatus::Active)
    }

    /// All operations with status `Undone`, timestamp ascending
    pub fn undone(&self) -> Vec<Operation> {
        self.filter_by_status(OperationStatus::Undone)
    }

    /// All operations whose last reversal attempt failed, timestamp ascending
    pub fn failed(&self) -> Vec<Operation> {
        let ids = self
            .operations
            .values()
            .filter(|op| op.status.is_failed())
            .map(|op| op.id.clone())
            .collect();
        self.sorted_ops(ids)
    }

    /// Marks an operation undone after a successful undo step
    pub fn mark_undone(&mut self, id: &str) -> Result<(), RetraceError> {
        self.transition(id, OperationStatus::Undone, None)
    }

    /// Marks an operation active again after a successful redo step
    pub fn mark_redone(&mut self, id: &str) -> Result<(), RetraceError> {
        self.transition(id, OperationStatus::Active, None)
    }

    /// Records a failed reversal attempt
    ///
    /// The operation keeps its pre-attempt position: a failed undo leaves it
    /// applied, a failed redo leaves it reverted. The failure never blocks a
    /// retry in the direction that failed.
    pub fn mark_failed(
        &mut self,
        id: &str,
        reason: impl Into<String>,
    ) -> Result<(), RetraceError> {
        let current = self
            .operations
            .get(id)
            .ok_or_else(|| RetraceError::operation_not_found(id))?
            .status;
        let to = if current.is_applied() {
            OperationStatus::FailedUndo
        } else {
            OperationStatus::FailedRedo
        };
        self.transition(id, to, Some(reason.into()))
    }

    /// Transitive closure of operations that must accompany an undo or redo
    /// of `id`, excluding `id` itself
    ///
    /// Undo walks `dependents` edges through `Active` operations and orders
    /// the result newest first; redo walks `depends_on` edges through
    /// `Undone` operations and orders oldest first. The ordering is what
    /// keeps every intermediate workspace state consistent with the graph.
    pub fn cascade_closure(
        &self,
        id: &str,
        direction: CascadeDirection,
    ) -> Result<Vec<Operation>, RetraceError> {
        let start = self
            .operations
            .get(id)
            .ok_or_else(|| RetraceError::operation_not_found(id))?;

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(id.to_string());
        let mut result: Vec<&Operation> = Vec::new();
        let mut queue: VecDeque<String> = self.edges_of(start, direction).cloned().collect();

        while let Some(next_id) = queue.pop_front() {
            if !visited.insert(next_id.clone()) {
                continue;
            }
            let Some(op) = self.operations.get(&next_id) else {
                // Edge points at an evicted or missing record; skip it rather
                // than abort the whole traversal.
                warn!("Skipping dangling dependency edge to {}", next_id);
                continue;
            };
            let wanted = match direction {
                CascadeDirection::Undo => OperationStatus::Active,
                CascadeDirection::Redo => OperationStatus::Undone,
            };
            if op.status != wanted {
                continue;
            }
            result.push(op);
            queue.extend(self.edges_of(op, direction).cloned());
        }

        let positions = self.position_index();
        result.sort_by_key(|op| (op.timestamp, positions.get(op.id.as_str()).copied()));
        if direction == CascadeDirection::Undo {
            result.reverse();
        }
        Ok(result.into_iter().cloned().collect())
    }

    /// Serializable snapshot of the full journal state
    pub fn snapshot(&self) -> JournalSnapshot {
        let mut by_message: Vec<(String, Vec<String>)> = self
            .by_message
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        by_message.sort_by(|a, b| a.0.cmp(&b.0));
        let mut by_session: Vec<(String, Vec<String>)> = self
            .by_session
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        by_session.sort_by(|a, b| a.0.cmp(&b.0));

        JournalSnapshot {
            operations: self.operations.clone(),
            operations_by_message: by_message,
            operations_by_session: by_session,
            current_session_id: self.current_session_id.clone(),
            workspace_id: self.workspace_id(),
        }
    }

    /// Persists the journal under `dir`, named deterministically per
    /// workspace
    pub async fn save(&self, dir: &Path) -> Result<PathBuf, RetraceError> {
        tokio::fs::create_dir_all(dir).await?;
        let file = dir.join(journal_file_name(&self.workspace_id()));
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        tokio::fs::write(&file, json).await?;
        debug!("Journal saved to {}", file.display());
        Ok(file)
    }

    /// Restores a journal persisted by [`save`](Self::save)
    ///
    /// Refuses a snapshot whose workspace identity does not match the one
    /// derived from `workspace_root`.
    pub async fn load(
        workspace_root: impl Into<PathBuf>,
        dir: &Path,
        max_operations: usize,
    ) -> Result<Self, RetraceError> {
        let workspace_root = workspace_root.into();
        let expected = workspace_id(&workspace_root);
        let file = dir.join(journal_file_name(&expected));
        let json = tokio::fs::read_to_string(&file).await?;
        let snapshot: JournalSnapshot = serde_json::from_str(&json)?;

        if snapshot.workspace_id != expected {
            return Err(RetraceError::WorkspaceMismatch {
                expected,
                found: snapshot.workspace_id,
            });
        }

        let mut journal = Self::with_max_operations(workspace_root, max_operations);
        let mut ids: Vec<String> = snapshot.operations.keys().cloned().collect();
        // Rebuild insertion order from timestamps; ties keep id order for
        // determinism.
        ids.sort_by(|a, b| {
            let ta = snapshot.operations[a].timestamp;
            let tb = snapshot.operations[b].timestamp;
            ta.cmp(&tb).then_with(|| a.cmp(b))
        });
        journal.last_timestamp = ids
            .last()
            .map(|id| snapshot.operations[id].timestamp)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        journal.insertion_order = ids.into();
        journal.operations = snapshot.operations;
        journal.by_message = snapshot.operations_by_message.into_iter().collect();
        journal.by_session = snapshot.operations_by_session.into_iter().collect();
        journal.current_session_id = snapshot.current_session_id;
        debug!("Journal restored from {}", file.display());
        Ok(journal)
    }

    /// Adds the paired edge "`a` depends on `b`"
    fn link(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        if let Some(op) = self.operations.get_mut(a) {
            op.depends_on.insert(b.to_string());
        }
        if let Some(op) = self.operations.get_mut(b) {
            op.dependents.insert(a.to_string());
        }
    }

    fn edges_of<'a>(
        &self,
        op: &'a Operation,
        direction: CascadeDirection,
    ) -> impl Iterator<Item = &'a String> {
        match direction {
            CascadeDirection::Undo => op.dependents.iter(),
            CascadeDirection::Redo => op.depends_on.iter(),
        }
    }

    fn transition(
        &mut self,
        id: &str,
        to: OperationStatus,
        error: Option<String>,
    ) -> Result<(), RetraceError> {
        let op = self
            .operations
            .get_mut(id)
            .ok_or_else(|| RetraceError::operation_not_found(id))?;

        // Each transition is only legal from the matching position; a failed
        // attempt permits a retry of the same direction, never the opposite.
        let legal = match to {
            OperationStatus::Undone => op.status.is_applied(),
            OperationStatus::Active => op.status.is_reverted(),
            OperationStatus::FailedUndo => op.status.is_applied(),
            OperationStatus::FailedRedo => op.status.is_reverted(),
        };
        if !legal {
            return Err(RetraceError::invalid_transition(
                id,
                format!("cannot move from {} to {}", op.status, to),
            ));
        }

        op.status = to;
        op.error = error;
        let op = op.clone();
        debug!("Operation {} is now {}", op.id, op.status);
        if let Some(observer) = &self.observer {
            observer.operation_changed(&op);
        }
        Ok(())
    }

    /// Ids in scope for the current session: the active bucket plus anything
    /// tracked before a session existed
    fn session_scope_ids(&self) -> HashSet<String> {
        let mut ids: HashSet<String> = HashSet::new();
        let current_bucket = self
            .current_session_id
            .as_deref()
            .unwrap_or(NO_SESSION_KEY);
        for bucket in [current_bucket, NO_SESSION_KEY] {
            if let Some(bucket_ids) = self.by_session.get(bucket) {
                ids.extend(bucket_ids.iter().cloned());
            }
        }
        ids
    }

    fn filter_by_status(&self, status: OperationStatus) -> Vec<Operation> {
        let ids = self
            .operations
            .values()
            .filter(|op| op.status == status)
            .map(|op| op.id.clone())
            .collect();
        self.sorted_ops(ids)
    }

    fn sorted_ops(&self, ids: HashSet<String>) -> Vec<Operation> {
        let positions = self.position_index();
        let mut ops: Vec<&Operation> = ids
            .iter()
            .filter_map(|id| self.operations.get(id))
            .collect();
        ops.sort_by_key(|op| (op.timestamp, positions.get(op.id.as_str()).copied()));
        ops.into_iter().cloned().collect()
    }

    fn position_index(&self) -> HashMap<&str, usize> {
        self.insertion_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect()
    }

    /// Removes the globally oldest operations beyond the retention cap,
    /// pruning every secondary index and surviving edge sets
    fn evict(&mut self) {
        while self.insertion_order.len() > self.max_operations {
            let Some(evicted_id) = self.insertion_order.pop_front() else {
                break;
            };
            let Some(evicted) = self.operations.remove(&evicted_id) else {
                continue;
            };

            for ids in self.by_message.values_mut() {
                ids.retain(|id| *id != evicted_id);
            }
            self.by_message.retain(|_, ids| !ids.is_empty());
            for ids in self.by_session.values_mut() {
                ids.retain(|id| *id != evicted_id);
            }
            self.by_session.retain(|_, ids| !ids.is_empty());

            for neighbor in evicted.depends_on.iter().chain(evicted.dependents.iter()) {
                if let Some(op) = self.operations.get_mut(neighbor) {
                    op.depends_on.remove(&evicted_id);
                    op.dependents.remove(&evicted_id);
                }
            }
            debug!("Evicted operation {} ({})", evicted.id, evicted.kind());
        }
    }
}

/// Whether a newly tracked operation depends on an earlier one
///
/// Three rules, per the journal's causal model:
/// 1. two operations touching the same path are ordered;
/// 2. a file operation inside a directory depends on that directory's
///    creation;
/// 3. deleting a directory depends on every earlier file operation inside it.
fn depends_between(new: &OperationData, old: &OperationData) -> bool {
    let new_paths = new.paths();
    let old_paths = old.paths();

    if new_paths
        .iter()
        .any(|np| old_paths.iter().any(|op| np == op))
    {
        return true;
    }

    if let OperationData::DirectoryCreate { path: dir } = old {
        if new.is_file_operation() && new_paths.iter().any(|p| strictly_inside(p, dir)) {
            return true;
        }
    }

    if let OperationData::DirectoryDelete { path: dir } = new {
        if old.is_file_operation() && old_paths.iter().any(|p| strictly_inside(p, dir)) {
            return true;
        }
    }

    false
}

fn strictly_inside(path: &Path, dir: &Path) -> bool {
    path != dir && path.starts_with(dir)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn file_name_strategy() -> impl Strategy<Value = String> {
        r"[a-z]{1,8}\.txt".prop_map(|s| s.to_string())
    }

    proptest! {
        /// Edges are always added in pairs: if A depends on B then B lists A
        /// as a dependent, and vice versa.
        #[test]
        fn prop_edge_symmetry(paths in prop::collection::vec(file_name_strategy(), 1..30)) {
            let mut j = OperationJournal::new("/workspace");
            for path in &paths {
                j.track(
                    OperationData::FileCreate {
                        path: PathBuf::from(path),
                        content: None,
                    },
                    None,
                    None,
                );
            }

            let ops = j.by_session();
            for op in &ops {
                for dep in &op.depends_on {
                    let other = j.get(dep).expect("edge target must exist");
                    prop_assert!(other.dependents.contains(&op.id));
                }
                for dep in &op.dependents {
                    let other = j.get(dep).expect("edge target must exist");
                    prop_assert!(other.depends_on.contains(&op.id));
                }
            }
        }

        /// Eviction keeps the journal at the cap and never leaves a secondary
        /// index or edge referencing an evicted id.
        #[test]
        fn prop_eviction_preserves_indexes(
            paths in prop::collection::vec(file_name_strategy(), 10..40),
            cap in 2usize..8,
        ) {
            let mut j = OperationJournal::with_max_operations("/workspace", cap);
            for (i, path) in paths.iter().enumerate() {
                j.track(
                    OperationData::FileCreate {
                        path: PathBuf::from(path),
                        content: None,
                    },
                    Some(format!("msg-{}", i % 3)),
                    None,
                );
            }

            prop_assert!(j.len() <= cap);
            let live: std::collections::HashSet<String> =
                j.by_session().iter().map(|op| op.id.clone()).collect();
            prop_assert_eq!(live.len(), j.len());
            for op in j.by_session() {
                for edge in op.depends_on.iter().chain(op.dependents.iter()) {
                    prop_assert!(live.contains(edge));
                }
            }
            for i in 0..3 {
                for op in j.by_message(&format!("msg-{}", i)) {
                    prop_assert!(live.contains(&op.id));
                }
            }
        }
    }
}
