use chrono::{DateTime, Utc};
use indexmap::IndexSet;

use crate::model::task::{Task, find_task};

use super::relations::RelationMap;

/// A structural operation's output: the new collection plus every ID it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeResult {
    pub tasks: Vec<Task>,
    /// Removed (delete) or updated (completion) IDs, parent before descendants
    pub affected: IndexSet<String>,
}

impl CascadeResult {
    fn unchanged(tasks: &[Task]) -> Self {
        CascadeResult {
            tasks: tasks.to_vec(),
            affected: IndexSet::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.affected.is_empty()
    }
}

/// Union of the subtrees rooted at each of `ids` that exist in `tasks`.
/// Overlapping subtrees collapse to a single entry per task.
pub fn collect_subtrees<S: AsRef<str>>(
    tasks: &[Task],
    relations: &RelationMap,
    ids: &[S],
) -> IndexSet<String> {
    let mut out = IndexSet::new();
    for id in ids {
        let id = id.as_ref();
        if out.contains(id) || find_task(tasks, id).is_none() {
            continue;
        }
        out.extend(relations.subtree(id));
    }
    out
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Remove `id` and all of its descendants.
///
/// An unknown `id` is a no-op, so repeating a delete is harmless.
pub fn delete_subtree(tasks: &[Task], relations: &RelationMap, id: &str) -> CascadeResult {
    delete_subtrees(tasks, relations, &[id])
}

/// Remove every listed task together with its descendants.
pub fn delete_subtrees<S: AsRef<str>>(
    tasks: &[Task],
    relations: &RelationMap,
    ids: &[S],
) -> CascadeResult {
    let affected = collect_subtrees(tasks, relations, ids);
    if affected.is_empty() {
        tracing::debug!("delete skipped: no matching tasks");
        return CascadeResult::unchanged(tasks);
    }
    let remaining: Vec<Task> = tasks
        .iter()
        .filter(|t| !affected.contains(t.id.as_str()))
        .cloned()
        .collect();
    tracing::debug!(removed = affected.len(), "deleted task subtrees");
    CascadeResult {
        tasks: remaining,
        affected,
    }
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Set `completed` on `id` and every descendant, whatever their prior state.
pub fn set_completion_cascading(
    tasks: &[Task],
    relations: &RelationMap,
    id: &str,
    completed: bool,
) -> CascadeResult {
    set_completion_cascading_many(tasks, relations, &[id], completed)
}

/// Batch form of [`set_completion_cascading`].
pub fn set_completion_cascading_many<S: AsRef<str>>(
    tasks: &[Task],
    relations: &RelationMap,
    ids: &[S],
    completed: bool,
) -> CascadeResult {
    set_completion_at(tasks, relations, ids, completed, Utc::now())
}

fn set_completion_at<S: AsRef<str>>(
    tasks: &[Task],
    relations: &RelationMap,
    ids: &[S],
    completed: bool,
    now: DateTime<Utc>,
) -> CascadeResult {
    let affected = collect_subtrees(tasks, relations, ids);
    if affected.is_empty() {
        return CascadeResult::unchanged(tasks);
    }
    let updated = tasks
        .iter()
        .map(|t| {
            let mut t = t.clone();
            if affected.contains(t.id.as_str()) {
                t.set_completed(completed, now);
            }
            t
        })
        .collect();
    tracing::debug!(count = affected.len(), completed, "cascaded completion");
    CascadeResult {
        tasks: updated,
        affected,
    }
}

/// Flip completion on `id` (based on its current value) and cascade it.
pub fn toggle_completion(tasks: &[Task], relations: &RelationMap, id: &str) -> CascadeResult {
    match find_task(tasks, id) {
        Some(task) => set_completion_cascading(tasks, relations, id, !task.completed),
        None => CascadeResult::unchanged(tasks),
    }
}
