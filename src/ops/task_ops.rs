use crate::model::task::{Task, find_task, find_task_mut};

use super::clipboard::new_task_id;
use super::relations::RelationMap;

/// Error type for single-task operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("task {0} is not a draft")]
    NotADraft(String),
    #[error("task {0} is a draft")]
    IsDraft(String),
    #[error("task name cannot be empty")]
    EmptyName,
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("parent {parent} belongs to project {parent_project}, not {project}")]
    ProjectMismatch {
        parent: String,
        parent_project: String,
        project: String,
    },
}

/// Prefix used for draft IDs so they can never collide with stored tasks
pub const DRAFT_PREFIX: &str = "draft_";

/// Where a newly created task goes relative to the selected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Sibling,
    Child,
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// Append an unnamed draft next to or below `anchor`, or at the root of
/// `project_id` when there is no anchor. Returns the draft's ID.
pub fn create_draft(
    tasks: &mut Vec<Task>,
    project_id: &str,
    anchor: Option<&str>,
    placement: Placement,
) -> Result<String, TaskError> {
    let id = new_task_id(DRAFT_PREFIX);
    let mut draft = match anchor {
        None => Task::new(id.clone(), project_id, ""),
        Some(anchor_id) => {
            let anchor = find_task(tasks, anchor_id)
                .filter(|t| !t.draft)
                .ok_or_else(|| TaskError::NotFound(anchor_id.to_string()))?;
            match placement {
                Placement::Child => Task::child_of(id.clone(), anchor, ""),
                Placement::Sibling => {
                    let mut t = Task::new(id.clone(), anchor.project_id.clone(), "");
                    t.parent_id = anchor.parent_id.clone();
                    t.level = anchor.level;
                    t
                }
            }
        }
    };
    draft.draft = true;
    tracing::debug!(id = %id, parent = ?draft.parent_id, "created draft");
    tasks.push(draft);
    Ok(id)
}

/// Turn a draft into a real task with a fresh ID and the given name.
/// Returns the new ID.
pub fn confirm_draft(
    tasks: &mut [Task],
    draft_id: &str,
    name: &str,
    id_prefix: &str,
) -> Result<String, TaskError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TaskError::EmptyName);
    }
    let task = find_task_mut(tasks, draft_id).ok_or_else(|| TaskError::NotFound(draft_id.to_string()))?;
    if !task.draft {
        return Err(TaskError::NotADraft(draft_id.to_string()));
    }
    let id = new_task_id(id_prefix);
    task.id = id.clone();
    task.name = name.to_string();
    task.draft = false;
    tracing::info!(id = %id, "confirmed draft");
    Ok(id)
}

/// Remove a draft. Only drafts can be cancelled; an unknown ID is a no-op.
pub fn cancel_draft(tasks: &mut Vec<Task>, draft_id: &str) -> Result<bool, TaskError> {
    let Some(task) = find_task(tasks, draft_id) else {
        return Ok(false);
    };
    if !task.draft {
        return Err(TaskError::NotADraft(draft_id.to_string()));
    }
    tasks.retain(|t| t.id != draft_id);
    tracing::debug!(id = %draft_id, "cancelled draft");
    Ok(true)
}

/// Drop drafts and unknown IDs from a batch request, keeping request order
pub fn filter_valid_for_batch<S: AsRef<str>>(tasks: &[Task], ids: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        let id = id.as_ref();
        if find_task(tasks, id).is_some_and(|t| !t.draft) && !out.iter().any(|o| o == id) {
            out.push(id.to_string());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Add / collapse
// ---------------------------------------------------------------------------

/// Append a named task at the root of `project_id` or under `parent_id`.
pub fn add_task(
    tasks: &mut Vec<Task>,
    project_id: &str,
    parent_id: Option<&str>,
    name: &str,
    id_prefix: &str,
) -> Result<String, TaskError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TaskError::EmptyName);
    }
    let id = new_task_id(id_prefix);
    let task = match parent_id {
        None => Task::new(id.clone(), project_id, name),
        Some(pid) => {
            let parent = find_task(tasks, pid)
                .filter(|t| !t.draft)
                .ok_or_else(|| TaskError::NotFound(pid.to_string()))?;
            if parent.project_id != project_id {
                return Err(TaskError::ProjectMismatch {
                    parent: parent.id.clone(),
                    parent_project: parent.project_id.clone(),
                    project: project_id.to_string(),
                });
            }
            Task::child_of(id.clone(), parent, name)
        }
    };
    tasks.push(task);
    Ok(id)
}

/// Flip `collapsed` on a task that has children. Returns whether anything
/// changed; a leaf or unknown ID is left alone.
pub fn toggle_collapse(tasks: &mut [Task], relations: &RelationMap, id: &str) -> bool {
    if !relations.has_children(id) {
        return false;
    }
    match find_task_mut(tasks, id) {
        Some(task) => {
            task.collapsed = !task.collapsed;
            true
        }
        None => false,
    }
}
