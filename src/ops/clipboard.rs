use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::task::{Task, find_task};

use super::relations::RelationMap;

/// Error type for paste operations. A rejected paste creates nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasteError {
    #[error("nothing to paste: clipboard is empty")]
    EmptyBuffer,
    #[error("no target project selected")]
    NoProject,
    #[error("paste target not found: {0}")]
    TargetNotFound(String),
    #[error("paste target {parent} belongs to project {parent_project}, not {project}")]
    ProjectMismatch {
        parent: String,
        parent_project: String,
        project: String,
    },
    #[error("clipboard contains tasks unreachable from any root: {}", .0.join(", "))]
    Unreachable(Vec<String>),
}

/// Tasks captured at copy time, decoupled from the live collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardBuffer {
    tasks: Vec<Task>,
}

impl ClipboardBuffer {
    pub fn new(tasks: Vec<Task>) -> Self {
        ClipboardBuffer { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks whose parent is absent from the buffer
    pub fn roots(&self) -> Vec<&Task> {
        let ids: HashSet<&str> = self.tasks.iter().map(|t| t.id.as_str()).collect();
        self.tasks
            .iter()
            .filter(|t| t.parent_id.as_deref().is_none_or(|p| !ids.contains(p)))
            .collect()
    }
}

/// Where a paste lands. The level of pasted roots is taken from the live
/// parent at paste time, never from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteTarget {
    pub parent_id: Option<String>,
    pub project_id: String,
}

impl PasteTarget {
    /// Top level of a project
    pub fn root(project_id: impl Into<String>) -> Self {
        PasteTarget {
            parent_id: None,
            project_id: project_id.into(),
        }
    }

    /// Directly below `parent`
    pub fn into_task(parent: &Task) -> Self {
        PasteTarget {
            parent_id: Some(parent.id.clone()),
            project_id: parent.project_id.clone(),
        }
    }

    /// Next to `sibling`, under the same parent
    pub fn beside(sibling: &Task) -> Self {
        PasteTarget {
            parent_id: sibling.parent_id.clone(),
            project_id: sibling.project_id.clone(),
        }
    }
}

/// Options that shape pasted tasks.
#[derive(Debug, Clone)]
pub struct PasteOptions<'a> {
    /// Appended to the name when exactly one root is pasted
    pub copy_suffix: &'a str,
    /// Prefix for freshly generated IDs
    pub id_prefix: &'a str,
}

impl Default for PasteOptions<'_> {
    fn default() -> Self {
        PasteOptions {
            copy_suffix: " (copy)",
            id_prefix: "t",
        }
    }
}

/// Generate a fresh task ID.
pub fn new_task_id(prefix: &str) -> String {
    format!("{}{}", prefix, uuid::Uuid::new_v4().simple())
}

// ---------------------------------------------------------------------------
// Copy
// ---------------------------------------------------------------------------

/// Capture the listed tasks and all of their descendants.
///
/// Drafts are skipped (and so are their subtrees). Each task is captured once,
/// in request order with descendants depth-first after their root.
pub fn capture<S: AsRef<str>>(tasks: &[Task], relations: &RelationMap, ids: &[S]) -> ClipboardBuffer {
    let mut seen: HashSet<String> = HashSet::new();
    let mut captured = Vec::new();

    for id in ids {
        let Some(root) = find_task(tasks, id.as_ref()) else {
            continue;
        };
        if root.draft || seen.contains(&root.id) {
            continue;
        }
        let mut stack = vec![root.id.clone()];
        while let Some(current) = stack.pop() {
            let Some(task) = find_task(tasks, &current) else {
                continue;
            };
            if task.draft || !seen.insert(current.clone()) {
                continue;
            }
            captured.push(task.clone());
            stack.extend(relations.children_of(Some(current.as_str())).iter().rev().cloned());
        }
    }

    tracing::debug!(requested = ids.len(), captured = captured.len(), "captured tasks");
    ClipboardBuffer::new(captured)
}

// ---------------------------------------------------------------------------
// Paste
// ---------------------------------------------------------------------------

/// Clone the buffer into `target` with fresh IDs, remapped parents and
/// adjusted levels. All pasted tasks are incomplete and belong to
/// `target.project_id`.
///
/// Pasted roots sit one level below the live target parent (or at level 0),
/// whatever level the caller's anchor had cached.
///
/// Nothing is produced unless the whole paste is valid; the caller appends the
/// returned tasks to its collection.
pub fn paste(
    buffer: &ClipboardBuffer,
    target: &PasteTarget,
    live: &[Task],
    options: &PasteOptions<'_>,
) -> Result<Vec<Task>, PasteError> {
    let root_level = resolve_root_level(buffer, target, live)?;

    let in_buffer: HashSet<&str> = buffer.tasks.iter().map(|t| t.id.as_str()).collect();
    let roots = buffer.roots();

    let mut children: HashMap<&str, Vec<&Task>> = HashMap::new();
    for task in &buffer.tasks {
        if let Some(parent) = task.parent_id.as_deref()
            && in_buffer.contains(parent)
        {
            children.entry(parent).or_default().push(task);
        }
    }

    let taken: HashSet<&str> = live
        .iter()
        .map(|t| t.id.as_str())
        .chain(in_buffer.iter().copied())
        .collect();
    let fresh_id = || loop {
        let id = new_task_id(options.id_prefix);
        if !taken.contains(id.as_str()) {
            break id;
        }
    };

    let single_root = roots.len() == 1;
    let mut new_ids: HashMap<&str, (String, usize)> = HashMap::with_capacity(buffer.len());
    let mut pasted: Vec<Task> = Vec::with_capacity(buffer.len());
    let mut queue: VecDeque<&Task> = VecDeque::new();

    for source in roots {
        let mut task = fresh_copy(source, fresh_id(), target.parent_id.clone(), root_level, target);
        if single_root {
            task.name.push_str(options.copy_suffix);
        }
        new_ids.insert(source.id.as_str(), (task.id.clone(), root_level));
        pasted.push(task);
        queue.push_back(source);
    }

    // Breadth-first so every parent is remapped before its children
    while let Some(parent) = queue.pop_front() {
        let (parent_new_id, parent_level) = new_ids[parent.id.as_str()].clone();
        for &source in children.get(parent.id.as_str()).map_or(&[][..], |v| v.as_slice()) {
            if new_ids.contains_key(source.id.as_str()) {
                continue;
            }
            let task = fresh_copy(
                source,
                fresh_id(),
                Some(parent_new_id.clone()),
                parent_level + 1,
                target,
            );
            new_ids.insert(source.id.as_str(), (task.id.clone(), parent_level + 1));
            pasted.push(task);
            queue.push_back(source);
        }
    }

    if pasted.len() != buffer.len() {
        let unreachable: Vec<String> = buffer
            .tasks
            .iter()
            .filter(|t| !new_ids.contains_key(t.id.as_str()))
            .map(|t| t.id.clone())
            .collect();
        tracing::warn!(ids = ?unreachable, "paste rejected: clipboard has a parent cycle");
        return Err(PasteError::Unreachable(unreachable));
    }

    tracing::info!(
        count = pasted.len(),
        parent = ?target.parent_id,
        project = %target.project_id,
        "pasted tasks"
    );
    Ok(pasted)
}

/// Check the target and return the level pasted roots get: 0 at the top
/// level, otherwise one below the live parent.
fn resolve_root_level(
    buffer: &ClipboardBuffer,
    target: &PasteTarget,
    live: &[Task],
) -> Result<usize, PasteError> {
    if buffer.is_empty() {
        return Err(PasteError::EmptyBuffer);
    }
    if target.project_id.is_empty() {
        return Err(PasteError::NoProject);
    }
    let Some(parent_id) = &target.parent_id else {
        return Ok(0);
    };
    let parent = find_task(live, parent_id)
        .filter(|p| !p.draft)
        .ok_or_else(|| PasteError::TargetNotFound(parent_id.clone()))?;
    if parent.project_id != target.project_id {
        return Err(PasteError::ProjectMismatch {
            parent: parent.id.clone(),
            parent_project: parent.project_id.clone(),
            project: target.project_id.clone(),
        });
    }
    Ok(parent.level + 1)
}

fn fresh_copy(
    source: &Task,
    id: String,
    parent_id: Option<String>,
    level: usize,
    target: &PasteTarget,
) -> Task {
    Task {
        id,
        parent_id,
        level,
        project_id: target.project_id.clone(),
        completed: false,
        completion_date: None,
        draft: false,
        ..source.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::relations::build_relation_map;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn task(id: &str, parent: Option<&str>, level: usize) -> Task {
        let mut t = Task::new(id, "p1", format!("Task {}", id));
        t.parent_id = parent.map(|p| p.to_string());
        t.level = level;
        t
    }

    fn live() -> Vec<Task> {
        let mut done = task("c1", Some("r"), 1);
        done.set_completed(true, Utc::now());
        vec![
            task("r", None, 0),
            done,
            task("c2", Some("r"), 1),
            task("other", None, 0),
            task("deep", Some("other"), 1),
        ]
    }

    fn by_id<'a>(tasks: &'a [Task], source_name: &str) -> &'a Task {
        tasks
            .iter()
            .find(|t| t.name.starts_with(source_name))
            .unwrap()
    }

    #[test]
    fn capture_includes_descendants_once() {
        let tasks = live();
        let map = build_relation_map(&tasks);
        let buffer = capture(&tasks, &map, &["c2", "r", "missing"]);
        let ids: Vec<&str> = buffer.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["c2", "r", "c1"]);
    }

    #[test]
    fn capture_skips_drafts() {
        let mut tasks = live();
        let mut draft = task("d", Some("r"), 1);
        draft.draft = true;
        tasks.push(draft);
        let map = build_relation_map(&tasks);
        let buffer = capture(&tasks, &map, &["r", "d"]);
        assert!(buffer.tasks().iter().all(|t| t.id != "d"));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn paste_subtree_gets_fresh_ids_levels_and_incomplete_state() {
        let tasks = live();
        let map = build_relation_map(&tasks);
        let buffer = capture(&tasks, &map, &["r"]);
        let target = PasteTarget::into_task(&tasks[4]);
        let pasted = paste(&buffer, &target, &tasks, &PasteOptions::default()).unwrap();

        assert_eq!(pasted.len(), 3);
        let originals: HashSet<&str> = buffer.tasks().iter().map(|t| t.id.as_str()).collect();
        assert!(pasted.iter().all(|t| !originals.contains(t.id.as_str())));
        assert!(pasted.iter().all(|t| !t.completed && t.completion_date.is_none()));

        let root = by_id(&pasted, "Task r");
        assert_eq!(root.name, "Task r (copy)");
        assert_eq!(root.parent_id.as_deref(), Some("deep"));
        assert_eq!(root.level, 2);
        for child in pasted.iter().filter(|t| t.id != root.id) {
            assert_eq!(child.parent_id.as_deref(), Some(root.id.as_str()));
            assert_eq!(child.level, 3);
        }
    }

    #[test]
    fn paste_partial_subtree_reparents_buffer_root() {
        let tasks = live();
        let map = build_relation_map(&tasks);
        let buffer = capture(&tasks, &map, &["c2"]);
        let pasted = paste(&buffer, &PasteTarget::root("p2"), &tasks, &PasteOptions::default()).unwrap();
        assert_eq!(pasted.len(), 1);
        assert_eq!(pasted[0].parent_id, None);
        assert_eq!(pasted[0].level, 0);
        assert_eq!(pasted[0].project_id, "p2");
    }

    #[test]
    fn multiple_roots_are_not_renamed() {
        let tasks = live();
        let map = build_relation_map(&tasks);
        let buffer = capture(&tasks, &map, &["c2", "other"]);
        let pasted = paste(&buffer, &PasteTarget::root("p1"), &tasks, &PasteOptions::default()).unwrap();
        assert_eq!(pasted.len(), 3);
        assert!(pasted.iter().all(|t| !t.name.ends_with("(copy)")));
        let deep = by_id(&pasted, "Task deep");
        let other = by_id(&pasted, "Task other");
        assert_eq!(deep.parent_id.as_deref(), Some(other.id.as_str()));
        assert_eq!(deep.level, 1);
    }

    #[test]
    fn custom_suffix_and_prefix() {
        let tasks = live();
        let map = build_relation_map(&tasks);
        let buffer = capture(&tasks, &map, &["other"]);
        let options = PasteOptions {
            copy_suffix: " [dup]",
            id_prefix: "x-",
        };
        let pasted = paste(&buffer, &PasteTarget::root("p1"), &tasks, &options).unwrap();
        assert_eq!(by_id(&pasted, "Task other").name, "Task other [dup]");
        assert!(pasted.iter().all(|t| t.id.starts_with("x-")));
    }

    #[test]
    fn rejects_invalid_targets_before_creating_anything() {
        let tasks = live();
        let map = build_relation_map(&tasks);
        let buffer = capture(&tasks, &map, &["r"]);
        let opts = PasteOptions::default();

        let empty = ClipboardBuffer::default();
        assert_eq!(
            paste(&empty, &PasteTarget::root("p1"), &tasks, &opts),
            Err(PasteError::EmptyBuffer)
        );
        assert_eq!(
            paste(&buffer, &PasteTarget::root(""), &tasks, &opts),
            Err(PasteError::NoProject)
        );

        let missing = PasteTarget {
            parent_id: Some("ghost".into()),
            project_id: "p1".into(),
        };
        assert_eq!(
            paste(&buffer, &missing, &tasks, &opts),
            Err(PasteError::TargetNotFound("ghost".into()))
        );

        let cross = PasteTarget {
            parent_id: Some("r".into()),
            project_id: "p2".into(),
        };
        assert!(matches!(
            paste(&buffer, &cross, &tasks, &opts),
            Err(PasteError::ProjectMismatch { .. })
        ));
    }

    #[test]
    fn paste_beside_stale_sibling_uses_parent_level() {
        let mut tasks = live();
        // c2 claims level 5 although its parent r sits at 0
        tasks[2].level = 5;
        let map = build_relation_map(&tasks);
        let buffer = capture(&tasks, &map, &["other"]);

        let target = PasteTarget::beside(&tasks[2]);
        let pasted = paste(&buffer, &target, &tasks, &PasteOptions::default()).unwrap();
        let root = by_id(&pasted, "Task other");
        assert_eq!(root.parent_id.as_deref(), Some("r"));
        assert_eq!(root.level, 1);
        assert_eq!(by_id(&pasted, "Task deep").level, 2);
    }

    #[test]
    fn rejects_cyclic_buffer() {
        let buffer = ClipboardBuffer::new(vec![
            task("root", None, 0),
            task("a", Some("b"), 1),
            task("b", Some("a"), 1),
        ]);
        let result = paste(&buffer, &PasteTarget::root("p1"), &[], &PasteOptions::default());
        assert_eq!(
            result,
            Err(PasteError::Unreachable(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn buffer_roots_ignore_parents_outside_buffer() {
        let buffer = ClipboardBuffer::new(vec![task("c1", Some("r"), 1), task("x", Some("c1"), 2)]);
        let roots: Vec<&str> = buffer.roots().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(roots, ["c1"]);
    }
}
