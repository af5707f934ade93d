use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single node of the task forest.
///
/// Tasks are stored flat; the tree is expressed through `parent_id`
/// back-references and `level` caches the depth for indentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque unique identifier, stable for the task's lifetime
    pub id: String,
    /// Owning task, or `None` for a forest root
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Depth in the forest (0 = root), always `parent.level + 1`
    #[serde(default)]
    pub level: usize,
    /// Partition key; parent and child always share a project
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completion_date: Option<DateTime<Utc>>,
    /// Display only: hides descendants but never changes the canonical order
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub assignee: String,
    /// Unsaved task created from the keyboard; never persisted
    #[serde(skip)]
    pub draft: bool,
}

impl Task {
    /// Create a root task in the given project
    pub fn new(id: impl Into<String>, project_id: impl Into<String>, name: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            parent_id: None,
            level: 0,
            project_id: project_id.into(),
            name: name.into(),
            completed: false,
            completion_date: None,
            collapsed: false,
            notes: String::new(),
            start_date: None,
            due_date: None,
            assignee: String::new(),
            draft: false,
        }
    }

    /// Create a task directly below `parent`, inheriting its project and level
    pub fn child_of(id: impl Into<String>, parent: &Task, name: impl Into<String>) -> Self {
        let mut task = Task::new(id, parent.project_id.clone(), name);
        task.parent_id = Some(parent.id.clone());
        task.level = parent.level + 1;
        task
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Set the completion flag, stamping or clearing the completion date
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.completed = completed;
        self.completion_date = if completed { Some(now) } else { None };
    }
}

/// Find a task by ID in a flat collection.
pub fn find_task<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    tasks.iter().find(|t| t.id == id)
}

/// Find a task by ID in a flat collection (mutable).
pub fn find_task_mut<'a>(tasks: &'a mut [Task], id: &str) -> Option<&'a mut Task> {
    tasks.iter_mut().find(|t| t.id == id)
}
