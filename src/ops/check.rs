use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexSet;
use serde::Serialize;

use crate::model::task::Task;

use super::relations::{RelationMap, build_relation_map};

/// Structured result from `tt check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A structural error: the forest is not well formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// More than one task shares an ID
    #[serde(rename = "duplicate_id")]
    DuplicateId { task_id: String, count: usize },
    /// `parentId` names a task that doesn't exist
    #[serde(rename = "dangling_parent")]
    DanglingParent { task_id: String, parent_id: String },
    /// Following `parentId` from this task leads back to it
    #[serde(rename = "parent_cycle")]
    ParentCycle { task_id: String },
    /// Parent lives in a different project
    #[serde(rename = "cross_project_parent")]
    CrossProjectParent {
        task_id: String,
        project_id: String,
        parent_project_id: String,
    },
}

/// A validation warning (repairable or cosmetic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    /// Stored level disagrees with the parent chain
    #[serde(rename = "level_mismatch")]
    LevelMismatch {
        task_id: String,
        level: usize,
        expected: usize,
    },
    /// `completed` and `completionDate` disagree
    #[serde(rename = "completion_date_mismatch")]
    CompletionDateMismatch { task_id: String, completed: bool },
}

// ---------------------------------------------------------------------------
// Main check entry point
// ---------------------------------------------------------------------------

/// Validate a task collection. Read-only.
pub fn check_tasks(tasks: &[Task]) -> CheckResult {
    let mut result = CheckResult::default();
    let relations = build_relation_map(tasks);

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for task in tasks {
        *counts.entry(task.id.as_str()).or_default() += 1;
    }
    let mut reported: HashSet<&str> = HashSet::new();
    for task in tasks {
        let count = counts[task.id.as_str()];
        if count > 1 && reported.insert(task.id.as_str()) {
            result.errors.push(CheckError::DuplicateId {
                task_id: task.id.clone(),
                count,
            });
        }
    }

    let by_id: HashMap<&str, &Task> = tasks.iter().rev().map(|t| (t.id.as_str(), t)).collect();
    for task in tasks {
        let Some(parent_id) = task.parent_id.as_deref() else {
            continue;
        };
        match by_id.get(parent_id) {
            None => result.errors.push(CheckError::DanglingParent {
                task_id: task.id.clone(),
                parent_id: parent_id.to_string(),
            }),
            Some(parent) if parent.project_id != task.project_id => {
                result.errors.push(CheckError::CrossProjectParent {
                    task_id: task.id.clone(),
                    project_id: task.project_id.clone(),
                    parent_project_id: parent.project_id.clone(),
                })
            }
            Some(_) => {}
        }
        if relations.is_in_cycle(&task.id) {
            result.errors.push(CheckError::ParentCycle {
                task_id: task.id.clone(),
            });
        }
    }

    let expected = expected_levels(tasks, &relations);
    for task in tasks {
        if let Some(&level) = expected.get(task.id.as_str())
            && level != task.level
        {
            result.warnings.push(CheckWarning::LevelMismatch {
                task_id: task.id.clone(),
                level: task.level,
                expected: level,
            });
        }
        if task.completed != task.completion_date.is_some() {
            result.warnings.push(CheckWarning::CompletionDateMismatch {
                task_id: task.id.clone(),
                completed: task.completed,
            });
        }
    }

    result.valid = result.errors.is_empty();
    result
}

// ---------------------------------------------------------------------------
// Level repair
// ---------------------------------------------------------------------------

/// Levels implied by the parent chain for every task reachable from a root.
fn expected_levels<'a>(tasks: &'a [Task], relations: &RelationMap) -> HashMap<&'a str, usize> {
    let known: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let mut levels: HashMap<&str, usize> = HashMap::with_capacity(tasks.len());
    let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
    for task in tasks.iter().filter(|t| t.is_root()) {
        queue.push_back((task.id.as_str(), 0));
    }
    while let Some((id, level)) = queue.pop_front() {
        if levels.contains_key(id) {
            continue;
        }
        levels.insert(id, level);
        for child in relations.children_of(Some(id)) {
            if let Some(&child) = known.get(child.as_str()) {
                queue.push_back((child, level + 1));
            }
        }
    }
    levels
}

/// Recompute every `level` from the parent chain. Tasks that can't reach a
/// root (dangling parent, cycle) become level 0. Returns the IDs whose level
/// changed.
pub fn normalize_levels(tasks: &mut [Task], relations: &RelationMap) -> IndexSet<String> {
    let expected: HashMap<String, usize> = expected_levels(tasks, relations)
        .into_iter()
        .map(|(id, level)| (id.to_string(), level))
        .collect();
    let mut changed = IndexSet::new();
    for task in tasks.iter_mut() {
        let level = expected.get(&task.id).copied().unwrap_or(0);
        if task.level != level {
            task.level = level;
            changed.insert(task.id.clone());
        }
    }
    if !changed.is_empty() {
        tracing::info!(count = changed.len(), "normalized task levels");
    }
    changed
}
