use std::collections::HashMap;

use crate::model::task::Task;

use super::relations::RelationMap;

/// Depth-first display order of a task collection.
#[derive(Debug, Clone)]
pub struct Linearized<'a> {
    /// Every input task exactly once: the forest walk first, then orphans
    pub order: Vec<&'a Task>,
    /// IDs that could not be reached from any root, in input order
    pub orphans: Vec<&'a str>,
}

impl<'a> Linearized<'a> {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_orphan(&self, id: &str) -> bool {
        self.orphans.contains(&id)
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.order.iter().map(|t| t.id.as_str()).collect()
    }
}

/// Produce the canonical display order: pre-order from every root (input
/// order), each task immediately followed by its children.
///
/// Tasks whose parent chain never reaches a root (dangling parent, parent
/// cycle, duplicate ID) are appended after the walk in input order and
/// reported in [`Linearized::orphans`]; no task is ever dropped.
pub fn linearize<'a>(tasks: &'a [Task], relations: &RelationMap) -> Linearized<'a> {
    // First position wins for duplicate IDs; later copies fall through to the orphan pass.
    let mut position: HashMap<&str, usize> = HashMap::with_capacity(tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        position.entry(task.id.as_str()).or_insert(i);
    }

    let mut emitted = vec![false; tasks.len()];
    let mut order = Vec::with_capacity(tasks.len());
    let mut stack: Vec<usize> = Vec::new();

    for (i, task) in tasks.iter().enumerate() {
        if task.parent_id.is_some() || position.get(task.id.as_str()) != Some(&i) {
            continue;
        }
        stack.push(i);
        while let Some(idx) = stack.pop() {
            if emitted[idx] {
                continue;
            }
            emitted[idx] = true;
            let current = &tasks[idx];
            order.push(current);
            let children = relations.children_of(Some(current.id.as_str()));
            for child_id in children.iter().rev() {
                if let Some(&child_idx) = position.get(child_id.as_str())
                    && !emitted[child_idx]
                    && tasks[child_idx].parent_id.as_deref() == Some(current.id.as_str())
                {
                    stack.push(child_idx);
                }
            }
        }
    }

    let mut orphans = Vec::new();
    for (i, task) in tasks.iter().enumerate() {
        if !emitted[i] {
            order.push(task);
            orphans.push(task.id.as_str());
        }
    }

    if !orphans.is_empty() {
        tracing::warn!(
            count = orphans.len(),
            ids = ?orphans,
            "orphan tasks appended to end of outline"
        );
    }
    tracing::trace!(total = order.len(), "linearized task outline");

    Linearized { order, orphans }
}
