use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;

use crate::model::task::Task;

/// Parent/child index derived from a flat task collection.
///
/// Disposable: rebuild it with [`build_relation_map`] after every change to
/// the collection rather than patching it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationMap {
    /// Tasks with no parent, in input order
    roots: Vec<String>,
    /// Parent ID → direct child IDs, in input order
    children: HashMap<String, Vec<String>>,
    /// Task ID → parent ID (`None` for roots)
    parents: HashMap<String, Option<String>>,
}

/// Build the relation map for a flat task list.
///
/// Dangling parent references are accepted as-is; they surface later as
/// orphans during linearization.
pub fn build_relation_map(tasks: &[Task]) -> RelationMap {
    let mut map = RelationMap::default();
    for task in tasks {
        match &task.parent_id {
            None => map.roots.push(task.id.clone()),
            Some(parent) => map
                .children
                .entry(parent.clone())
                .or_default()
                .push(task.id.clone()),
        }
        map.parents.insert(task.id.clone(), task.parent_id.clone());
    }
    map
}

impl RelationMap {
    /// Root task IDs in input order
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Direct children of `parent`, or the roots when `parent` is `None`
    pub fn children_of(&self, parent: Option<&str>) -> &[String] {
        match parent {
            None => &self.roots,
            Some(id) => self.children.get(id).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    /// Parent of `id`. Outer `None` means the ID is unknown; `Some(None)` is a root.
    pub fn parent_of(&self, id: &str) -> Option<Option<&str>> {
        self.parents.get(id).map(|p| p.as_deref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.parents.contains_key(id)
    }

    pub fn has_children(&self, id: &str) -> bool {
        self.children.get(id).is_some_and(|c| !c.is_empty())
    }

    /// Every descendant of `id` (not including `id`), depth-first pre-order.
    ///
    /// Each ID appears once even if the input contains a parent cycle.
    pub fn descendants(&self, id: &str) -> IndexSet<String> {
        let mut out = IndexSet::new();
        let mut stack: Vec<&str> = self
            .children_of(Some(id))
            .iter()
            .rev()
            .map(|s| s.as_str())
            .collect();
        while let Some(current) = stack.pop() {
            if current == id || !out.insert(current.to_string()) {
                continue;
            }
            stack.extend(self.children_of(Some(current)).iter().rev().map(|s| s.as_str()));
        }
        out
    }

    /// `id` followed by all of its descendants
    pub fn subtree(&self, id: &str) -> IndexSet<String> {
        let mut out = IndexSet::new();
        out.insert(id.to_string());
        out.extend(self.descendants(id));
        out
    }

    /// Ancestors of `id`, nearest first. Stops at a root, at an unknown
    /// parent, or where a parent cycle would repeat.
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(id);
        let mut current = id;
        while let Some(Some(parent)) = self.parent_of(current) {
            if !seen.insert(parent) {
                break;
            }
            out.push(parent.to_string());
            if !self.contains(parent) {
                break;
            }
            current = parent;
        }
        out
    }

    /// Whether `id` sits on a parent cycle
    pub fn is_in_cycle(&self, id: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = id;
        while let Some(Some(parent)) = self.parent_of(current) {
            if parent == id {
                return true;
            }
            if !seen.insert(parent) {
                return false;
            }
            current = parent;
        }
        false
    }
}
