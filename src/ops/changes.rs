use std::collections::HashMap;

use serde::Serialize;

use crate::model::task::Task;

/// Create/update/delete requests for the persistence collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub created: Vec<Task>,
    pub updated: Vec<Task>,
    pub deleted: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    /// Fold a later change set into this one
    pub fn merge(&mut self, later: ChangeSet) {
        for id in later.deleted {
            let was_created = self.created.iter().any(|t| t.id == id);
            self.created.retain(|t| t.id != id);
            self.updated.retain(|t| t.id != id);
            if !was_created && !self.deleted.contains(&id) {
                self.deleted.push(id);
            }
        }
        for task in later.created {
            self.created.retain(|t| t.id != task.id);
            self.created.push(task);
        }
        for task in later.updated {
            if let Some(slot) = self.created.iter_mut().find(|t| t.id == task.id) {
                *slot = task;
            } else if let Some(slot) = self.updated.iter_mut().find(|t| t.id == task.id) {
                *slot = task;
            } else {
                self.updated.push(task);
            }
        }
    }
}

/// Compare two snapshots of the collection. Drafts are invisible to
/// persistence and never appear in the result.
pub fn diff(old: &[Task], new: &[Task]) -> ChangeSet {
    let before: HashMap<&str, &Task> = old
        .iter()
        .filter(|t| !t.draft)
        .map(|t| (t.id.as_str(), t))
        .collect();
    let after: HashMap<&str, &Task> = new
        .iter()
        .filter(|t| !t.draft)
        .map(|t| (t.id.as_str(), t))
        .collect();

    let mut changes = ChangeSet::default();
    for task in new.iter().filter(|t| !t.draft) {
        match before.get(task.id.as_str()) {
            None => changes.created.push(task.clone()),
            Some(prev) if *prev != task => changes.updated.push(task.clone()),
            Some(_) => {}
        }
    }
    for task in old.iter().filter(|t| !t.draft) {
        if !after.contains_key(task.id.as_str()) {
            changes.deleted.push(task.id.clone());
        }
    }
    changes
}
