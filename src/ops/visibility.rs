use std::collections::HashMap;

use crate::model::task::Task;

use super::linearize::Linearized;
use super::relations::RelationMap;

/// Which rows of the outline are shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter<'a> {
    /// Only tasks of this project; `None` shows every project
    pub project_id: Option<&'a str>,
    pub show_completed: bool,
    /// Ignore `collapsed` flags and show every descendant
    pub expand_all: bool,
}

impl Default for RowFilter<'_> {
    fn default() -> Self {
        RowFilter {
            project_id: None,
            show_completed: true,
            expand_all: false,
        }
    }
}

/// Filter the linearized outline down to the rows a list view shows.
///
/// Drafts are never listed. A task is hidden when any ancestor present in the
/// collection is collapsed; the ancestor walk stops on parent cycles.
pub fn visible_rows<'a>(
    outline: &Linearized<'a>,
    relations: &RelationMap,
    filter: &RowFilter<'_>,
) -> Vec<&'a Task> {
    let by_id: HashMap<&str, &Task> = outline
        .order
        .iter()
        .map(|t| (t.id.as_str(), *t))
        .collect();

    outline
        .order
        .iter()
        .copied()
        .filter(|task| !task.draft)
        .filter(|task| filter.project_id.is_none_or(|p| task.project_id == p))
        .filter(|task| filter.show_completed || !task.completed)
        .filter(|task| {
            filter.expand_all
                || !relations
                    .ancestors(&task.id)
                    .iter()
                    .any(|a| by_id.get(a.as_str()).is_some_and(|t| t.collapsed))
        })
        .collect()
}
