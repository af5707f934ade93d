use serde::Serialize;

use crate::model::task::Task;
use crate::ops::relations::RelationMap;
use crate::ui::selection::Selection;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct RowJson {
    pub id: String,
    pub name: String,
    pub level: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub completed: bool,
    pub collapsed: bool,
    pub has_children: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub orphan: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
}

#[derive(Serialize)]
pub struct OutlineJson {
    pub project: String,
    pub rows: Vec<RowJson>,
}

#[derive(Serialize)]
pub struct ProjectJson {
    pub id: String,
    pub name: String,
    pub tasks: usize,
    pub completed: usize,
}

#[derive(Serialize)]
pub struct KeysJson {
    pub area: crate::ui::input::Area,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    pub selected: Vec<String>,
    pub clipboard: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub rejected: Vec<String>,
    pub outline: OutlineJson,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn row_to_json(task: &Task, relations: &RelationMap, orphans: &[&str], selection: Option<&Selection>) -> RowJson {
    RowJson {
        id: task.id.clone(),
        name: task.name.clone(),
        level: task.level,
        parent_id: task.parent_id.clone(),
        completed: task.completed,
        collapsed: task.collapsed,
        has_children: relations.has_children(&task.id),
        orphan: orphans.contains(&task.id.as_str()),
        selected: selection.is_some_and(|s| s.is_selected(&task.id)),
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// Render outline rows, one per line:
///
/// ```text
/// * [ ] Write report (t1)
/// >   [x] Draft (t2)
///     [ ] Review (t3) [+]
/// ```
///
/// The first column marks the primary (`>`) and other selected rows (`*`).
/// Indent follows the stored level. Collapsed parents end in `[+]`; orphans
/// end in `(orphan)`.
pub fn format_outline(
    rows: &[&Task],
    relations: &RelationMap,
    orphans: &[&str],
    selection: Option<&Selection>,
) -> String {
    let mut out = String::new();
    for task in rows {
        let mark = match selection {
            Some(s) if s.primary() == Some(task.id.as_str()) => '>',
            Some(s) if s.is_selected(&task.id) => '*',
            _ => ' ',
        };
        out.push(mark);
        out.push(' ');
        for _ in 0..task.level {
            out.push_str("  ");
        }
        out.push_str(if task.completed { "[x] " } else { "[ ] " });
        out.push_str(&task.name);
        out.push_str(&format!(" ({})", task.id));
        if task.collapsed && relations.has_children(&task.id) {
            out.push_str(" [+]");
        }
        if orphans.contains(&task.id.as_str()) {
            out.push_str(" (orphan)");
        }
        out.push('\n');
    }
    out
}

/// Multi-line detail view for `tt show`
pub fn format_task_detail(task: &Task, relations: &RelationMap) -> String {
    let mut lines = vec![
        format!("{} {}", task.id, task.name),
        format!("project: {}", task.project_id),
        format!("level: {}", task.level),
    ];
    if let Some(parent) = &task.parent_id {
        lines.push(format!("parent: {}", parent));
    }
    let children = relations.children_of(Some(task.id.as_str()));
    if !children.is_empty() {
        lines.push(format!("subtasks: {}", children.join(", ")));
    }
    match task.completion_date {
        Some(date) if task.completed => lines.push(format!(
            "completed: {}",
            date.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        )),
        _ if task.completed => lines.push("completed: yes".to_string()),
        _ => lines.push("completed: no".to_string()),
    }
    if task.collapsed {
        lines.push("collapsed: yes".to_string());
    }
    if let Some(start) = task.start_date {
        lines.push(format!("start: {}", start));
    }
    if let Some(due) = task.due_date {
        lines.push(format!("due: {}", due));
    }
    if !task.assignee.is_empty() {
        lines.push(format!("assignee: {}", task.assignee));
    }
    if !task.notes.is_empty() {
        lines.push(String::new());
        lines.push(task.notes.clone());
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::linearize::linearize;
    use crate::ops::relations::build_relation_map;

    fn tasks() -> Vec<Task> {
        let root = Task::new("t1", "p1", "Write report");
        let mut draft = Task::child_of("t2", &root, "Draft");
        draft.completed = true;
        let review = Task::child_of("t3", &root, "Review");
        let mut orphan = Task::new("t9", "p1", "Lost");
        orphan.parent_id = Some("gone".into());
        orphan.level = 1;
        vec![root, draft, review, orphan]
    }

    #[test]
    fn outline_marks_selection_and_orphans() {
        let tasks = tasks();
        let map = build_relation_map(&tasks);
        let outline = linearize(&tasks, &map);
        let mut sel = Selection::new();
        let ids = outline.ids();
        sel.select(&ids, "t1");
        sel.range(&ids, "t2");

        let text = format_outline(&outline.order, &map, &outline.orphans, Some(&sel));
        insta::assert_snapshot!(text, @r"
        * [ ] Write report (t1)
        >   [x] Draft (t2)
            [ ] Review (t3)
            [ ] Lost (t9) (orphan)
        ");
    }

    #[test]
    fn collapsed_parent_is_flagged() {
        let mut tasks = tasks();
        tasks[0].collapsed = true;
        let map = build_relation_map(&tasks);
        let text = format_outline(&[&tasks[0]], &map, &[], None);
        assert_eq!(text, "  [ ] Write report (t1) [+]\n");
    }

    #[test]
    fn detail_lists_subtasks() {
        let tasks = tasks();
        let map = build_relation_map(&tasks);
        let text = format_task_detail(&tasks[0], &map);
        assert!(text.starts_with("t1 Write report\n"));
        assert!(text.contains("subtasks: t2, t3\n"));
        assert!(text.contains("completed: no\n"));
    }

    #[test]
    fn row_json_skips_false_flags() {
        let tasks = tasks();
        let map = build_relation_map(&tasks);
        let json = serde_json::to_value(row_to_json(&tasks[1], &map, &[], None)).unwrap();
        assert_eq!(json["parent_id"], "t1");
        assert!(json.get("orphan").is_none());
        assert!(json.get("selected").is_none());
    }
}
