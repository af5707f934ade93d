use std::collections::HashSet;

use crossterm::event::KeyEvent;

use crate::model::config::Config;
use crate::model::project::{Project, TaskSet};
use crate::model::task::{Task, find_task};
use crate::ops::cascade::{delete_subtrees, set_completion_cascading_many};
use crate::ops::changes::{ChangeSet, diff};
use crate::ops::clipboard::{ClipboardBuffer, PasteOptions, PasteTarget, capture, paste};
use crate::ops::linearize::linearize;
use crate::ops::relations::{RelationMap, build_relation_map};
use crate::ops::task_ops::{self, Placement, filter_valid_for_batch};
use crate::ops::visibility::{RowFilter, visible_rows};

use super::input::{Action, Area, ScriptStep, map_key};
use super::selection::{Direction, Selection};

/// Result of applying an action, handed back to the caller instead of being
/// broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// The collection changed; persist these
    Changed(ChangeSet),
    /// This many tasks were captured into the clipboard
    Copied(usize),
    /// The action was refused and nothing changed
    Rejected(String),
}

/// Application state behind the outline: the flat collection plus focus,
/// selection and clipboard.
#[derive(Debug, Clone)]
pub struct Session {
    projects: Vec<Project>,
    tasks: Vec<Task>,
    relations: RelationMap,
    project_index: usize,
    area: Area,
    detail_visible: bool,
    input_focused: bool,
    show_completed: bool,
    /// Draft currently open in the detail pane
    editing: Option<String>,
    selection: Selection,
    clipboard: ClipboardBuffer,
    config: Config,
}

impl Session {
    pub fn new(set: TaskSet, config: Config) -> Self {
        let relations = build_relation_map(&set.tasks);
        Session {
            projects: set.projects,
            tasks: set.tasks,
            relations,
            project_index: 0,
            area: Area::Tasks,
            detail_visible: config.view.detail_pane,
            input_focused: false,
            show_completed: config.view.show_completed,
            editing: None,
            selection: Selection::new(),
            clipboard: ClipboardBuffer::default(),
            config,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn relations(&self) -> &RelationMap {
        &self.relations
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clipboard(&self) -> &ClipboardBuffer {
        &self.clipboard
    }

    pub fn area(&self) -> Area {
        self.area
    }

    pub fn editing(&self) -> Option<&Task> {
        self.editing.as_deref().and_then(|id| find_task(&self.tasks, id))
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.projects.get(self.project_index)
    }

    /// Focus a project by ID. Changing project clears the task selection.
    pub fn select_project(&mut self, id: &str) -> bool {
        let Some(idx) = self.projects.iter().position(|p| p.id == id) else {
            return false;
        };
        if idx != self.project_index {
            self.project_index = idx;
            self.selection.clear();
        }
        true
    }

    pub fn set_detail_visible(&mut self, visible: bool) {
        self.detail_visible = visible;
        if !visible && self.area == Area::Details {
            self.area = Area::Tasks;
        }
    }

    pub fn set_show_completed(&mut self, show: bool) {
        self.show_completed = show;
        self.refresh();
    }

    /// Select a row by ID (mouse click)
    pub fn click(&mut self, id: &str) {
        let ids = self.row_ids();
        self.selection.select(&as_strs(&ids), id);
    }

    /// Ctrl+click
    pub fn ctrl_click(&mut self, id: &str) {
        let ids = self.row_ids();
        self.selection.toggle(&as_strs(&ids), id);
    }

    /// Shift+click
    pub fn shift_click(&mut self, id: &str) {
        let ids = self.row_ids();
        self.selection.range(&as_strs(&ids), id);
    }

    /// The rows the task list shows, in display order
    pub fn rows(&self) -> Vec<&Task> {
        let outline = linearize(&self.tasks, &self.relations);
        let filter = RowFilter {
            project_id: self.current_project().map(|p| p.id.as_str()),
            show_completed: self.show_completed,
            expand_all: false,
        };
        visible_rows(&outline, &self.relations, &filter)
    }

    fn row_ids(&self) -> Vec<String> {
        self.rows().into_iter().map(|t| t.id.clone()).collect()
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) -> Effect {
        match map_key(self.area, self.input_focused, key) {
            Some(action) => self.apply(action),
            None => Effect::None,
        }
    }

    /// Replay one scripted step: keys go through the keymap, text confirms
    /// the open draft.
    pub fn replay(&mut self, step: &ScriptStep) -> Effect {
        match step {
            ScriptStep::Key(key) => self.handle_key(*key),
            ScriptStep::Text(text) => self.apply(Action::ConfirmDraft(text.clone())),
        }
    }

    pub fn apply(&mut self, action: Action) -> Effect {
        tracing::trace!(?action, area = ?self.area, "apply");
        match action {
            Action::ProjectStep(direction) => {
                self.step_project(direction);
                Effect::None
            }
            Action::EnterTasks => {
                self.area = Area::Tasks;
                if self.selection.is_empty() {
                    let ids = self.row_ids();
                    if let Some(first) = ids.first() {
                        self.selection.select(&as_strs(&ids), first);
                    }
                }
                Effect::None
            }
            Action::Step(direction) => {
                let ids = self.row_ids();
                self.selection.step(&as_strs(&ids), direction);
                Effect::None
            }
            Action::Extend(direction) => {
                let ids = self.row_ids();
                self.selection.extend(&as_strs(&ids), direction);
                Effect::None
            }
            Action::FocusParent => {
                self.focus_parent();
                Effect::None
            }
            Action::FocusDetails => {
                if self.detail_visible && self.selection.primary().is_some() {
                    self.area = Area::Details;
                }
                Effect::None
            }
            Action::NewSibling => self.new_draft(Placement::Sibling),
            Action::NewChild => self.new_draft(Placement::Child),
            Action::Delete => self.delete_selected(),
            Action::Copy => self.copy_selected(),
            Action::Paste => self.paste_clipboard(),
            Action::ToggleComplete => self.toggle_complete_selected(),
            Action::ToggleCollapse => self.toggle_collapse_primary(),
            Action::SelectAll => {
                let ids = self.row_ids();
                self.selection.select_all(&as_strs(&ids));
                Effect::None
            }
            Action::ToggleMultiMode => {
                self.selection.toggle_multi_mode();
                Effect::None
            }
            Action::ExitMulti => {
                self.selection.exit_multi();
                Effect::None
            }
            Action::LeaveDetails => {
                if let Some(draft) = self.editing.take() {
                    // An open draft is discarded, never persisted
                    if let Err(e) = task_ops::cancel_draft(&mut self.tasks, &draft) {
                        tracing::warn!(error = %e, "cancel draft failed");
                    }
                    self.refresh();
                }
                self.area = Area::Tasks;
                self.input_focused = false;
                Effect::None
            }
            Action::ConfirmDraft(name) => self.confirm_draft(&name),
        }
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    fn step_project(&mut self, direction: Direction) {
        if self.projects.is_empty() {
            return;
        }
        let next = match direction {
            Direction::Up => self.project_index.saturating_sub(1),
            Direction::Down => (self.project_index + 1).min(self.projects.len() - 1),
        };
        if next != self.project_index {
            self.project_index = next;
            self.selection.clear();
        }
    }

    fn focus_parent(&mut self) {
        let parent = self
            .selection
            .primary()
            .and_then(|id| self.relations.parent_of(id))
            .flatten()
            .map(str::to_string);
        let ids = self.row_ids();
        match parent {
            Some(parent) if ids.contains(&parent) => {
                self.selection.select(&as_strs(&ids), &parent);
            }
            _ => self.area = Area::Projects,
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Swap in a new collection and report what changed
    fn commit(&mut self, tasks: Vec<Task>) -> Effect {
        let changes = diff(&self.tasks, &tasks);
        self.tasks = tasks;
        self.refresh();
        if changes.is_empty() {
            Effect::None
        } else {
            Effect::Changed(changes)
        }
    }

    /// Rebuild the relation map and bring the selection back in line with
    /// the visible rows, moving to the nearest surviving row if the
    /// selection vanished.
    fn refresh(&mut self) {
        self.relations = build_relation_map(&self.tasks);
        let ids = self.row_ids();
        let items = as_strs(&ids);
        let had_selection = !self.selection.is_empty();
        let last_index = self.selection.last_index();

        let visible: HashSet<&str> = items.iter().copied().collect();
        self.selection.retain(|id| visible.contains(id));
        if had_selection && self.selection.is_empty() && !items.is_empty() {
            let nearest = last_index.min(items.len() - 1);
            self.selection.select(&items, items[nearest]);
        }
        self.selection.sync_index(&items);
    }

    fn targets(&self) -> Vec<String> {
        filter_valid_for_batch(&self.tasks, &self.selection.targets())
    }

    fn new_draft(&mut self, placement: Placement) -> Effect {
        let Some(project_id) = self.current_project().map(|p| p.id.clone()) else {
            return Effect::Rejected("no project selected".to_string());
        };
        if let Some(old) = self.editing.take()
            && let Err(e) = task_ops::cancel_draft(&mut self.tasks, &old)
        {
            tracing::warn!(error = %e, "cancel draft failed");
        }
        let anchor = self.selection.primary().map(str::to_string);
        match task_ops::create_draft(&mut self.tasks, &project_id, anchor.as_deref(), placement) {
            Ok(id) => {
                self.editing = Some(id);
                self.relations = build_relation_map(&self.tasks);
                self.area = Area::Details;
                self.input_focused = true;
                Effect::None
            }
            Err(e) => Effect::Rejected(e.to_string()),
        }
    }

    fn confirm_draft(&mut self, name: &str) -> Effect {
        let Some(draft) = self.editing.clone() else {
            return Effect::Rejected("no draft to confirm".to_string());
        };
        let mut tasks = self.tasks.clone();
        match task_ops::confirm_draft(&mut tasks, &draft, name, &self.config.ids.prefix) {
            Ok(id) => {
                self.editing = None;
                self.area = Area::Tasks;
                self.input_focused = false;
                let effect = self.commit(tasks);
                self.click(&id);
                effect
            }
            Err(e) => Effect::Rejected(e.to_string()),
        }
    }

    fn delete_selected(&mut self) -> Effect {
        let targets = self.targets();
        if targets.is_empty() {
            return Effect::None;
        }
        let result = delete_subtrees(&self.tasks, &self.relations, &targets);
        tracing::info!(removed = result.affected.len(), "deleted selection");
        self.commit(result.tasks)
    }

    fn copy_selected(&mut self) -> Effect {
        let targets = self.targets();
        if targets.is_empty() {
            return Effect::None;
        }
        self.clipboard = capture(&self.tasks, &self.relations, &targets);
        Effect::Copied(self.clipboard.len())
    }

    fn paste_clipboard(&mut self) -> Effect {
        let Some(project_id) = self.current_project().map(|p| p.id.clone()) else {
            return Effect::Rejected("no project selected".to_string());
        };
        let target = match self.selection.primary().and_then(|id| find_task(&self.tasks, id)) {
            Some(task) if !task.draft && task.project_id == project_id => PasteTarget::beside(task),
            _ => PasteTarget::root(project_id),
        };
        let options = PasteOptions {
            copy_suffix: &self.config.paste.copy_suffix,
            id_prefix: &self.config.ids.prefix,
        };
        match paste(&self.clipboard, &target, &self.tasks, &options) {
            Ok(pasted) => {
                let first = pasted.first().map(|t| t.id.clone());
                let mut tasks = self.tasks.clone();
                tasks.extend(pasted);
                let effect = self.commit(tasks);
                if let Some(id) = first {
                    self.click(&id);
                }
                effect
            }
            Err(e) => Effect::Rejected(e.to_string()),
        }
    }

    fn toggle_complete_selected(&mut self) -> Effect {
        let targets = self.targets();
        let Some(completed) = self
            .selection
            .primary()
            .and_then(|id| find_task(&self.tasks, id))
            .map(|t| !t.completed)
        else {
            return Effect::None;
        };
        if targets.is_empty() {
            return Effect::None;
        }
        let result = set_completion_cascading_many(&self.tasks, &self.relations, &targets, completed);
        self.commit(result.tasks)
    }

    fn toggle_collapse_primary(&mut self) -> Effect {
        let Some(id) = self.selection.primary().map(str::to_string) else {
            return Effect::None;
        };
        let mut tasks = self.tasks.clone();
        if !task_ops::toggle_collapse(&mut tasks, &self.relations, &id) {
            return Effect::None;
        }
        self.commit(tasks)
    }
}

fn as_strs(ids: &[String]) -> Vec<&str> {
    ids.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn with(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    /// p1: t1 → {t2, t3}, t4 ; p2: x
    fn session() -> Session {
        let t1 = Task::new("t1", "p1", "One");
        let t2 = Task::child_of("t2", &t1, "Two");
        let t3 = Task::child_of("t3", &t1, "Three");
        let t4 = Task::new("t4", "p1", "Four");
        let x = Task::new("x", "p2", "Other");
        let set = TaskSet {
            projects: vec![Project::new("p1", "First"), Project::new("p2", "Second")],
            tasks: vec![t1, t2, t3, t4, x],
        };
        Session::new(set, Config::default())
    }

    fn row_ids(s: &Session) -> Vec<String> {
        s.rows().iter().map(|t| t.id.clone()).collect()
    }

    fn selected(s: &Session) -> Vec<String> {
        s.selection().selected().iter().cloned().collect()
    }

    #[test]
    fn rows_show_current_project_in_outline_order() {
        let s = session();
        assert_eq!(row_ids(&s), ["t1", "t2", "t3", "t4"]);
    }

    #[test]
    fn arrows_step_and_shift_arrows_extend() {
        let mut s = session();
        s.handle_key(key(KeyCode::Down));
        assert_eq!(s.selection().primary(), Some("t1"));
        s.handle_key(with(KeyCode::Down, KeyModifiers::SHIFT));
        s.handle_key(with(KeyCode::Down, KeyModifiers::SHIFT));
        assert_eq!(selected(&s), ["t1", "t2", "t3"]);
        s.handle_key(key(KeyCode::Esc));
        assert_eq!(selected(&s), ["t3"]);
    }

    #[test]
    fn delete_cascades_and_moves_to_nearest_row() {
        let mut s = session();
        s.click("t1");
        let effect = s.handle_key(key(KeyCode::Delete));
        let Effect::Changed(changes) = effect else {
            panic!("expected change, got {:?}", effect);
        };
        assert_eq!(changes.deleted, ["t1", "t2", "t3"]);
        assert_eq!(row_ids(&s), ["t4"]);
        assert_eq!(s.selection().primary(), Some("t4"));
    }

    #[test]
    fn delete_overlapping_selection_counts_once() {
        let mut s = session();
        s.click("t1");
        s.shift_click("t3");
        let Effect::Changed(changes) = s.handle_key(key(KeyCode::Backspace)) else {
            panic!("expected change");
        };
        assert_eq!(changes.deleted.len(), 3);
    }

    #[test]
    fn space_completes_subtree() {
        let mut s = session();
        s.click("t1");
        s.handle_key(key(KeyCode::Char(' ')));
        let done: Vec<&str> = s
            .tasks()
            .iter()
            .filter(|t| t.completed)
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(done, ["t1", "t2", "t3"]);

        s.handle_key(key(KeyCode::Char(' ')));
        assert!(s.tasks().iter().all(|t| !t.completed));
    }

    #[test]
    fn hidden_completed_rows_drop_out_of_selection() {
        let mut s = session();
        s.set_show_completed(false);
        s.click("t2");
        s.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(row_ids(&s), ["t1", "t3", "t4"]);
        assert_eq!(s.selection().primary(), Some("t3"));
    }

    #[test]
    fn copy_paste_beside_selection() {
        let mut s = session();
        s.click("t1");
        assert_eq!(s.handle_key(with(KeyCode::Char('c'), KeyModifiers::CONTROL)), Effect::Copied(3));
        s.click("t4");
        let Effect::Changed(changes) = s.handle_key(with(KeyCode::Char('v'), KeyModifiers::CONTROL)) else {
            panic!("expected paste");
        };
        assert_eq!(changes.created.len(), 3);
        let root = &changes.created[0];
        assert_eq!(root.name, "One (copy)");
        assert_eq!(root.level, 0);
        assert_eq!(s.selection().primary(), Some(root.id.as_str()));
        assert_eq!(s.rows().len(), 7);
    }

    #[test]
    fn paste_beside_task_with_stale_level() {
        let a = Task::new("a", "p1", "A");
        let mut b = Task::child_of("b", &a, "B");
        b.level = 5;
        let c = Task::new("c", "p1", "C");
        let set = TaskSet {
            projects: vec![Project::new("p1", "First")],
            tasks: vec![a, b, c],
        };
        let mut s = Session::new(set, Config::default());
        s.click("c");
        assert_eq!(s.apply(Action::Copy), Effect::Copied(1));
        s.click("b");
        let effect = s.apply(Action::Paste);
        let Effect::Changed(changes) = effect else {
            panic!("expected paste, got {:?}", effect);
        };
        let root = &changes.created[0];
        assert_eq!(root.parent_id.as_deref(), Some("a"));
        assert_eq!(root.level, 1);
    }

    #[test]
    fn paste_with_empty_clipboard_is_rejected() {
        let mut s = session();
        s.click("t4");
        assert!(matches!(s.apply(Action::Paste), Effect::Rejected(_)));
        assert_eq!(s.tasks().len(), 5);
    }

    #[test]
    fn collapse_hides_children_and_drops_them_from_selection() {
        let mut s = session();
        s.click("t1");
        s.shift_click("t2");
        let c_right = with(KeyCode::Right, KeyModifiers::CONTROL);
        assert!(matches!(s.handle_key(c_right), Effect::None));

        s.click("t1");
        assert!(matches!(s.handle_key(c_right), Effect::Changed(_)));
        assert_eq!(row_ids(&s), ["t1", "t4"]);
    }

    #[test]
    fn draft_lifecycle() {
        let mut s = session();
        s.click("t2");
        s.handle_key(key(KeyCode::Tab));
        assert_eq!(s.area(), Area::Details);
        let draft = s.editing().unwrap().clone();
        assert_eq!(draft.parent_id.as_deref(), Some("t2"));
        assert!(!row_ids(&s).contains(&draft.id));

        // structural keys are ignored while typing
        assert_eq!(s.handle_key(key(KeyCode::Delete)), Effect::None);

        let Effect::Changed(changes) = s.apply(Action::ConfirmDraft("Leaf".into())) else {
            panic!("expected create");
        };
        assert_eq!(changes.created.len(), 1);
        assert_eq!(changes.created[0].level, 2);
        assert_eq!(s.area(), Area::Tasks);
        assert_eq!(s.selection().primary(), Some(changes.created[0].id.as_str()));
    }

    #[test]
    fn escape_cancels_draft() {
        let mut s = session();
        s.click("t4");
        s.handle_key(key(KeyCode::Enter));
        assert_eq!(s.tasks().len(), 6);
        assert_eq!(s.handle_key(key(KeyCode::Esc)), Effect::None);
        assert_eq!(s.tasks().len(), 5);
        assert_eq!(s.area(), Area::Tasks);
        assert!(s.editing().is_none());
    }

    #[test]
    fn new_draft_replaces_open_draft() {
        let mut s = session();
        s.click("t4");
        s.apply(Action::NewSibling);
        let first = s.editing().unwrap().id.clone();
        s.apply(Action::NewChild);
        let second = s.editing().unwrap().clone();
        assert_ne!(first, second.id);
        assert_eq!(second.parent_id.as_deref(), Some("t4"));
        assert_eq!(s.tasks().iter().filter(|t| t.draft).count(), 1);
        assert_eq!(s.tasks().len(), 6);
    }

    #[test]
    fn left_goes_to_parent_then_project_list() {
        let mut s = session();
        s.click("t3");
        s.handle_key(key(KeyCode::Left));
        assert_eq!(s.selection().primary(), Some("t1"));
        s.handle_key(key(KeyCode::Left));
        assert_eq!(s.area(), Area::Projects);

        s.handle_key(key(KeyCode::Down));
        assert_eq!(s.current_project().unwrap().id, "p2");
        assert!(s.selection().is_empty());
        s.handle_key(key(KeyCode::Right));
        assert_eq!(s.area(), Area::Tasks);
        assert_eq!(s.selection().primary(), Some("x"));
    }

    #[test]
    fn right_opens_details_only_with_selection_and_visible_pane() {
        let mut s = session();
        s.handle_key(key(KeyCode::Right));
        assert_eq!(s.area(), Area::Tasks);
        s.click("t1");
        s.set_detail_visible(false);
        s.handle_key(key(KeyCode::Right));
        assert_eq!(s.area(), Area::Tasks);
        s.set_detail_visible(true);
        s.handle_key(key(KeyCode::Right));
        assert_eq!(s.area(), Area::Details);
        s.handle_key(key(KeyCode::Left));
        assert_eq!(s.area(), Area::Tasks);
    }

    #[test]
    fn select_all_then_ctrl_click_out() {
        let mut s = session();
        s.click("t2");
        s.handle_key(with(KeyCode::Char('a'), KeyModifiers::CONTROL));
        assert_eq!(selected(&s).len(), 4);
        assert_eq!(s.selection().primary(), Some("t2"));
        s.ctrl_click("t2");
        assert_eq!(s.selection().primary(), Some("t1"));
        assert_eq!(selected(&s), ["t1", "t3", "t4"]);
    }
}
