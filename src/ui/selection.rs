use indexmap::IndexSet;

/// Vertical step direction in the task list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Single / range / multi selection over the displayed rows.
///
/// Every transition takes the current display order as `items` and leaves the
/// state consistent: `primary` is `None` exactly when `selected` is empty, is
/// always a member of `selected` otherwise, and outside multi mode at most one
/// ID is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    primary: Option<String>,
    selected: IndexSet<String>,
    multi: bool,
    last_index: usize,
    range_anchor: Option<usize>,
}

fn index_of(items: &[&str], id: &str) -> Option<usize> {
    items.iter().position(|i| *i == id)
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The primary (last touched) ID
    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    /// Selected IDs in insertion order
    pub fn selected(&self) -> &IndexSet<String> {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.last_index
    }

    /// IDs an action should apply to: the whole set in multi mode when the
    /// primary is part of it, otherwise just the primary.
    pub fn targets(&self) -> Vec<String> {
        match &self.primary {
            None => Vec::new(),
            Some(p) if self.multi && self.selected.contains(p) => self.selected.iter().cloned().collect(),
            Some(p) => vec![p.clone()],
        }
    }

    /// Replace the selection with `id`. Unknown IDs are ignored.
    pub fn select(&mut self, items: &[&str], id: &str) {
        let Some(idx) = index_of(items, id) else {
            return;
        };
        self.primary = Some(id.to_string());
        self.selected.clear();
        self.selected.insert(id.to_string());
        self.multi = false;
        self.last_index = idx;
        self.range_anchor = None;
    }

    /// Add or remove `id` and switch to multi mode. IDs not in `items` are
    /// ignored.
    pub fn toggle(&mut self, items: &[&str], id: &str) {
        let Some(idx) = index_of(items, id) else {
            return;
        };
        if self.selected.shift_remove(id) {
            if self.primary.as_deref() == Some(id) {
                self.primary = self.selected.first().cloned();
            }
        } else {
            self.selected.insert(id.to_string());
            self.primary = Some(id.to_string());
        }
        self.multi = true;
        self.range_anchor = None;
        self.last_index = idx;
    }

    /// Select every row between the primary and `id`, inclusive.
    ///
    /// Without a primary this is a plain [`select`](Self::select).
    pub fn range(&mut self, items: &[&str], id: &str) {
        let Some(primary) = self.primary.clone() else {
            self.select(items, id);
            return;
        };
        let (Some(from), Some(to)) = (index_of(items, &primary), index_of(items, id)) else {
            return;
        };
        let (start, end) = if from <= to { (from, to) } else { (to, from) };
        self.selected = items[start..=end].iter().map(|s| s.to_string()).collect();
        self.primary = Some(id.to_string());
        self.multi = true;
        self.last_index = to;
        self.range_anchor = Some(from);
    }

    /// Grow or shrink a keyboard range by one row (Shift+Up/Down).
    pub fn extend(&mut self, items: &[&str], direction: Direction) {
        let Some(current) = self.primary.as_deref().and_then(|p| index_of(items, p)) else {
            self.step(items, direction);
            return;
        };
        let next = match direction {
            Direction::Up if current > 0 => current - 1,
            Direction::Down if current + 1 < items.len() => current + 1,
            _ => return,
        };

        if !self.multi || self.range_anchor.is_none() {
            self.range_anchor = Some(current);
            self.multi = true;
        }
        let anchor = self.range_anchor.unwrap_or(current);

        let entering = items[next];
        let shrinking = self.selected.contains(entering)
            && match direction {
                Direction::Up => anchor < current,
                Direction::Down => anchor > current,
            };
        if shrinking {
            self.selected.shift_remove(items[current]);
        }
        self.primary = Some(entering.to_string());
        self.selected.insert(entering.to_string());
        self.last_index = next;
    }

    /// Plain arrow movement: move the single selection one row.
    pub fn step(&mut self, items: &[&str], direction: Direction) {
        let Some(&first) = items.first() else {
            return;
        };
        let current = self.primary.as_deref().and_then(|p| index_of(items, p));
        let next = match (current, direction) {
            (None, _) => {
                self.select(items, first);
                return;
            }
            (Some(i), Direction::Up) => i.saturating_sub(1),
            (Some(i), Direction::Down) => (i + 1).min(items.len() - 1),
        };
        self.select(items, items[next]);
    }

    pub fn select_all(&mut self, items: &[&str]) {
        if items.is_empty() {
            return;
        }
        self.selected = items.iter().map(|s| s.to_string()).collect();
        let keep = self.primary.as_deref().is_some_and(|p| self.selected.contains(p));
        if !keep {
            self.primary = Some(items[0].to_string());
        }
        self.multi = true;
        self.range_anchor = None;
        if let Some(idx) = self.primary.as_deref().and_then(|p| index_of(items, p)) {
            self.last_index = idx;
        }
    }

    pub fn clear(&mut self) {
        *self = Selection::default();
    }

    /// Turning multi mode off keeps only the first selected ID; turning it on
    /// folds the primary into the set.
    pub fn toggle_multi_mode(&mut self) {
        if self.multi {
            let first = self.selected.first().cloned();
            self.selected.clear();
            if let Some(id) = &first {
                self.selected.insert(id.clone());
            }
            self.primary = first;
            self.multi = false;
            self.range_anchor = None;
        } else {
            if let Some(p) = &self.primary {
                self.selected.insert(p.clone());
            }
            self.multi = true;
        }
    }

    /// Leave multi mode keeping only the primary (Escape)
    pub fn exit_multi(&mut self) {
        self.selected.clear();
        if let Some(p) = &self.primary {
            self.selected.insert(p.clone());
        }
        self.multi = false;
        self.range_anchor = None;
    }

    /// Drop IDs that no longer exist. The primary falls back to the first
    /// surviving ID; when nothing survives the selection is cleared.
    pub fn retain<F>(&mut self, exists: F)
    where
        F: Fn(&str) -> bool,
    {
        self.selected.retain(|id| exists(id.as_str()));
        if self.selected.is_empty() {
            self.clear();
            return;
        }
        if !self.primary.as_deref().is_some_and(|p| self.selected.contains(p)) {
            self.primary = self.selected.first().cloned();
        }
        if !self.multi && self.selected.len() > 1 {
            self.exit_multi();
        }
    }

    /// Re-point `last_index` at the primary after the display order changed
    pub fn sync_index(&mut self, items: &[&str]) {
        if let Some(idx) = self.primary.as_deref().and_then(|p| index_of(items, p)) {
            self.last_index = idx;
        }
        self.range_anchor = None;
    }
}
