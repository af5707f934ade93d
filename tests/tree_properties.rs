//! Whole-engine properties of the task forest, exercised through the public
//! library API.

use pretty_assertions::assert_eq;
use std::collections::HashSet;

use tasktree::model::task::Task;
use tasktree::ops::cascade::{delete_subtree, set_completion_cascading};
use tasktree::ops::clipboard::{PasteOptions, PasteTarget, capture, paste};
use tasktree::ops::linearize::linearize;
use tasktree::ops::relations::build_relation_map;
use tasktree::ui::selection::{Direction, Selection};

fn task(id: &str, parent: Option<&str>, level: usize) -> Task {
    let mut t = Task::new(id, "p1", format!("Task {}", id));
    t.parent_id = parent.map(str::to_string);
    t.level = level;
    t
}

/// t1 -> { t2, t3 }
fn scenario() -> Vec<Task> {
    vec![
        task("t1", None, 0),
        task("t2", Some("t1"), 1),
        task("t3", Some("t1"), 1),
    ]
}

/// A wider forest listed out of display order: children ahead of parents,
/// siblings interleaved across roots.
fn shuffled_forest() -> Vec<Task> {
    vec![
        task("c2", Some("b"), 2),
        task("a1", Some("a"), 1),
        task("b", Some("a"), 1),
        task("x", None, 0),
        task("a", None, 0),
        task("x1", Some("x"), 1),
        task("c1", Some("b"), 2),
        task("d", Some("c1"), 3),
    ]
}

// ---------------------------------------------------------------------------
// Linearization
// ---------------------------------------------------------------------------

#[test]
fn linearization_is_total_for_acyclic_forests() {
    for tasks in [scenario(), shuffled_forest(), Vec::new()] {
        let map = build_relation_map(&tasks);
        let outline = linearize(&tasks, &map);
        assert_eq!(outline.len(), tasks.len());

        let ids = outline.ids();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), tasks.len());
        for t in &tasks {
            assert!(unique.contains(t.id.as_str()), "{} missing", t.id);
        }
        assert!(outline.orphans.is_empty());
    }
}

#[test]
fn linearization_puts_parents_before_descendants() {
    let tasks = shuffled_forest();
    let map = build_relation_map(&tasks);
    let outline = linearize(&tasks, &map);
    // Roots keep collection order (x before a); children keep theirs.
    assert_eq!(outline.ids(), ["x", "x1", "a", "a1", "b", "c2", "c1", "d"]);
}

#[test]
fn two_cycle_terminates_with_both_as_orphans() {
    let tasks = vec![
        task("root", None, 0),
        task("a", Some("b"), 1),
        task("b", Some("a"), 1),
    ];
    let map = build_relation_map(&tasks);
    let outline = linearize(&tasks, &map);
    assert_eq!(outline.ids(), ["root", "a", "b"]);
    assert_eq!(outline.orphans, ["a", "b"]);
    assert!(map.is_in_cycle("a"));
    assert!(!map.is_in_cycle("root"));
}

// ---------------------------------------------------------------------------
// Cascades
// ---------------------------------------------------------------------------

#[test]
fn cascade_reaches_grandchildren() {
    let tasks = vec![
        task("root", None, 0),
        task("child1", Some("root"), 1),
        task("grandchild", Some("child1"), 2),
    ];
    let map = build_relation_map(&tasks);

    let deleted = delete_subtree(&tasks, &map, "root");
    assert!(deleted.tasks.is_empty());
    assert_eq!(deleted.affected.len(), 3);

    let done = set_completion_cascading(&tasks, &map, "root", true);
    assert!(done.tasks.iter().all(|t| t.completed));
    assert!(done.tasks.iter().all(|t| t.completion_date.is_some()));
}

#[test]
fn delete_is_idempotent() {
    let mut tasks = scenario();
    tasks.push(task("t4", None, 0));
    let map = build_relation_map(&tasks);
    let first = delete_subtree(&tasks, &map, "t2");

    let map = build_relation_map(&first.tasks);
    let second = delete_subtree(&first.tasks, &map, "t2");
    assert_eq!(second.tasks, first.tasks);
    assert!(second.is_noop());
}

#[test]
fn scenario_delete_and_complete_root() {
    let tasks = scenario();
    let map = build_relation_map(&tasks);

    assert_eq!(delete_subtree(&tasks, &map, "t1").tasks, Vec::<Task>::new());

    let done = set_completion_cascading(&tasks, &map, "t1", true);
    let flags: Vec<bool> = done.tasks.iter().map(|t| t.completed).collect();
    assert_eq!(flags, [true, true, true]);
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

const ITEMS: [&str; 5] = ["t1", "t2", "t3", "t4", "t5"];

/// Tiny deterministic generator so the operation sequences are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

#[test]
fn selection_invariant_holds_after_any_sequence() {
    for seed in 0..50u64 {
        let mut rng = Lcg(seed);
        let mut sel = Selection::new();
        for _ in 0..40 {
            let id = ITEMS[rng.next(ITEMS.len())];
            match rng.next(9) {
                0 => sel.select(&ITEMS, id),
                1 => sel.toggle(&ITEMS, id),
                2 => sel.range(&ITEMS, id),
                3 => sel.clear(),
                4 => sel.extend(&ITEMS, Direction::Down),
                5 => sel.extend(&ITEMS, Direction::Up),
                6 => sel.toggle_multi_mode(),
                7 => sel.select_all(&ITEMS),
                _ => sel.exit_multi(),
            }
            assert_eq!(sel.primary().is_none(), sel.selected().is_empty(), "seed {}", seed);
            if let Some(primary) = sel.primary() {
                assert!(sel.is_selected(primary), "seed {}", seed);
            }
            if !sel.is_multi() {
                assert!(sel.selected().len() <= 1, "seed {}", seed);
            }
        }
    }
}

#[test]
fn range_selection_is_symmetric() {
    let mut forward = Selection::new();
    forward.select(&ITEMS, "t1");
    forward.range(&ITEMS, "t4");

    let mut backward = Selection::new();
    backward.select(&ITEMS, "t4");
    backward.range(&ITEMS, "t1");

    let expected: HashSet<String> = ["t1", "t2", "t3", "t4"].into_iter().map(str::to_string).collect();
    let got = |s: &Selection| -> HashSet<String> { s.selected().iter().cloned().collect() };
    assert_eq!(got(&forward), expected);
    assert_eq!(got(&backward), expected);
}

// ---------------------------------------------------------------------------
// Paste
// ---------------------------------------------------------------------------

#[test]
fn pasted_subtree_gets_fresh_ids_levels_and_state() {
    let mut tasks = scenario();
    for t in &mut tasks {
        t.set_completed(true, chrono::Utc::now());
    }
    let mut target_parent = task("dest", None, 0);
    target_parent.level = 2;
    tasks.push(target_parent.clone());

    let map = build_relation_map(&tasks);
    let buffer = capture(&tasks, &map, &["t1"]);
    assert_eq!(buffer.len(), 3);

    let pasted = paste(
        &buffer,
        &PasteTarget::into_task(&target_parent),
        &tasks,
        &PasteOptions::default(),
    )
    .unwrap();
    assert_eq!(pasted.len(), 3);

    let originals: HashSet<&str> = ["t1", "t2", "t3"].into_iter().collect();
    assert!(pasted.iter().all(|t| !originals.contains(t.id.as_str())));
    let levels: Vec<usize> = pasted.iter().map(|t| t.level).collect();
    assert_eq!(levels, [3, 4, 4]);
    assert!(pasted.iter().all(|t| !t.completed && t.completion_date.is_none()));

    // Internal structure is rewired onto the new ids
    assert_eq!(pasted[0].parent_id.as_deref(), Some("dest"));
    assert_eq!(pasted[1].parent_id.as_deref(), Some(pasted[0].id.as_str()));
    assert_eq!(pasted[2].parent_id.as_deref(), Some(pasted[0].id.as_str()));
}
