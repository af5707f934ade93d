//! Hierarchical task outlines: a flat task collection viewed as a forest,
//! with cascading delete and completion, multi-selection over the displayed
//! order, subtree copy/paste and a keyboard-driven session on top.

pub mod cli;
pub mod io;
pub mod model;
pub mod ops;
pub mod ui;
