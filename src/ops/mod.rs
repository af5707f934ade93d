pub mod cascade;
pub mod changes;
pub mod check;
pub mod clipboard;
pub mod linearize;
pub mod relations;
pub mod task_ops;
pub mod visibility;
