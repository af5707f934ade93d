pub mod task;
pub mod project;
pub mod config;

pub use task::*;
pub use project::*;
pub use config::*;
