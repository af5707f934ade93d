pub mod input;
pub mod selection;
pub mod session;

pub use input::{Action, Area};
pub use selection::{Direction, Selection};
pub use session::{Effect, Session};
