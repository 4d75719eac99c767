pub mod context;
pub mod crew;
pub mod graph;

pub use context::{ExecutionContext, TaskOutput};
pub use crew::{Crew, CrewOutput};
