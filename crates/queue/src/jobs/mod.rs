//! Task envelope and task types.

mod envelope;

pub use envelope::{Task, TaskType};
