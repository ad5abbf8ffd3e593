//! Background task queue for hollow-rs.
//!
//! - **Queue**: immediate list and delayed sorted set in the fast store
//! - **Scheduler**: promotes due delayed tasks every poll interval
//! - **Workers**: a single sequential consumer dispatching by task type
//!
//! Delivery is at most once with respect to handler failures and at least
//! once with respect to delayed promotion, so handlers are idempotent.

pub mod error;
pub mod jobs;
pub mod queue;
pub mod scheduler;
pub mod workers;

pub use error::QueueError;
pub use jobs::{Task, TaskType};
pub use queue::{epoch_seconds, TaskQueue};
pub use scheduler::DelayedScheduler;
pub use workers::{EmailHandler, PushHandler, TaskHandler, Worker};
