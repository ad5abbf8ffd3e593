//! Worker-local errors.

use hollow_common::AppError;
use thiserror::Error;

use crate::jobs::TaskType;

/// Why a popped task was not run to completion.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The task bytes are not a valid envelope.
    #[error("Undecodable task: {0}")]
    Decode(#[source] serde_json::Error),

    /// No handler is registered under the task type.
    #[error("No handler for task type {0}")]
    UnknownTaskType(String),

    /// The handler ran and failed.
    #[error("Handler for {task_type} failed: {source}")]
    Handler {
        /// Type of the failed task.
        task_type: TaskType,
        /// Handler error.
        #[source]
        source: AppError,
    },

    /// The fast store failed.
    #[error("Store error: {0}")]
    Store(#[from] AppError),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Store(e) | QueueError::Handler { source: e, .. } => e,
            other => Self::Queue(other.to_string()),
        }
    }
}
