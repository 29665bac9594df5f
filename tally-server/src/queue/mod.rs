//! Work Queue
//!
//! Hands units of work to the worker pool. Submission is fire-and-forget: the
//! caller gets a worker handle back and never waits for the outcome.

pub mod local;

use async_trait::async_trait;
use thiserror::Error;

pub use local::LocalQueue;

/// Opaque identifier of one submitted unit of work
pub type WorkerHandle = String;

/// A queued invocation of a named unit of work
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub handle: WorkerHandle,
    pub unit: String,
    pub args: Vec<serde_json::Value>,
}

impl WorkItem {
    pub fn new(unit: &str, args: Vec<serde_json::Value>) -> Self {
        Self {
            handle: uuid::Uuid::new_v4().to_string(),
            unit: unit.to_string(),
            args,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("work queue is full")]
    Full,

    #[error("work queue is closed")]
    Closed,
}

#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Enqueues `unit` with `args` and returns the handle of the submission.
    async fn submit(
        &self,
        unit: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<WorkerHandle, QueueError>;
}
