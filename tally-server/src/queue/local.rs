//! In-process work queue backed by a bounded tokio channel

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{QueueError, WorkItem, WorkQueue, WorkerHandle};

/// Sending half of the in-process queue. The receiving half goes to a
/// [`WorkerPool`](crate::worker::WorkerPool).
#[derive(Debug, Clone)]
pub struct LocalQueue {
    sender: mpsc::Sender<WorkItem>,
}

impl LocalQueue {
    /// Creates a queue holding at most `capacity` pending items.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<WorkItem>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl WorkQueue for LocalQueue {
    async fn submit(
        &self,
        unit: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<WorkerHandle, QueueError> {
        let item = WorkItem::new(unit, args);
        let handle = item.handle.clone();

        self.sender.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })?;

        tracing::debug!("Queued unit '{}' as {}", unit, handle);
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_submit_delivers_item() {
        let (queue, mut receiver) = LocalQueue::new(4);

        let handle = queue.submit("add", vec![json!(1), json!(2)]).await.unwrap();

        let item = receiver.recv().await.unwrap();
        assert_eq!(item.handle, handle);
        assert_eq!(item.unit, "add");
        assert_eq!(item.args, vec![json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn test_handles_are_unique() {
        let (queue, _receiver) = LocalQueue::new(4);

        let first = queue.submit("add", vec![]).await.unwrap();
        let second = queue.submit("add", vec![]).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_full_queue_rejects() {
        let (queue, _receiver) = LocalQueue::new(1);

        queue.submit("add", vec![]).await.unwrap();
        let result = queue.submit("add", vec![]).await;
        assert!(matches!(result, Err(QueueError::Full)));
    }

    #[tokio::test]
    async fn test_closed_queue_rejects() {
        let (queue, receiver) = LocalQueue::new(1);
        drop(receiver);

        let result = queue.submit("add", vec![]).await;
        assert!(matches!(result, Err(QueueError::Closed)));
    }
}
