//! Worker pool
//!
//! Drains the in-process queue and runs each item on its own tokio task.
//! Each item is looked up by unit name in a [`UnitRegistry`]. At most
//! `concurrency` units run at once.

pub mod add;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::queue::WorkItem;

pub use add::{AddUnit, add_args};

/// A named computation run by the worker pool
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs the unit. `handle` identifies this particular invocation.
    async fn run(&self, handle: &str, args: &[serde_json::Value]) -> Result<()>;
}

/// Units of work known to the pool, by name
#[derive(Default, Clone)]
pub struct UnitRegistry {
    units: HashMap<&'static str, Arc<dyn UnitOfWork>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, unit: Arc<dyn UnitOfWork>) -> Self {
        self.units.insert(unit.name(), unit);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn UnitOfWork>> {
        self.units.get(name).cloned()
    }
}

/// Executes queued units of work with bounded parallelism
pub struct WorkerPool {
    receiver: mpsc::Receiver<WorkItem>,
    registry: UnitRegistry,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(
        receiver: mpsc::Receiver<WorkItem>,
        registry: UnitRegistry,
        concurrency: usize,
    ) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            receiver,
            registry,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Runs until the queue closes or `shutdown` flips to true, then waits
    /// for in-flight units to finish.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting worker pool (concurrency: {})", self.concurrency);

        loop {
            let item = tokio::select! {
                item = self.receiver.recv() => match item {
                    Some(item) => item,
                    None => {
                        debug!("Work queue closed");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };

            self.dispatch(item).await;
        }

        self.drain().await;
        info!("Worker pool stopped");
    }

    async fn dispatch(&self, item: WorkItem) {
        let Some(unit) = self.registry.get(&item.unit) else {
            warn!("Dropping {}: unknown unit '{}'", item.handle, item.unit);
            return;
        };

        let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Worker semaphore closed: {}", e);
                return;
            }
        };

        tokio::spawn(async move {
            let _permit = permit;
            debug!("Running unit '{}' ({})", item.unit, item.handle);
            if let Err(e) = unit.run(&item.handle, &item.args).await {
                error!("Unit '{}' ({}) failed: {:#}", item.unit, item.handle, e);
            }
        });
    }

    /// Waits until every running unit has released its permit.
    async fn drain(&self) {
        let total = self.concurrency as u32;
        if let Err(e) = self.semaphore.acquire_many(total).await {
            warn!("Failed to wait for running units: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{LocalQueue, WorkQueue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingUnit {
        runs: Arc<AtomicUsize>,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl UnitOfWork for CountingUnit {
        fn name(&self) -> &'static str {
            "count"
        }

        async fn run(&self, _handle: &str, _args: &[serde_json::Value]) -> Result<()> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting_unit() -> (Arc<CountingUnit>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let unit = Arc::new(CountingUnit {
            runs: Arc::clone(&runs),
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::clone(&peak),
        });
        (unit, runs, peak)
    }

    #[tokio::test]
    async fn test_runs_all_items_within_concurrency() {
        let (unit, runs, peak) = counting_unit();
        let (queue, receiver) = LocalQueue::new(16);
        let pool = WorkerPool::new(receiver, UnitRegistry::new().register(unit), 2);
        let (_tx, shutdown) = watch::channel(false);

        for _ in 0..6 {
            queue.submit("count", vec![]).await.unwrap();
        }
        drop(queue);

        pool.run(shutdown).await;

        assert_eq!(runs.load(Ordering::SeqCst), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_unknown_unit_is_dropped() {
        let (unit, runs, _) = counting_unit();
        let (queue, receiver) = LocalQueue::new(4);
        let pool = WorkerPool::new(receiver, UnitRegistry::new().register(unit), 1);
        let (_tx, shutdown) = watch::channel(false);

        queue.submit("missing", vec![]).await.unwrap();
        queue.submit("count", vec![]).await.unwrap();
        drop(queue);

        pool.run(shutdown).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_pool() {
        let (unit, _, _) = counting_unit();
        let (_queue, receiver) = LocalQueue::new(4);
        let pool = WorkerPool::new(receiver, UnitRegistry::new().register(unit), 1);
        let (tx, shutdown) = watch::channel(false);

        let handle = tokio::spawn(pool.run(shutdown));
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
