//! Schedule Service
//!
//! Business logic for recurring schedules. Trigger bookkeeping is delegated
//! to the [`ScheduleManager`].

use std::sync::Arc;
use tally_core::domain::schedule::ScheduledTask;
use tally_core::domain::task::Task;
use tally_core::dto::schedule::ScheduleRequest;
use uuid::Uuid;

use crate::repository::TaskStore;
use crate::service::schedule_manager::{Result, ScheduleError, ScheduleManager};

pub struct ScheduleService {
    store: Arc<dyn TaskStore>,
    manager: ScheduleManager,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn TaskStore>, manager: ScheduleManager) -> Self {
        Self { store, manager }
    }

    /// Create a schedule with a new task
    pub async fn create_schedule(&self, req: ScheduleRequest) -> Result<ScheduledTask> {
        validate_interval(req.interval)?;

        let task = Task::new(req.a, req.b);
        self.manager
            .attach(task, req.scheduled_at, req.interval)
            .await
    }

    /// Get a schedule by ID
    pub async fn get_schedule(&self, id: Uuid) -> Result<ScheduledTask> {
        self.store
            .get_schedule(id)
            .await?
            .ok_or(ScheduleError::NotFound(id))
    }

    /// List all schedules, newest first
    pub async fn list_schedules(&self) -> Result<Vec<ScheduledTask>> {
        Ok(self.store.list_schedules().await?)
    }

    /// Replace operands and timing of a schedule
    pub async fn update_schedule(&self, id: Uuid, req: ScheduleRequest) -> Result<ScheduledTask> {
        validate_interval(req.interval)?;

        let current = self.get_schedule(id).await?;
        self.manager
            .resync(current, req.a, req.b, req.scheduled_at, req.interval)
            .await
    }

    /// Delete a schedule, its task and the task's results
    pub async fn delete_schedule(&self, id: Uuid) -> Result<()> {
        let current = self.get_schedule(id).await?;

        self.manager.detach(&current.schedule).await?;

        if !self.store.delete_schedule(id).await? {
            return Err(ScheduleError::NotFound(id));
        }

        tracing::info!("Schedule deleted: {}", id);
        Ok(())
    }
}

fn validate_interval(interval: i64) -> Result<()> {
    if interval < 1 {
        return Err(ScheduleError::InvalidInterval(interval));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryTaskStore;
    use crate::trigger::{InMemoryTriggerStore, TriggerStore};
    use chrono::Utc;

    fn setup() -> (ScheduleService, Arc<InMemoryTaskStore>, Arc<InMemoryTriggerStore>) {
        let store = Arc::new(InMemoryTaskStore::new());
        let triggers = Arc::new(InMemoryTriggerStore::new());
        let manager = ScheduleManager::new(store.clone(), triggers.clone());
        (ScheduleService::new(store.clone(), manager), store, triggers)
    }

    fn request(a: i64, b: i64, interval: i64) -> ScheduleRequest {
        ScheduleRequest {
            a,
            b,
            scheduled_at: Utc::now(),
            interval,
        }
    }

    #[tokio::test]
    async fn test_rejects_non_positive_interval() {
        let (service, store, triggers) = setup();

        for interval in [0, -5] {
            let result = service.create_schedule(request(1, 2, interval)).await;
            assert!(matches!(result, Err(ScheduleError::InvalidInterval(_))));
        }
        assert!(store.list_schedules().await.unwrap().is_empty());
        assert!(triggers.intervals().is_empty());
    }

    #[tokio::test]
    async fn test_create_then_delete_cleans_up() {
        let (service, store, triggers) = setup();
        let created = service.create_schedule(request(5, 4, 50)).await.unwrap();

        assert_eq!(store.list_tasks().await.unwrap().len(), 1);
        assert_eq!(triggers.jobs().len(), 1);

        service.delete_schedule(created.schedule.id).await.unwrap();

        assert!(store.list_schedules().await.unwrap().is_empty());
        assert!(store.list_tasks().await.unwrap().is_empty());
        assert!(triggers.jobs().is_empty());
        assert!(triggers.intervals().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_schedule_is_not_found() {
        let (service, _, _) = setup();
        let id = Uuid::new_v4();

        assert!(matches!(
            service.get_schedule(id).await,
            Err(ScheduleError::NotFound(_))
        ));
        assert!(matches!(
            service.update_schedule(id, request(1, 1, 1)).await,
            Err(ScheduleError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_schedule(id).await,
            Err(ScheduleError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_rejects_bad_interval_before_touching_anything() {
        let (service, store, triggers) = setup();
        let created = service.create_schedule(request(5, 4, 10)).await.unwrap();

        let result = service
            .update_schedule(created.schedule.id, request(1, 1, 0))
            .await;
        assert!(matches!(result, Err(ScheduleError::InvalidInterval(0))));

        let stored = store.get_schedule(created.schedule.id).await.unwrap().unwrap();
        assert_eq!(stored.schedule.interval, 10);
        assert_eq!(triggers.intervals()[0].every, 10);
    }
}
