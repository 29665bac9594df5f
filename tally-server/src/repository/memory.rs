//! In-memory [`TaskStore`]
//!
//! Keeps all records behind one mutex, so every operation is atomic with
//! respect to every other. Used for `STORAGE_BACKEND=memory` and in tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tally_core::domain::schedule::{ScheduledTask, TaskSchedule};
use tally_core::domain::task::{Task, TaskResult};
use uuid::Uuid;

use super::{Result, StoreError, TaskStore};

#[derive(Default)]
struct MemoryState {
    tasks: HashMap<Uuid, Task>,
    task_order: Vec<Uuid>,
    results: HashMap<Uuid, Vec<TaskResult>>,
    schedules: HashMap<Uuid, TaskSchedule>,
    schedule_order: Vec<Uuid>,
}

impl MemoryState {
    fn insert_task(&mut self, task: Task) {
        self.task_order.push(task.id);
        self.tasks.insert(task.id, task);
    }

    fn task_mut(&mut self, id: Uuid) -> Result<&mut Task> {
        self.tasks.get_mut(&id).ok_or(StoreError::TaskNotFound(id))
    }

    fn scheduled_task(&self, schedule_id: Uuid) -> Option<ScheduledTask> {
        let schedule = self.schedules.get(&schedule_id)?;
        let task = self
            .tasks
            .values()
            .find(|t| t.schedule_id == Some(schedule_id))?;

        Some(ScheduledTask {
            schedule: schedule.clone(),
            task: task.clone(),
        })
    }
}

/// Task store that lives in process memory
#[derive(Default)]
pub struct InMemoryTaskStore {
    state: Mutex<MemoryState>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| StoreError::Internal(format!("Failed to lock task store: {}", e)))
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(&self, a: i64, b: i64) -> Result<Task> {
        let task = Task::new(a, b);
        self.lock()?.insert_task(task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.lock()?.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let state = self.lock()?;
        Ok(state
            .task_order
            .iter()
            .rev()
            .filter_map(|id| state.tasks.get(id).cloned())
            .collect())
    }

    async fn record_dispatch(&self, id: Uuid, worker_handle: &str) -> Result<()> {
        let mut state = self.lock()?;
        let task = state.task_mut(id)?;
        task.worker_handle = Some(worker_handle.to_string());
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn record_success(&self, id: Uuid, value: i64) -> Result<()> {
        let mut state = self.lock()?;
        state.task_mut(id)?.mark_succeeded();
        state.results.entry(id).or_default().push(TaskResult {
            result: value,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn record_failure(&self, id: Uuid, message: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.task_mut(id)?.mark_failed(message);
        Ok(())
    }

    async fn list_results(&self, task_id: Uuid) -> Result<Vec<TaskResult>> {
        let state = self.lock()?;
        Ok(state
            .results
            .get(&task_id)
            .map(|results| results.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_scheduled_task(&self, scheduled: &ScheduledTask) -> Result<()> {
        let mut state = self.lock()?;

        if state.schedules.contains_key(&scheduled.schedule.id)
            || state.tasks.contains_key(&scheduled.task.id)
        {
            return Err(StoreError::Internal(format!(
                "Schedule {} or task {} already exists",
                scheduled.schedule.id, scheduled.task.id
            )));
        }

        state.schedule_order.push(scheduled.schedule.id);
        state
            .schedules
            .insert(scheduled.schedule.id, scheduled.schedule.clone());
        state.insert_task(scheduled.task.clone());
        Ok(())
    }

    async fn get_schedule(&self, id: Uuid) -> Result<Option<ScheduledTask>> {
        Ok(self.lock()?.scheduled_task(id))
    }

    async fn list_schedules(&self) -> Result<Vec<ScheduledTask>> {
        let state = self.lock()?;
        Ok(state
            .schedule_order
            .iter()
            .rev()
            .filter_map(|id| state.scheduled_task(*id))
            .collect())
    }

    async fn update_scheduled_task(&self, scheduled: &ScheduledTask) -> Result<()> {
        let ScheduledTask { schedule, task } = scheduled;
        let mut state = self.lock()?;

        if !state.schedules.contains_key(&schedule.id) {
            return Err(StoreError::ScheduleNotFound(schedule.id));
        }
        let stored = state.task_mut(task.id)?;
        stored.a = task.a;
        stored.b = task.b;
        stored.updated_at = task.updated_at;

        state.schedules.insert(schedule.id, schedule.clone());
        Ok(())
    }

    async fn delete_schedule(&self, id: Uuid) -> Result<bool> {
        let mut state = self.lock()?;

        if state.schedules.remove(&id).is_none() {
            return Ok(false);
        }
        state.schedule_order.retain(|s| *s != id);

        let owned: Vec<Uuid> = state
            .tasks
            .values()
            .filter(|t| t.schedule_id == Some(id))
            .map(|t| t.id)
            .collect();
        for task_id in owned {
            state.tasks.remove(&task_id);
            state.results.remove(&task_id);
            state.task_order.retain(|t| *t != task_id);
        }

        Ok(true)
    }
}
