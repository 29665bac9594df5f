use std::sync::Arc;

use crate::queue::WorkQueue;
use crate::repository::TaskStore;
use crate::service::{ScheduleManager, ScheduleService, TaskService};
use crate::trigger::TriggerStore;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<TaskService>,
    pub schedules: Arc<ScheduleService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TaskStore>,
        triggers: Arc<dyn TriggerStore>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        let manager = ScheduleManager::new(Arc::clone(&store), triggers);
        Self {
            tasks: Arc::new(TaskService::new(Arc::clone(&store), queue)),
            schedules: Arc::new(ScheduleService::new(store, manager)),
        }
    }
}
