//! Schedule-related API endpoints

use crate::TallyClient;
use crate::error::Result;
use tally_core::dto::schedule::{ScheduleRequest, ScheduleView};
use uuid::Uuid;

impl TallyClient {
    // =============================================================================
    // Schedule Management
    // =============================================================================

    /// Create a recurring schedule
    ///
    /// # Arguments
    /// * `req` - Operands, first run time and interval in seconds
    ///
    /// # Returns
    /// The created schedule with its task embedded
    pub async fn create_schedule(&self, req: ScheduleRequest) -> Result<ScheduleView> {
        let url = format!("{}/task-schedules", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Get a schedule by ID
    pub async fn get_schedule(&self, schedule_id: Uuid) -> Result<ScheduleView> {
        let url = format!("{}/task-schedules/{}", self.base_url, schedule_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List all schedules, newest first
    pub async fn list_schedules(&self) -> Result<Vec<ScheduleView>> {
        let url = format!("{}/task-schedules", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Replace the operands and timing of a schedule
    ///
    /// # Arguments
    /// * `schedule_id` - The schedule UUID
    /// * `req` - The full new definition
    ///
    /// # Returns
    /// The updated schedule
    pub async fn update_schedule(
        &self,
        schedule_id: Uuid,
        req: ScheduleRequest,
    ) -> Result<ScheduleView> {
        let url = format!("{}/task-schedules/{}", self.base_url, schedule_id);
        let response = self.client.put(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Delete a schedule along with its task
    pub async fn delete_schedule(&self, schedule_id: Uuid) -> Result<()> {
        let url = format!("{}/task-schedules/{}", self.base_url, schedule_id);
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
