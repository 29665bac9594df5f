//! Schedule Manager
//!
//! Keeps a schedule's trigger definitions (an interval and a periodic job)
//! in step with the schedule and its task. Every change that spans the task
//! store and the trigger store undoes its completed steps when a later step
//! fails, so no definition is left behind without its schedule.
//!
//! Interval definitions are shared between schedules with the same cadence.
//! The trigger store only retimes or deletes an interval atomically with the
//! check that no other job uses it, and a job's cadence is confirmed once the
//! job references its interval.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tally_core::domain::schedule::{ScheduledTask, TaskSchedule};
use tally_core::domain::task::Task;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::repository::{StoreError, TaskStore};
use crate::trigger::{
    ADD_UNIT, IntervalSchedule, NewPeriodicJob, PeriodicJob, TriggerError, TriggerStore,
    scheduled_job_name,
};
use crate::worker::add_args;

/// Attempts at binding a new job to an interval that keeps losing races.
const BIND_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule {0} not found")]
    NotFound(Uuid),

    #[error("interval must be at least 1 second, got {0}")]
    InvalidInterval(i64),

    #[error("failed to sync trigger definitions: {0}")]
    SchedulerSync(#[from] TriggerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

/// How an update moved the job's interval
enum IntervalChange {
    Unchanged,
    /// The interval was used only by this job and was retimed directly.
    InPlace { id: i64 },
    /// The job now points at another interval.
    Repointed { previous_id: i64, new_id: i64 },
}

impl IntervalChange {
    fn interval_id(&self, previous_id: i64) -> i64 {
        match *self {
            IntervalChange::Unchanged | IntervalChange::InPlace { .. } => previous_id,
            IntervalChange::Repointed { new_id, .. } => new_id,
        }
    }
}

pub struct ScheduleManager {
    store: Arc<dyn TaskStore>,
    triggers: Arc<dyn TriggerStore>,
}

impl ScheduleManager {
    pub fn new(store: Arc<dyn TaskStore>, triggers: Arc<dyn TriggerStore>) -> Self {
        Self { store, triggers }
    }

    /// Binds `task` to a new schedule firing every `interval` seconds from
    /// `scheduled_at`, and persists both.
    ///
    /// The job definition is created disabled and only enabled once the
    /// schedule is stored, so the beat never fires a job for a schedule that
    /// does not exist.
    pub async fn attach(
        &self,
        task: Task,
        scheduled_at: DateTime<Utc>,
        interval: i64,
    ) -> Result<ScheduledTask> {
        let mut scheduled = ScheduledTask::new(TaskSchedule::new(scheduled_at, interval), task);

        let (interval_def, job) = self
            .bind_new_job(&scheduled.task, scheduled_at, interval)
            .await?;

        scheduled.schedule.interval_schedule_id = Some(interval_def.id);
        scheduled.schedule.periodic_job_id = Some(job.id);

        if let Err(e) = self.store.create_scheduled_task(&scheduled).await {
            self.discard_job(job.id).await;
            self.release_interval(interval_def.id).await;
            return Err(e.into());
        }

        if let Err(e) = self.triggers.set_job_enabled(job.id, true).await {
            if let Err(cleanup) = self.store.delete_schedule(scheduled.schedule.id).await {
                warn!(
                    "Failed to remove schedule {} during rollback: {}",
                    scheduled.schedule.id, cleanup
                );
            }
            self.discard_job(job.id).await;
            self.release_interval(interval_def.id).await;
            return Err(e.into());
        }

        info!(
            "Attached schedule {} to task {} (job '{}', every {}s)",
            scheduled.schedule.id, scheduled.task.id, job.name, interval
        );
        Ok(scheduled)
    }

    /// Applies new operands and timing to a schedule, its task and its
    /// trigger definitions. Future firings use the new operands.
    ///
    /// When the store write fails the trigger definitions are restored.
    pub async fn resync(
        &self,
        current: ScheduledTask,
        a: i64,
        b: i64,
        scheduled_at: DateTime<Utc>,
        interval: i64,
    ) -> Result<ScheduledTask> {
        let job_id = current.schedule.periodic_job_id.ok_or_else(|| {
            TriggerError::Internal(format!(
                "schedule {} has no job definition",
                current.schedule.id
            ))
        })?;

        let previous_job = self
            .triggers
            .find_job(job_id)
            .await?
            .ok_or(TriggerError::JobNotFound(job_id))?;
        let previous_interval = self
            .triggers
            .find_interval(previous_job.interval_id)
            .await?
            .ok_or(TriggerError::IntervalNotFound(previous_job.interval_id))?;

        let mut updated = current;
        let now = Utc::now();
        updated.task.a = a;
        updated.task.b = b;
        updated.task.updated_at = now;
        updated.schedule.scheduled_at = scheduled_at;
        updated.schedule.interval = interval;
        updated.schedule.updated_at = now;

        let change = self
            .move_interval(&previous_interval, job_id, interval)
            .await?;
        let interval_id = change.interval_id(previous_interval.id);
        updated.schedule.interval_schedule_id = Some(interval_id);

        let job = PeriodicJob {
            interval_id,
            args: add_args(&updated.task),
            start_time: scheduled_at,
            ..previous_job.clone()
        };
        if let Err(e) = self.apply_job(&job, interval).await {
            self.restore(&previous_job, &previous_interval, &change).await;
            return Err(e.into());
        }

        if let Err(e) = self.store.update_scheduled_task(&updated).await {
            self.restore(&previous_job, &previous_interval, &change).await;
            return Err(e.into());
        }

        if let IntervalChange::Repointed { previous_id, .. } = change {
            self.release_interval(previous_id).await;
        }

        info!(
            "Resynced schedule {} (every {}s, a={}, b={})",
            updated.schedule.id, interval, a, b
        );
        Ok(updated)
    }

    /// Removes a schedule's trigger definitions: the job first, then the
    /// interval when no other job uses it. Definitions already gone are
    /// skipped, so a failed removal can simply be retried.
    pub async fn detach(&self, schedule: &TaskSchedule) -> Result<()> {
        if let Some(job_id) = schedule.periodic_job_id {
            if !self.triggers.delete_job(job_id).await? {
                debug!("Job definition {} already removed", job_id);
            }
        }

        if let Some(interval_id) = schedule.interval_schedule_id {
            if self.triggers.delete_unused_interval(interval_id).await? {
                debug!("Removed interval definition {}", interval_id);
            } else {
                debug!("Interval definition {} kept", interval_id);
            }
        }

        info!("Detached schedule {}", schedule.id);
        Ok(())
    }

    async fn bind_new_job(
        &self,
        task: &Task,
        scheduled_at: DateTime<Utc>,
        every: i64,
    ) -> std::result::Result<(IntervalSchedule, PeriodicJob), TriggerError> {
        let mut attempt = 1;
        loop {
            match self.try_bind_new_job(task, scheduled_at, every).await {
                Err(e) if e.is_interval_race() && attempt < BIND_ATTEMPTS => {
                    debug!("Retrying job definition for task {}: {}", task.id, e);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Creates a disabled job on the interval for `every` seconds.
    async fn try_bind_new_job(
        &self,
        task: &Task,
        scheduled_at: DateTime<Utc>,
        every: i64,
    ) -> std::result::Result<(IntervalSchedule, PeriodicJob), TriggerError> {
        let (interval_def, created) = self.triggers.get_or_create_interval(every).await?;
        if created {
            debug!("Created interval definition {} ({}s)", interval_def.id, every);
        }

        let new_job = NewPeriodicJob {
            name: scheduled_job_name(task.id),
            unit: ADD_UNIT.to_string(),
            args: add_args(task),
            interval_id: interval_def.id,
            start_time: scheduled_at,
            enabled: false,
        };
        let job = match self.triggers.create_job(new_job).await {
            Ok(job) => job,
            Err(e) => {
                self.release_interval(interval_def.id).await;
                return Err(e);
            }
        };

        // The interval may have been retimed before the job pinned it.
        if let Err(e) = self.check_cadence(interval_def.id, every).await {
            self.discard_job(job.id).await;
            self.release_interval(interval_def.id).await;
            return Err(e);
        }

        Ok((interval_def, job))
    }

    /// Saves `job` and confirms its interval still fires every `every` seconds.
    async fn apply_job(
        &self,
        job: &PeriodicJob,
        every: i64,
    ) -> std::result::Result<(), TriggerError> {
        self.triggers.update_job(job).await?;
        self.check_cadence(job.interval_id, every).await
    }

    async fn check_cadence(
        &self,
        interval_id: i64,
        every: i64,
    ) -> std::result::Result<(), TriggerError> {
        match self.triggers.find_interval(interval_id).await? {
            Some(found) if found.every == every => Ok(()),
            Some(_) => Err(TriggerError::IntervalChanged(interval_id)),
            None => Err(TriggerError::IntervalNotFound(interval_id)),
        }
    }

    async fn move_interval(
        &self,
        previous: &IntervalSchedule,
        job_id: i64,
        every: i64,
    ) -> std::result::Result<IntervalChange, TriggerError> {
        if previous.every == every {
            return Ok(IntervalChange::Unchanged);
        }

        if self
            .triggers
            .retime_interval(previous.id, job_id, every)
            .await?
        {
            return Ok(IntervalChange::InPlace { id: previous.id });
        }

        let (target, _) = self.triggers.get_or_create_interval(every).await?;
        Ok(IntervalChange::Repointed {
            previous_id: previous.id,
            new_id: target.id,
        })
    }

    /// Puts the job back the way it was before a failed resync. Best effort.
    async fn restore(
        &self,
        previous_job: &PeriodicJob,
        previous_interval: &IntervalSchedule,
        change: &IntervalChange,
    ) {
        let mut job = previous_job.clone();
        let restored_in_place = match *change {
            IntervalChange::Unchanged => true,
            IntervalChange::InPlace { id } => {
                match self
                    .triggers
                    .retime_interval(id, job.id, previous_interval.every)
                    .await
                {
                    Ok(restored) => restored,
                    Err(e) => {
                        warn!("Failed to restore interval definition {}: {}", id, e);
                        false
                    }
                }
            }
            IntervalChange::Repointed { .. } => false,
        };

        if !restored_in_place {
            match self
                .triggers
                .get_or_create_interval(previous_interval.every)
                .await
            {
                Ok((interval_def, _)) => job.interval_id = interval_def.id,
                Err(e) => warn!(
                    "Failed to find an interval of {}s for job {}: {}",
                    previous_interval.every, job.id, e
                ),
            }
        }

        if let Err(e) = self.triggers.update_job(&job).await {
            warn!("Failed to restore job definition {}: {}", job.id, e);
        }

        match *change {
            IntervalChange::Repointed { new_id, .. } => self.release_interval(new_id).await,
            IntervalChange::InPlace { id } if !restored_in_place => self.release_interval(id).await,
            _ => {}
        }
    }

    async fn discard_job(&self, job_id: i64) {
        if let Err(e) = self.triggers.delete_job(job_id).await {
            warn!("Failed to remove job definition {} during rollback: {}", job_id, e);
        }
    }

    /// Deletes the interval when no job references it any more.
    async fn release_interval(&self, interval_id: i64) {
        match self.triggers.delete_unused_interval(interval_id).await {
            Ok(true) => debug!("Removed interval definition {}", interval_id),
            Ok(false) => debug!("Interval definition {} still in use", interval_id),
            Err(e) => warn!(
                "Failed to release interval definition {} during rollback: {}",
                interval_id, e
            ),
        }
    }
}
