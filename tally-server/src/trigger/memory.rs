//! In-memory [`TriggerStore`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{
    IntervalPeriod, IntervalSchedule, NewPeriodicJob, PeriodicJob, Result, TriggerError,
    TriggerStore,
};

#[derive(Default)]
struct TriggerState {
    next_interval_id: i64,
    next_job_id: i64,
    intervals: BTreeMap<i64, IntervalSchedule>,
    jobs: BTreeMap<i64, PeriodicJob>,
}

/// Trigger store that lives in process memory
#[derive(Default)]
pub struct InMemoryTriggerStore {
    state: Mutex<TriggerState>,
}

impl InMemoryTriggerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, TriggerState>> {
        self.state
            .lock()
            .map_err(|e| TriggerError::Internal(format!("Failed to lock trigger store: {}", e)))
    }
}

#[cfg(test)]
impl InMemoryTriggerStore {
    pub fn intervals(&self) -> Vec<IntervalSchedule> {
        self.lock().unwrap().intervals.values().cloned().collect()
    }

    pub fn jobs(&self) -> Vec<PeriodicJob> {
        self.lock().unwrap().jobs.values().cloned().collect()
    }
}

#[async_trait]
impl TriggerStore for InMemoryTriggerStore {
    async fn get_or_create_interval(&self, every: i64) -> Result<(IntervalSchedule, bool)> {
        let mut state = self.lock()?;

        if let Some(existing) = state.intervals.values().find(|i| i.every == every) {
            return Ok((existing.clone(), false));
        }

        state.next_interval_id += 1;
        let interval = IntervalSchedule {
            id: state.next_interval_id,
            every,
            period: IntervalPeriod::Seconds,
        };
        state.intervals.insert(interval.id, interval.clone());
        Ok((interval, true))
    }

    async fn find_interval(&self, id: i64) -> Result<Option<IntervalSchedule>> {
        Ok(self.lock()?.intervals.get(&id).cloned())
    }

    async fn retime_interval(&self, id: i64, job_id: i64, every: i64) -> Result<bool> {
        let mut state = self.lock()?;

        if !state.intervals.contains_key(&id) {
            return Err(TriggerError::IntervalNotFound(id));
        }
        let shared = state
            .jobs
            .values()
            .any(|job| job.interval_id == id && job.id != job_id);
        let taken = state
            .intervals
            .values()
            .any(|i| i.id != id && i.every == every);
        if shared || taken {
            return Ok(false);
        }

        if let Some(interval) = state.intervals.get_mut(&id) {
            interval.every = every;
        }
        Ok(true)
    }

    async fn delete_unused_interval(&self, id: i64) -> Result<bool> {
        let mut state = self.lock()?;
        if state.jobs.values().any(|job| job.interval_id == id) {
            return Ok(false);
        }
        Ok(state.intervals.remove(&id).is_some())
    }

    async fn create_job(&self, job: NewPeriodicJob) -> Result<PeriodicJob> {
        let mut state = self.lock()?;

        if !state.intervals.contains_key(&job.interval_id) {
            return Err(TriggerError::IntervalNotFound(job.interval_id));
        }
        if state.jobs.values().any(|j| j.name == job.name) {
            return Err(TriggerError::DuplicateJobName(job.name));
        }

        state.next_job_id += 1;
        let job = PeriodicJob {
            id: state.next_job_id,
            name: job.name,
            unit: job.unit,
            args: job.args,
            interval_id: job.interval_id,
            start_time: job.start_time,
            enabled: job.enabled,
            last_run_at: None,
            total_run_count: 0,
            changed_at: Utc::now(),
        };
        state.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_job(&self, id: i64) -> Result<Option<PeriodicJob>> {
        Ok(self.lock()?.jobs.get(&id).cloned())
    }

    async fn update_job(&self, job: &PeriodicJob) -> Result<()> {
        let mut state = self.lock()?;

        if !state.intervals.contains_key(&job.interval_id) {
            return Err(TriggerError::IntervalNotFound(job.interval_id));
        }
        let stored = state
            .jobs
            .get_mut(&job.id)
            .ok_or(TriggerError::JobNotFound(job.id))?;
        stored.interval_id = job.interval_id;
        stored.args = job.args.clone();
        stored.start_time = job.start_time;
        stored.enabled = job.enabled;
        stored.changed_at = Utc::now();
        Ok(())
    }

    async fn set_job_enabled(&self, id: i64, enabled: bool) -> Result<()> {
        let mut state = self.lock()?;
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or(TriggerError::JobNotFound(id))?;
        job.enabled = enabled;
        job.changed_at = Utc::now();
        Ok(())
    }

    async fn delete_job(&self, id: i64) -> Result<bool> {
        Ok(self.lock()?.jobs.remove(&id).is_some())
    }

    async fn list_enabled_jobs(&self) -> Result<Vec<(PeriodicJob, IntervalSchedule)>> {
        let state = self.lock()?;
        Ok(state
            .jobs
            .values()
            .filter(|job| job.enabled)
            .filter_map(|job| {
                state
                    .intervals
                    .get(&job.interval_id)
                    .map(|interval| (job.clone(), interval.clone()))
            })
            .collect())
    }

    async fn record_run(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.lock()?;
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or(TriggerError::JobNotFound(id))?;
        job.last_run_at = Some(at);
        job.total_run_count += 1;
        Ok(())
    }
}
