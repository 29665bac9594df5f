//! Beat
//!
//! Fires periodic job definitions. A job is due once its start time has
//! passed and either it never ran or a full interval has elapsed since its
//! last run.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::queue::WorkQueue;
use crate::trigger::{IntervalSchedule, PeriodicJob, TriggerError, TriggerStore};

/// Whether `job` should fire at `now`
pub fn is_due(job: &PeriodicJob, interval: &IntervalSchedule, now: DateTime<Utc>) -> bool {
    if !job.enabled || now < job.start_time {
        return false;
    }

    match job.last_run_at {
        None => true,
        Some(last) => now - last >= interval.as_duration(),
    }
}

/// Periodic ticker submitting due jobs
pub struct Beat {
    triggers: Arc<dyn TriggerStore>,
    queue: Arc<dyn WorkQueue>,
    tick: Duration,
}

impl Beat {
    pub fn new(triggers: Arc<dyn TriggerStore>, queue: Arc<dyn WorkQueue>, tick: Duration) -> Self {
        Self {
            triggers,
            queue,
            tick,
        }
    }

    /// Ticks until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting beat (tick: {:?})", self.tick);

        let mut interval = time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match self.tick_once(Utc::now()).await {
                Ok(fired) if fired > 0 => debug!("Beat fired {} job(s)", fired),
                Ok(_) => {}
                Err(e) => error!("Error during beat tick: {}", e),
            }
        }

        info!("Beat stopped");
    }

    /// Submits every job due at `now`. Returns how many were submitted.
    pub async fn tick_once(&self, now: DateTime<Utc>) -> Result<usize, TriggerError> {
        let jobs = self.triggers.list_enabled_jobs().await?;
        let mut fired = 0;

        for (job, interval) in jobs {
            if !is_due(&job, &interval, now) {
                continue;
            }

            match self.queue.submit(&job.unit, job.args.clone()).await {
                Ok(handle) => {
                    info!("Fired job '{}' as {}", job.name, handle);
                    self.triggers.record_run(job.id, now).await?;
                    fired += 1;
                }
                Err(e) => {
                    // Left due, so the next tick retries it.
                    warn!("Failed to submit job '{}': {}", job.name, e);
                }
            }
        }

        Ok(fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{QueueError, WorkerHandle};
    use crate::trigger::{ADD_UNIT, InMemoryTriggerStore, IntervalPeriod, NewPeriodicJob};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingQueue {
        submitted: Mutex<Vec<(String, Vec<serde_json::Value>)>>,
        reject: bool,
    }

    #[async_trait]
    impl WorkQueue for RecordingQueue {
        async fn submit(
            &self,
            unit: &str,
            args: Vec<serde_json::Value>,
        ) -> Result<WorkerHandle, QueueError> {
            if self.reject {
                return Err(QueueError::Full);
            }
            self.submitted.lock().unwrap().push((unit.to_string(), args));
            Ok("handle".to_string())
        }
    }

    fn job(start_time: DateTime<Utc>, last_run_at: Option<DateTime<Utc>>) -> PeriodicJob {
        PeriodicJob {
            id: 1,
            name: "job".to_string(),
            unit: ADD_UNIT.to_string(),
            args: vec![],
            interval_id: 1,
            start_time,
            enabled: true,
            last_run_at,
            total_run_count: 0,
            changed_at: start_time,
        }
    }

    fn every(seconds: i64) -> IntervalSchedule {
        IntervalSchedule {
            id: 1,
            every: seconds,
            period: IntervalPeriod::Seconds,
        }
    }

    #[test]
    fn test_not_due_before_start() {
        let now = Utc::now();
        let job = job(now + chrono::Duration::seconds(5), None);
        assert!(!is_due(&job, &every(10), now));
    }

    #[test]
    fn test_due_at_start_when_never_run() {
        let now = Utc::now();
        assert!(is_due(&job(now, None), &every(10), now));
    }

    #[test]
    fn test_due_after_full_interval() {
        let now = Utc::now();
        let start = now - chrono::Duration::seconds(60);

        let recent = job(start, Some(now - chrono::Duration::seconds(9)));
        assert!(!is_due(&recent, &every(10), now));

        let stale = job(start, Some(now - chrono::Duration::seconds(10)));
        assert!(is_due(&stale, &every(10), now));
    }

    #[test]
    fn test_disabled_never_due() {
        let now = Utc::now();
        let mut job = job(now, None);
        job.enabled = false;
        assert!(!is_due(&job, &every(10), now));
    }

    async fn store_with_job(start_time: DateTime<Utc>) -> (Arc<InMemoryTriggerStore>, i64) {
        let triggers = Arc::new(InMemoryTriggerStore::new());
        let (interval, _) = triggers.get_or_create_interval(10).await.unwrap();
        let job = triggers
            .create_job(NewPeriodicJob {
                name: "task-x-scheduled".to_string(),
                unit: ADD_UNIT.to_string(),
                args: vec![json!("x"), json!(1), json!(2)],
                interval_id: interval.id,
                start_time,
                enabled: true,
            })
            .await
            .unwrap();
        (triggers, job.id)
    }

    #[tokio::test]
    async fn test_tick_submits_due_job_once_per_interval() {
        let now = Utc::now();
        let (triggers, job_id) = store_with_job(now).await;
        let queue = Arc::new(RecordingQueue::default());
        let beat = Beat::new(triggers.clone(), queue.clone(), Duration::from_secs(1));

        assert_eq!(beat.tick_once(now).await.unwrap(), 1);
        assert_eq!(
            beat.tick_once(now + chrono::Duration::seconds(5))
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            beat.tick_once(now + chrono::Duration::seconds(10))
                .await
                .unwrap(),
            1
        );

        let submitted = queue.submitted.lock().unwrap().clone();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].0, ADD_UNIT);
        assert_eq!(submitted[0].1, vec![json!("x"), json!(1), json!(2)]);

        let job = triggers.find_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.total_run_count, 2);
    }

    #[tokio::test]
    async fn test_rejected_submission_is_retried() {
        let now = Utc::now();
        let (triggers, job_id) = store_with_job(now).await;
        let queue = Arc::new(RecordingQueue {
            reject: true,
            ..Default::default()
        });
        let beat = Beat::new(triggers.clone(), queue, Duration::from_secs(1));

        assert_eq!(beat.tick_once(now).await.unwrap(), 0);

        let job = triggers.find_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.total_run_count, 0);
        assert!(job.last_run_at.is_none());
    }
}
