//! In-memory decay scheduler: one worker fed by a queue and an optional fixed interval, job state in a map.

use crate::{DecayScheduler, SchedulerError, WeightModel};
use async_trait::async_trait;
use chrono::Utc;
use social_types::{JobStatus, SweepJob};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use uuid::Uuid;

/// Finished jobs beyond this count are evicted oldest-first.
const MAX_RETAINED_JOBS: usize = 1024;

#[derive(Default)]
struct JobTable {
    jobs: HashMap<String, SweepJob>,
    order: VecDeque<String>,
}

impl JobTable {
    fn insert(&mut self, job: SweepJob) {
        self.order.push_back(job.job_id.clone());
        self.jobs.insert(job.job_id.clone(), job);
        while self.order.len() > MAX_RETAINED_JOBS {
            let Some(oldest) = self.order.front().cloned() else {
                break;
            };
            let finished = self
                .jobs
                .get(&oldest)
                .map_or(true, |j| matches!(j.status, JobStatus::Done | JobStatus::Failed));
            if !finished {
                break;
            }
            self.order.pop_front();
            self.jobs.remove(&oldest);
        }
    }
}

fn new_job() -> SweepJob {
    let now = Utc::now().to_rfc3339();
    SweepJob {
        job_id: Uuid::new_v4().to_string(),
        status: JobStatus::Pending,
        created_at: now.clone(),
        updated_at: now,
        edges_decayed: None,
        error: None,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// In-memory scheduler: on-demand sweeps are queued, periodic sweeps are raised by the worker itself.
/// Only the worker calls `WeightModel::apply_global_decay`, so sweeps never overlap.
pub struct InMemoryDecayScheduler {
    jobs: Arc<RwLock<JobTable>>,
    tx: mpsc::UnboundedSender<String>,
}

impl InMemoryDecayScheduler {
    /// Create scheduler and spawn worker. With `interval = None` only on-demand sweeps run.
    pub fn new(model: Arc<WeightModel>, interval: Option<Duration>) -> Self {
        let jobs: Arc<RwLock<JobTable>> = Arc::new(RwLock::new(JobTable::default()));
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let jobs_clone = Arc::clone(&jobs);
        tokio::spawn(async move {
            let mut ticker = interval.filter(|p| !p.is_zero()).map(|period| {
                let mut t = tokio::time::interval_at(Instant::now() + period, period);
                t.set_missed_tick_behavior(MissedTickBehavior::Delay);
                t
            });
            loop {
                let job_id = tokio::select! {
                    msg = rx.recv() => match msg {
                        Some(job_id) => job_id,
                        None => break,
                    },
                    _ = next_tick(&mut ticker) => {
                        let job = new_job();
                        let job_id = job.job_id.clone();
                        jobs_clone.write().await.insert(job);
                        tracing::debug!(job_id = %job_id, "periodic decay sweep due");
                        job_id
                    }
                };

                {
                    let mut guard = jobs_clone.write().await;
                    if let Some(job) = guard.jobs.get_mut(&job_id) {
                        job.status = JobStatus::Running;
                        job.updated_at = Utc::now().to_rfc3339();
                    }
                }
                let result = model.apply_global_decay().await;
                let mut guard = jobs_clone.write().await;
                if let Some(job) = guard.jobs.get_mut(&job_id) {
                    job.updated_at = Utc::now().to_rfc3339();
                    match result {
                        Ok(touched) => {
                            job.status = JobStatus::Done;
                            job.edges_decayed = Some(touched);
                        }
                        Err(e) => {
                            tracing::warn!(job_id = %job_id, error = %e, "decay sweep failed");
                            job.status = JobStatus::Failed;
                            job.error = Some(e.to_string());
                        }
                    }
                }
            }
            tracing::debug!("decay worker stopped");
        });

        Self { jobs, tx }
    }
}

#[async_trait]
impl DecayScheduler for InMemoryDecayScheduler {
    async fn submit_sweep(&self) -> Result<String, SchedulerError> {
        let job = new_job();
        let job_id = job.job_id.clone();
        self.jobs.write().await.insert(job);
        self.tx
            .send(job_id.clone())
            .map_err(|_| SchedulerError::Other("worker channel closed".to_string()))?;
        Ok(job_id)
    }

    async fn get_status(&self, job_id: &str) -> Result<Option<SweepJob>, SchedulerError> {
        let guard = self.jobs.read().await;
        Ok(guard.jobs.get(job_id).cloned())
    }
}
