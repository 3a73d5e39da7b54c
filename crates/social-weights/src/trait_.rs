//! Decay scheduler trait: submit a sweep job, get its status.

use async_trait::async_trait;
use social_types::SweepJob;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler error: {0}")]
    Other(String),
}

/// Owner of global decay sweeps. Sweeps run on a fixed interval and on demand.
///
/// Contract: `get_status` returns `Ok(None)` when the job_id is unknown. The API layer maps
/// `Ok(None)` to 404.
#[async_trait]
pub trait DecayScheduler: Send + Sync {
    /// Queue an on-demand sweep; returns job_id.
    async fn submit_sweep(&self) -> Result<String, SchedulerError>;

    /// Current status of a sweep job (on-demand or periodic).
    async fn get_status(&self, job_id: &str) -> Result<Option<SweepJob>, SchedulerError>;
}
