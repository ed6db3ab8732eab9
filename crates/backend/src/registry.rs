//! In-memory job registry.
//!
//! [`JobRegistry`] is the single source of truth for every job this
//! process has submitted. Callers only ever receive cloned snapshots;
//! records are mutated exclusively through the methods here, which keeps
//! the monotonic status rules in [`JobRecord::apply_status`] unbypassable.

use std::collections::HashMap;

use mosaic_core::error::CoreError;
use mosaic_core::job::{JobRecord, JobStatus, Transition};
use mosaic_core::types::JobId;
use tokio::sync::RwLock;

/// Keyed collection of job records.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a newly submitted job. Ids are unique; a duplicate is a
    /// [`CoreError::Conflict`] and leaves the existing record untouched.
    pub async fn insert(&self, record: JobRecord) -> Result<(), CoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&record.id) {
            return Err(CoreError::Conflict(format!(
                "Job {} is already registered",
                record.id
            )));
        }
        jobs.insert(record.id.clone(), record);
        Ok(())
    }

    /// Snapshot of a single job.
    pub async fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Snapshots of all jobs, oldest submission first.
    pub async fn list(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));
        jobs
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Apply a status to a job.
    ///
    /// Returns `None` when the id is unknown (e.g. the record was removed),
    /// otherwise the transition and the record as it stands afterwards.
    pub async fn apply_status(
        &self,
        job_id: &str,
        status: JobStatus,
    ) -> Option<(Transition, JobRecord)> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(job_id)?;
        let transition = record.apply_status(status);
        Some((transition, record.clone()))
    }

    /// Count a status check against a job. Returns the new count, or
    /// `None` if the job is unknown.
    pub async fn record_poll_attempt(&self, job_id: &str) -> Option<u32> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(job_id)?;
        record.record_poll_attempt();
        Some(record.poll_attempts)
    }

    /// Remove a job from display. Any poll result arriving afterwards for
    /// this id is discarded.
    pub async fn remove(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.write().await.remove(job_id)
    }
}
