//! Per-job status polling.
//!
//! [`PollScheduler`] spawns one task per non-terminal job. Each task runs
//! an explicit loop: wait, check the record is still live, ask the backend
//! for the job's status, then classify the answer:
//!
//! - **not found**: the backend has not indexed the job yet. The status is
//!   left alone and the job is polled again after the regular interval.
//!   There is no cap on these retries.
//! - **a status**: applied through the [`StatusReconciler`]. `RUNNING`
//!   polls again; a terminal status ends the loop.
//! - **anything else**: the job is forced to `FAILED` and the loop ends.
//!
//! The scheduler owns a map from job id to the task's
//! [`CancellationToken`]; at most one entry exists per job, and it is
//! dropped as soon as the loop ends. A loop that ends without the job
//! being terminal (removed, cancelled, or shut down) announces
//! [`JobEvent::PollingStopped`](crate::events::JobEvent::PollingStopped).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mosaic_core::job::JobStatus;
use mosaic_core::types::JobId;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::api::BackendError;
use crate::backend::ComputeBackend;
use crate::messages::StatusResponse;
use crate::reconciler::StatusReconciler;
use crate::registry::JobRegistry;

/// Delay before the first status check of a new job.
pub const DEFAULT_FIRST_POLL_DELAY: Duration = Duration::from_secs(3);

/// Delay between subsequent status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Timing of status checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub first_poll_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            first_poll_delay: DEFAULT_FIRST_POLL_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// How a single status check turned out.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// 404: the backend has not indexed the job yet.
    NotYetVisible,
    /// A well-formed status payload.
    Status(JobStatus),
    /// Transport error, malformed body, or unexpected HTTP status.
    Failure(String),
}

/// Classify the result of a status request.
pub fn classify(result: Result<StatusResponse, BackendError>) -> PollOutcome {
    match result {
        Ok(response) => PollOutcome::Status(response.status),
        Err(BackendError::NotFound { .. }) => PollOutcome::NotYetVisible,
        Err(e) => PollOutcome::Failure(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Bookkeeping for one job's poll task.
struct PollHandle {
    cancel: CancellationToken,
    /// Distinguishes this task from a later one for the same id.
    generation: u64,
}

/// Owns the poll tasks of all in-flight jobs.
pub struct PollScheduler {
    backend: Arc<dyn ComputeBackend>,
    registry: Arc<JobRegistry>,
    reconciler: Arc<StatusReconciler>,
    config: PollConfig,
    handles: Mutex<HashMap<JobId, PollHandle>>,
    next_generation: AtomicU64,
    /// Parent of every per-job token; cancelled on shutdown.
    cancel: CancellationToken,
}

impl PollScheduler {
    pub fn new(
        backend: Arc<dyn ComputeBackend>,
        registry: Arc<JobRegistry>,
        reconciler: Arc<StatusReconciler>,
        config: PollConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            registry,
            reconciler,
            config,
            handles: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Start polling a job. The first check happens after
    /// [`PollConfig::first_poll_delay`].
    ///
    /// Returns `false` without doing anything if the job is already being
    /// polled or the scheduler has been shut down.
    pub async fn schedule(self: &Arc<Self>, job_id: &str) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }

        let mut handles = self.handles.lock().await;
        if handles.contains_key(job_id) {
            tracing::debug!(job_id = %job_id, "Job already being polled");
            return false;
        }

        let cancel = self.cancel.child_token();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        handles.insert(
            job_id.to_string(),
            PollHandle {
                cancel: cancel.clone(),
                generation,
            },
        );
        drop(handles);

        let scheduler = Arc::clone(self);
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            scheduler.run_poll_loop(job_id, cancel, generation).await;
        });
        true
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop polling one job. Returns `false` if it was not being polled.
    pub async fn cancel(&self, job_id: &str) -> bool {
        let Some(handle) = self.handles.lock().await.remove(job_id) else {
            return false;
        };
        tracing::debug!(job_id = %job_id, "Cancelling poll task");
        handle.cancel.cancel();
        true
    }

    /// Whether a poll task is outstanding for `job_id`.
    pub async fn is_polling(&self, job_id: &str) -> bool {
        self.handles.lock().await.contains_key(job_id)
    }

    /// Number of jobs currently being polled.
    pub async fn active_count(&self) -> usize {
        self.handles.lock().await.len()
    }

    /// Stop every poll task. Used at process teardown only.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let mut handles = self.handles.lock().await;
        for (job_id, handle) in handles.drain() {
            tracing::debug!(job_id = %job_id, "Stopping poll task");
            handle.cancel.cancel();
        }
    }

    // ---- private helpers ----

    /// Poll one job until it is terminal, unknown, or cancelled.
    async fn run_poll_loop(&self, job_id: JobId, cancel: CancellationToken, generation: u64) {
        let mut delay = self.config.first_poll_delay;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            match self.registry.get(&job_id).await {
                Some(record) if !record.terminal() => {}
                Some(_) => break,
                None => {
                    tracing::debug!(job_id = %job_id, "Job no longer registered, polling stopped");
                    break;
                }
            }

            let attempt = self
                .registry
                .record_poll_attempt(&job_id)
                .await
                .unwrap_or_default();

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.backend.job_status(&job_id) => result,
            };

            match classify(result) {
                PollOutcome::NotYetVisible => {
                    tracing::debug!(
                        job_id = %job_id,
                        attempt,
                        "Job not yet visible on backend, retrying",
                    );
                }
                PollOutcome::Status(status) => {
                    tracing::debug!(job_id = %job_id, attempt, %status, "Job status polled");
                    if self.reconciler.apply(&job_id, status).await.is_settled() {
                        break;
                    }
                }
                PollOutcome::Failure(reason) => {
                    tracing::warn!(
                        job_id = %job_id,
                        attempt,
                        error = %reason,
                        "Status check failed, marking job as failed",
                    );
                    self.reconciler.force_fail(&job_id, &reason).await;
                    break;
                }
            }

            delay = self.config.poll_interval;
        }

        self.release(&job_id, generation).await;

        let settled = self
            .registry
            .get(&job_id)
            .await
            .is_some_and(|record| record.terminal());
        if !settled {
            self.reconciler.polling_stopped(&job_id);
        }
    }

    /// Drop and cancel the handle for `job_id` if it still belongs to the
    /// task identified by `generation`. Safe to call repeatedly.
    async fn release(&self, job_id: &str, generation: u64) {
        let mut handles = self.handles.lock().await;
        if handles
            .get(job_id)
            .is_some_and(|handle| handle.generation == generation)
        {
            if let Some(handle) = handles.remove(job_id) {
                handle.cancel.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timings() {
        let config = PollConfig::default();
        assert_eq!(config.first_poll_delay, Duration::from_secs(3));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn classify_not_found_as_not_yet_visible() {
        let outcome = classify(Err(BackendError::NotFound { detail: None }));
        assert_eq!(outcome, PollOutcome::NotYetVisible);
    }

    #[test]
    fn classify_status_payload() {
        let outcome = classify(Ok(StatusResponse {
            job_id: Some("J1".into()),
            status: JobStatus::Completed,
        }));
        assert_eq!(outcome, PollOutcome::Status(JobStatus::Completed));
    }

    #[test]
    fn classify_other_failures() {
        let api_error = classify(Err(BackendError::Api {
            status: 500,
            detail: None,
        }));
        assert!(matches!(api_error, PollOutcome::Failure(_)));

        let decode = serde_json::from_str::<StatusResponse>("{").unwrap_err();
        assert!(matches!(
            classify(Err(BackendError::Decode(decode))),
            PollOutcome::Failure(_)
        ));

        let transport = reqwest::Client::new().get("not a url").build().unwrap_err();
        assert!(matches!(
            classify(Err(BackendError::Request(transport))),
            PollOutcome::Failure(_)
        ));
    }
}
