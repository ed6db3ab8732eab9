//! Job engine facade.
//!
//! [`MosaicEngine`] wires the registry, reconciler, poll scheduler and
//! submitter around one [`ComputeBackend`]. It is created once at startup
//! via [`MosaicEngine::start`]; the returned `Arc` can be cloned freely.
//!
//! Job lifecycle events are broadcast via a [`tokio::sync::broadcast`]
//! channel. Call [`MosaicEngine::subscribe`] to receive them.

use std::sync::Arc;

use mosaic_core::job::JobRecord;
use mosaic_core::naming::resolve_download;
use mosaic_core::params::GenerationParams;
use mosaic_core::route::{RouteCapture, RouteSnapshot};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::api::BackendError;
use crate::backend::ComputeBackend;
use crate::events::JobEvent;
use crate::reconciler::StatusReconciler;
use crate::registry::JobRegistry;
use crate::scheduler::{PollConfig, PollScheduler};
use crate::submitter::{JobSubmitter, SubmitError, DEFAULT_DATA_CREDITS};

/// Broadcast channel capacity for job events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub poll: PollConfig,
    /// Attribution string sent with every generation request.
    pub data_credits: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            data_credits: DEFAULT_DATA_CREDITS.to_string(),
        }
    }
}

/// Submits generation jobs and tracks them to completion.
pub struct MosaicEngine {
    backend: Arc<dyn ComputeBackend>,
    registry: Arc<JobRegistry>,
    scheduler: Arc<PollScheduler>,
    submitter: JobSubmitter,
    event_tx: broadcast::Sender<JobEvent>,
}

impl MosaicEngine {
    /// Build an engine around `backend`.
    pub fn start(backend: Arc<dyn ComputeBackend>, config: EngineConfig) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let registry = Arc::new(JobRegistry::new());
        let reconciler = Arc::new(StatusReconciler::new(
            Arc::clone(&registry),
            event_tx.clone(),
            backend.api_url(),
        ));
        let scheduler = PollScheduler::new(
            Arc::clone(&backend),
            Arc::clone(&registry),
            reconciler,
            config.poll,
        );
        let submitter = JobSubmitter::new(
            Arc::clone(&backend),
            Arc::clone(&registry),
            Arc::clone(&scheduler),
            event_tx.clone(),
            config.data_credits,
        );

        tracing::info!(
            api_url = %backend.api_url(),
            first_poll_ms = config.poll.first_poll_delay.as_millis() as u64,
            poll_interval_ms = config.poll.poll_interval.as_millis() as u64,
            "Mosaic engine started",
        );

        Arc::new(Self {
            backend,
            registry,
            scheduler,
            submitter,
            event_tx,
        })
    }

    /// Subscribe to job lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &Arc<PollScheduler> {
        &self.scheduler
    }

    /// Look up the route for the captured endpoints and attach it.
    ///
    /// Does nothing and returns `Ok(false)` unless two points are
    /// captured.
    pub async fn lookup_route(&self, capture: &mut RouteCapture) -> Result<bool, BackendError> {
        let Some(endpoints) = capture.endpoints() else {
            return Ok(false);
        };
        let route = self.backend.lookup_route(&endpoints).await?;
        tracing::info!(links = route.link_ids.len(), "Route lookup complete");
        match capture.attach_route(route) {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::warn!(error = %e, "Route lookup returned an unusable route");
                Ok(false)
            }
        }
    }

    /// Submit a generation request with explicit snapshots.
    pub async fn submit(
        &self,
        route: Option<&RouteSnapshot>,
        params: &GenerationParams,
    ) -> Result<JobRecord, SubmitError> {
        self.submitter.submit(route, params).await
    }

    /// Submit a generation request for the captured route.
    ///
    /// On failure the capture is reset so the user can pick a route and
    /// try again.
    pub async fn submit_from_capture(
        &self,
        capture: &mut RouteCapture,
        params: &GenerationParams,
    ) -> Result<JobRecord, SubmitError> {
        let result = self.submitter.submit(capture.route(), params).await;
        if result.is_err() {
            capture.reset();
        }
        result
    }

    /// Snapshot of one job.
    pub async fn job(&self, job_id: &str) -> Option<JobRecord> {
        self.registry.get(job_id).await
    }

    /// Snapshots of all jobs, oldest first.
    pub async fn jobs(&self) -> Vec<JobRecord> {
        self.registry.list().await
    }

    /// Download location of a completed job's artifact.
    pub async fn download_url(&self, job_id: &str) -> Option<String> {
        let job = self.registry.get(job_id).await?;
        resolve_download(self.backend.api_url(), &job)
    }

    /// Remove a job from the registry and stop polling it. A status
    /// request already in flight is abandoned.
    pub async fn remove(&self, job_id: &str) -> Option<JobRecord> {
        let removed = self.registry.remove(job_id).await;
        self.scheduler.cancel(job_id).await;
        removed
    }

    /// Wait until `job_id` is terminal and return its final record.
    ///
    /// Returns `None` if the job is unknown, or if polling for it ends
    /// without a terminal status (the job was removed or the engine shut
    /// down).
    pub async fn wait_for_terminal(&self, job_id: &str) -> Option<JobRecord> {
        let mut rx = self.subscribe();
        loop {
            let job = self.registry.get(job_id).await?;
            if job.terminal() {
                return Some(job);
            }
            if !self.scheduler.is_polling(job_id).await {
                // The loop may have settled the job between the two reads.
                return self.terminal_record(job_id).await;
            }
            match rx.recv().await {
                Ok(event) if event.job_id() == job_id && event.ends_tracking() => {
                    return self.terminal_record(job_id).await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Job event receiver lagged, re-reading registry");
                }
                Err(RecvError::Closed) => return self.terminal_record(job_id).await,
            }
        }
    }

    /// Stop all polling. Job records stay readable; later submissions are
    /// refused.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down mosaic engine");
        self.scheduler.shutdown().await;
    }

    // ---- private helpers ----

    async fn terminal_record(&self, job_id: &str) -> Option<JobRecord> {
        self.registry.get(job_id).await.filter(JobRecord::terminal)
    }
}
