//! Generation request submission.
//!
//! [`JobSubmitter::submit`] validates the route and parameter snapshots,
//! sends exactly one generation request, and on success registers the
//! job and hands it to the [`PollScheduler`]. Nothing is registered or
//! scheduled when any step fails.

use std::sync::Arc;

use mosaic_core::error::CoreError;
use mosaic_core::job::{JobRecord, JobStatus};
use mosaic_core::params::GenerationParams;
use mosaic_core::route::RouteSnapshot;
use tokio::sync::broadcast;

use crate::api::BackendError;
use crate::backend::ComputeBackend;
use crate::events::JobEvent;
use crate::messages::GenerateRequest;
use crate::registry::JobRegistry;
use crate::scheduler::PollScheduler;

/// Attribution rendered onto every artifact unless configured otherwise.
pub const DEFAULT_DATA_CREDITS: &str = "Data: TomTom + OSM";

/// Shown when the backend rejects a request without a `detail`.
const GENERIC_SUBMISSION_ERROR: &str = "Generation request was rejected by the backend";

/// Returned for submissions made after the engine shut down.
pub const SHUT_DOWN_ERROR: &str = "Job engine has shut down; no new jobs are accepted";

/// Errors surfaced to the user when a generation request cannot be made.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The route or parameters are not usable; no request was sent.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The backend rejected the request.
    #[error("Submission rejected: {0}")]
    Submission(String),

    /// No response was obtained from the backend.
    #[error("Network error: {0}")]
    Network(String),
}

impl From<CoreError> for SubmitError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(msg) => SubmitError::Validation(msg),
            other => SubmitError::Submission(other.to_string()),
        }
    }
}

impl From<BackendError> for SubmitError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Request(e) => SubmitError::Network(e.to_string()),
            BackendError::NotFound { detail } | BackendError::Api { detail, .. } => {
                SubmitError::Submission(
                    detail.unwrap_or_else(|| GENERIC_SUBMISSION_ERROR.to_string()),
                )
            }
            other => SubmitError::Submission(other.to_string()),
        }
    }
}

/// Sends generation requests and starts tracking accepted jobs.
pub struct JobSubmitter {
    backend: Arc<dyn ComputeBackend>,
    registry: Arc<JobRegistry>,
    scheduler: Arc<PollScheduler>,
    event_tx: broadcast::Sender<JobEvent>,
    data_credits: String,
}

impl JobSubmitter {
    pub fn new(
        backend: Arc<dyn ComputeBackend>,
        registry: Arc<JobRegistry>,
        scheduler: Arc<PollScheduler>,
        event_tx: broadcast::Sender<JobEvent>,
        data_credits: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            registry,
            scheduler,
            event_tx,
            data_credits: data_credits.into(),
        }
    }

    /// Submit a generation request for `route` with `params`.
    ///
    /// `route` is `None` while no route has been looked up; that, an
    /// invalid route, or invalid parameters fail with
    /// [`SubmitError::Validation`] before any request is sent.
    ///
    /// On success the returned record is `RUNNING` with zero poll
    /// attempts, and its first status check is scheduled. After shutdown
    /// every submission fails with [`SubmitError::Submission`] and nothing
    /// is registered.
    pub async fn submit(
        &self,
        route: Option<&RouteSnapshot>,
        params: &GenerationParams,
    ) -> Result<JobRecord, SubmitError> {
        let route = route.ok_or_else(|| {
            SubmitError::Validation(
                "Select a route and run the route lookup before generating".to_string(),
            )
        })?;
        route.validate()?;
        params.validate()?;
        if self.scheduler.is_shut_down() {
            return Err(SubmitError::Submission(SHUT_DOWN_ERROR.to_string()));
        }

        let request = GenerateRequest {
            route_link_ids: route.link_ids.clone(),
            route_geojson: route.geojson.clone(),
            params: params
                .to_payload()
                .map_err(|e| SubmitError::Validation(e.to_string()))?,
            data_credits: self.data_credits.clone(),
        };

        let response = self.backend.submit(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "Generation request failed");
            SubmitError::from(e)
        })?;

        if response.status != JobStatus::Running {
            tracing::warn!(
                job_id = %response.job_id,
                status = %response.status,
                "Backend reported a non-running status at submission; tracking as RUNNING",
            );
        }

        let record = JobRecord::new(response.job_id, response.filename);
        self.registry.insert(record.clone()).await?;
        if !self.scheduler.schedule(&record.id).await {
            // Shutdown raced the request; an unpolled record would never settle.
            self.registry.remove(&record.id).await;
            tracing::warn!(job_id = %record.id, "Job accepted after shutdown, not tracked");
            return Err(SubmitError::Submission(SHUT_DOWN_ERROR.to_string()));
        }

        tracing::info!(
            job_id = %record.id,
            artifact = %record.artifact_name,
            links = route.link_ids.len(),
            "Generation job submitted",
        );
        let _ = self.event_tx.send(JobEvent::Submitted {
            job_id: record.id.clone(),
            artifact_name: record.artifact_name.clone(),
        });

        Ok(record)
    }
}
