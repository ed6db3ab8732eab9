//! Applies polled statuses to job records and announces outcomes.

use std::sync::Arc;

use mosaic_core::job::{JobRecord, JobStatus, Transition};
use mosaic_core::naming::resolve_download;
use tokio::sync::broadcast;

use crate::events::JobEvent;
use crate::registry::JobRegistry;

/// Result of reconciling one status observation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// No record with that id (it may have been removed).
    Unknown,
    /// The record was found; `record` is its state after the update.
    Applied {
        transition: Transition,
        record: JobRecord,
    },
}

impl Reconciled {
    /// Whether the record is terminal after reconciliation. Unknown
    /// records count as terminal since nothing is left to poll.
    pub fn is_settled(&self) -> bool {
        match self {
            Reconciled::Unknown => true,
            Reconciled::Applied { record, .. } => record.terminal(),
        }
    }
}

/// Applies statuses through the registry and emits exactly one terminal
/// event per job.
pub struct StatusReconciler {
    registry: Arc<JobRegistry>,
    event_tx: broadcast::Sender<JobEvent>,
    api_url: String,
}

impl StatusReconciler {
    pub fn new(
        registry: Arc<JobRegistry>,
        event_tx: broadcast::Sender<JobEvent>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            event_tx,
            api_url: api_url.into(),
        }
    }

    /// Apply a status reported by the backend.
    pub async fn apply(&self, job_id: &str, status: JobStatus) -> Reconciled {
        self.reconcile(job_id, status, None).await
    }

    /// Force a job to `FAILED` after an unrecoverable status check.
    pub async fn force_fail(&self, job_id: &str, reason: &str) -> Reconciled {
        self.reconcile(job_id, JobStatus::Failed, Some(reason)).await
    }

    /// Announce that polling for `job_id` ended without a terminal status.
    pub fn polling_stopped(&self, job_id: &str) {
        let _ = self.event_tx.send(JobEvent::PollingStopped {
            job_id: job_id.to_string(),
        });
    }

    async fn reconcile(
        &self,
        job_id: &str,
        status: JobStatus,
        reason: Option<&str>,
    ) -> Reconciled {
        let Some((transition, record)) = self.registry.apply_status(job_id, status).await else {
            tracing::debug!(job_id = %job_id, %status, "Status for unknown job discarded");
            return Reconciled::Unknown;
        };

        match transition {
            Transition::IgnoredTerminal => {
                tracing::debug!(
                    job_id = %job_id,
                    current = %record.status,
                    ignored = %status,
                    "Late status for terminal job ignored",
                );
            }
            Transition::Unchanged => {}
            Transition::Changed { from, to } => {
                tracing::info!(job_id = %job_id, %from, %to, "Job status changed");
                self.announce(&record, reason);
            }
        }

        Reconciled::Applied { transition, record }
    }

    fn announce(&self, record: &JobRecord, reason: Option<&str>) {
        let event = match record.status {
            JobStatus::Completed => JobEvent::Completed {
                job_id: record.id.clone(),
                artifact_name: record.artifact_name.clone(),
                download_url: resolve_download(&self.api_url, record),
            },
            JobStatus::Failed => JobEvent::Failed {
                job_id: record.id.clone(),
                reason: reason.map(str::to_string),
            },
            JobStatus::Running => return,
        };
        // A send error only means nobody is subscribed.
        let _ = self.event_tx.send(event);
    }
}
