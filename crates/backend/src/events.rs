//! Job lifecycle events emitted by the engine.
//!
//! These are what presentation layers subscribe to in order to learn
//! about terminal outcomes without polling the registry themselves.
//! `NotYetVisible` polls produce no event; they are never surfaced to
//! the user.

use mosaic_core::types::JobId;
use serde::Serialize;

/// A job-level event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// The backend accepted a generation request and polling started.
    Submitted {
        job_id: JobId,
        artifact_name: String,
    },

    /// The job finished and its artifact can be fetched.
    Completed {
        job_id: JobId,
        artifact_name: String,
        /// Resolved download location, `None` if the name is unusable.
        download_url: Option<String>,
    },

    /// The job failed, either as reported by the backend or because a
    /// status check failed unrecoverably.
    Failed {
        job_id: JobId,
        /// Why polling gave up; `None` when the backend reported `FAILED`.
        reason: Option<String>,
    },

    /// Polling ended without a terminal status: the job was removed or
    /// the engine shut down. The record, if still present, stays
    /// `RUNNING`.
    PollingStopped { job_id: JobId },
}

impl JobEvent {
    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::Submitted { job_id, .. }
            | JobEvent::Completed { job_id, .. }
            | JobEvent::Failed { job_id, .. }
            | JobEvent::PollingStopped { job_id } => job_id,
        }
    }

    /// Whether this event reports a terminal outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Completed { .. } | JobEvent::Failed { .. })
    }

    /// Whether no further events will follow for this job.
    pub fn ends_tracking(&self) -> bool {
        self.is_terminal() || matches!(self, JobEvent::PollingStopped { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = JobEvent::Failed {
            job_id: "J1".into(),
            reason: Some("HTTP request failed".into()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["job_id"], "J1");
        assert!(event.is_terminal());
    }

    #[test]
    fn submitted_is_not_terminal() {
        let event = JobEvent::Submitted {
            job_id: "J2".into(),
            artifact_name: "out.tif".into(),
        };
        assert_eq!(event.job_id(), "J2");
        assert!(!event.is_terminal());
    }

    #[test]
    fn polling_stopped_ends_tracking_but_is_not_terminal() {
        let event = JobEvent::PollingStopped {
            job_id: "J3".into(),
        };
        assert_eq!(event.job_id(), "J3");
        assert!(!event.is_terminal());
        assert!(event.ends_tracking());
        assert_eq!(serde_json::to_value(&event).unwrap()["type"], "polling_stopped");
    }
}
