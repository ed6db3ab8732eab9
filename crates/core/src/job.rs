//! Job record and status state machine.
//!
//! A [`JobRecord`] is created once the compute backend accepts a
//! generation request and is mutated only through [`JobRecord::apply_status`]
//! and [`JobRecord::record_poll_attempt`]. Status transitions are monotonic:
//! once a record reaches `COMPLETED` or `FAILED` it never changes again.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Externally visible lifecycle status of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Wire representation used by the compute backend.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    /// `COMPLETED` and `FAILED` are terminal; no polling happens after them.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `self -> next` is a legal edge.
    ///
    /// The only edges are `RUNNING -> RUNNING`, `RUNNING -> COMPLETED`
    /// and `RUNNING -> FAILED`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        self == JobStatus::Running
            && matches!(
                next,
                JobStatus::Running | JobStatus::Completed | JobStatus::Failed
            )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(JobStatus::Running),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown job status '{other}'. Must be one of: RUNNING, COMPLETED, FAILED"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Transition outcome
// ---------------------------------------------------------------------------

/// What happened when a status was applied to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status changed from `from` to `to`.
    Changed { from: JobStatus, to: JobStatus },
    /// The record was already in the requested (non-terminal) status.
    Unchanged,
    /// The record is terminal; the update was discarded.
    IgnoredTerminal,
}

impl Transition {
    /// The status the record moved into, when it reached a terminal one.
    pub fn terminal_status(self) -> Option<JobStatus> {
        match self {
            Transition::Changed { to, .. } if to.is_terminal() => Some(to),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One generation request and its last known status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    /// Backend-issued identifier; never generated client-side.
    pub id: JobId,
    pub status: JobStatus,
    /// Output artifact name returned at submission; stable thereafter.
    pub artifact_name: String,
    /// Number of status checks performed so far.
    pub poll_attempts: u32,
    pub submitted_at: Timestamp,
    pub updated_at: Timestamp,
}

impl JobRecord {
    /// A freshly submitted job: `RUNNING` with zero poll attempts.
    pub fn new(id: impl Into<JobId>, artifact_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: JobStatus::Running,
            artifact_name: artifact_name.into(),
            poll_attempts: 0,
            submitted_at: now,
            updated_at: now,
        }
    }

    /// True once the job reached `COMPLETED` or `FAILED`.
    pub fn terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a polled status, honouring the monotonic transition rules.
    ///
    /// Terminal records are never modified, so re-applying a duplicate or
    /// late response is a no-op.
    pub fn apply_status(&mut self, next: JobStatus) -> Transition {
        if self.terminal() {
            return Transition::IgnoredTerminal;
        }
        if self.status == next {
            return Transition::Unchanged;
        }
        debug_assert!(self.status.can_transition_to(next));
        let from = self.status;
        self.status = next;
        self.updated_at = Utc::now();
        Transition::Changed { from, to: next }
    }

    /// Count one status check against this job.
    pub fn record_poll_attempt(&mut self) {
        self.poll_attempts = self.poll_attempts.saturating_add(1);
    }
}
