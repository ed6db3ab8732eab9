use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use mosaic_backend::api::BackendError;
use mosaic_backend::backend::ComputeBackend;
use mosaic_backend::messages::{GenerateRequest, GenerateResponse, StatusResponse};
use mosaic_core::job::JobStatus;
use mosaic_core::params::GenerationParams;
use mosaic_core::route::{LngLat, RouteSnapshot};
use tokio::time::Instant;

pub const API_URL: &str = "http://backend.test";

/// One scripted answer to a status request.
#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
pub enum StatusReply {
    Status(JobStatus),
    NotFound,
    Transport,
    ServerError,
    Malformed,
}

impl StatusReply {
    fn into_result(self, job_id: &str) -> Result<StatusResponse, BackendError> {
        match self {
            StatusReply::Status(status) => Ok(StatusResponse {
                job_id: Some(job_id.to_string()),
                status,
            }),
            StatusReply::NotFound => Err(BackendError::NotFound {
                detail: Some("Job not found".into()),
            }),
            StatusReply::Transport => Err(transport_error()),
            StatusReply::ServerError => Err(BackendError::Api {
                status: 500,
                detail: None,
            }),
            StatusReply::Malformed => Err(BackendError::Decode(
                serde_json::from_str::<StatusResponse>(r#"{"status":"QUEUED"}"#).unwrap_err(),
            )),
        }
    }
}

/// A genuine `reqwest::Error` without touching the network.
pub fn transport_error() -> BackendError {
    BackendError::Request(reqwest::Client::new().get("not a url").build().unwrap_err())
}

/// Scripted submission answer.
#[allow(dead_code)]
pub enum SubmitReply {
    Accept { job_id: String, filename: String },
    Reject { status: u16, detail: Option<String> },
    Transport,
}

/// In-process stand-in for the compute backend.
///
/// Status scripts are consumed front to back; once a job's script is
/// exhausted it keeps answering `RUNNING`.
#[derive(Default)]
pub struct ScriptedBackend {
    submit_replies: Mutex<VecDeque<SubmitReply>>,
    statuses: Mutex<HashMap<String, VecDeque<StatusReply>>>,
    submit_calls: AtomicUsize,
    status_calls: Mutex<Vec<(String, Instant)>>,
    last_request: Mutex<Option<GenerateRequest>>,
    epoch: Mutex<Option<Instant>>,
}

#[allow(dead_code)]
impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn accept(&self, job_id: &str, filename: &str) -> &Self {
        self.submit_replies
            .lock()
            .unwrap()
            .push_back(SubmitReply::Accept {
                job_id: job_id.into(),
                filename: filename.into(),
            });
        self
    }

    pub fn reply(&self, reply: SubmitReply) -> &Self {
        self.submit_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn statuses(&self, job_id: &str, replies: impl IntoIterator<Item = StatusReply>) -> &Self {
        self.statuses
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .extend(replies);
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self, job_id: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == job_id)
            .count()
    }

    /// Time of each status call for `job_id`, relative to the last
    /// accepted submission.
    pub fn status_call_offsets(&self, job_id: &str) -> Vec<Duration> {
        let epoch = self.epoch.lock().unwrap().expect("no submission yet");
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == job_id)
            .map(|(_, at)| *at - epoch)
            .collect()
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ComputeBackend for ScriptedBackend {
    async fn lookup_route(&self, points: &[LngLat]) -> Result<RouteSnapshot, BackendError> {
        let coordinates: Vec<[f64; 2]> = points.iter().map(|p| [p.lng(), p.lat()]).collect();
        Ok(RouteSnapshot {
            link_ids: vec!["L1".into(), "L2".into(), "L3".into()],
            geojson: serde_json::json!({
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": coordinates},
            }),
        })
    }

    async fn submit(&self, request: &GenerateRequest) -> Result<GenerateResponse, BackendError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        let reply = self
            .submit_replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected submission");
        match reply {
            SubmitReply::Accept { job_id, filename } => {
                *self.epoch.lock().unwrap() = Some(Instant::now());
                Ok(GenerateResponse {
                    job_id,
                    status: JobStatus::Running,
                    filename,
                })
            }
            SubmitReply::Reject { status, detail } => Err(BackendError::Api { status, detail }),
            SubmitReply::Transport => Err(transport_error()),
        }
    }

    async fn job_status(&self, job_id: &str) -> Result<StatusResponse, BackendError> {
        self.status_calls
            .lock()
            .unwrap()
            .push((job_id.to_string(), Instant::now()));
        let reply = self
            .statuses
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(StatusReply::Status(JobStatus::Running));
        reply.into_result(job_id)
    }

    fn api_url(&self) -> &str {
        API_URL
    }
}

pub fn sample_route() -> RouteSnapshot {
    RouteSnapshot {
        link_ids: vec!["L1".into(), "L2".into()],
        geojson: serde_json::json!({
            "type": "Feature",
            "geometry": {"type": "LineString", "coordinates": [[139.7671, 35.6812], [139.6917, 35.6895]]},
        }),
    }
}

pub fn sample_params() -> GenerationParams {
    GenerationParams {
        start_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        ..Default::default()
    }
}
