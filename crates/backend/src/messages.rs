//! Wire types for the compute backend's HTTP/JSON API.
//!
//! Request bodies serialize to the exact field names the backend expects;
//! response bodies deserialize strictly so that a malformed payload is
//! reported as a decode error rather than silently defaulted.

use std::fmt;
use std::str::FromStr;

use mosaic_core::job::JobStatus;
use mosaic_core::route::LngLat;
use mosaic_core::types::JobId;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/route`.
#[derive(Debug, Serialize)]
pub struct RouteRequest<'a> {
    pub points: &'a [LngLat],
}

/// Body of `POST /api/v1/mosaic/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub route_link_ids: Vec<String>,
    pub route_geojson: serde_json::Value,
    pub params: serde_json::Value,
    /// Attribution string rendered onto the artifact.
    pub data_credits: String,
}

/// Response to a successful generation request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerateResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Name of the artifact the job will produce.
    pub filename: String,
}

/// Response of `GET /api/v1/mosaic/status/{job_id}`.
///
/// An unknown `status` string fails deserialization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub job_id: Option<JobId>,
    pub status: JobStatus,
}

/// Response to a successful data upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body returned with non-success statuses: `{"detail": ...}`.
///
/// `detail` is usually a string, but request-validation failures carry a
/// structured list, so it is kept as raw JSON.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// Extract a human-readable detail message from a raw response body.
    pub fn detail_from(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        match parsed.detail {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}

/// Kind of input data accepted by `POST /api/v1/upload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Vehicle probe records (CSV).
    Probe,
    /// Road link geometry (shapefile).
    Links,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Probe => "probe",
            DataType::Links => "links",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "probe" => Ok(DataType::Probe),
            "links" => Ok(DataType::Links),
            other => Err(format!(
                "Invalid data type '{other}'. Must be one of: probe, links"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_generate_response() {
        let json = r#"{"job_id":"J1","status":"RUNNING","filename":"out.tif"}"#;
        let resp: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.job_id, "J1");
        assert_eq!(resp.status, JobStatus::Running);
        assert_eq!(resp.filename, "out.tif");
    }

    #[test]
    fn parse_status_without_job_id() {
        let resp: StatusResponse = serde_json::from_str(r#"{"status":"COMPLETED"}"#).unwrap();
        assert_eq!(resp.status, JobStatus::Completed);
        assert!(resp.job_id.is_none());
    }

    #[test]
    fn unknown_status_is_a_decode_error() {
        assert!(serde_json::from_str::<StatusResponse>(r#"{"status":"QUEUED"}"#).is_err());
        assert!(serde_json::from_str::<StatusResponse>(r#"{}"#).is_err());
    }

    #[test]
    fn detail_extraction() {
        assert_eq!(
            ErrorBody::detail_from(r#"{"detail":"links.shp missing"}"#).as_deref(),
            Some("links.shp missing")
        );
        assert_eq!(
            ErrorBody::detail_from(r#"{"detail":[{"loc":["body"],"msg":"field required"}]}"#)
                .as_deref(),
            Some(r#"[{"loc":["body"],"msg":"field required"}]"#)
        );
        assert!(ErrorBody::detail_from(r#"{"detail":""}"#).is_none());
        assert!(ErrorBody::detail_from("Internal Server Error").is_none());
    }

    #[test]
    fn route_request_serializes_points_as_pairs() {
        let points = [LngLat(139.7, 35.6), LngLat(139.8, 35.7)];
        let json = serde_json::to_value(RouteRequest { points: &points }).unwrap();
        assert_eq!(json, serde_json::json!({"points": [[139.7, 35.6], [139.8, 35.7]]}));
    }

    #[test]
    fn data_type_parsing() {
        assert_eq!("probe".parse::<DataType>().unwrap(), DataType::Probe);
        assert_eq!("links".parse::<DataType>().unwrap(), DataType::Links);
        assert!("roads".parse::<DataType>().is_err());
    }
}
