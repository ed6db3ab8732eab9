//! REST API client for the mosaic compute backend.
//!
//! Wraps the backend HTTP API (route lookup, data upload, generation
//! submission, job status, artifact download) using [`reqwest`].

use std::path::Path;
use std::time::Duration;

use mosaic_core::naming::{artifact_download_url, is_safe_artifact_name};
use mosaic_core::route::{LngLat, RouteSnapshot};
use reqwest::StatusCode;

use crate::messages::{
    DataType, ErrorBody, GenerateRequest, GenerateResponse, RouteRequest, StatusResponse,
    UploadResponse,
};

/// HTTP client for a single compute backend.
#[derive(Clone)]
pub struct MosaicApi {
    client: reqwest::Client,
    api_url: String,
}

/// Errors from the backend REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered 404.
    #[error("Not found: {}", .detail.as_deref().unwrap_or("<no detail>"))]
    NotFound {
        /// `detail` from the error body, when present.
        detail: Option<String>,
    },

    /// The backend returned a non-2xx status other than 404.
    #[error("Backend API error ({status}): {}", .detail.as_deref().unwrap_or("<no detail>"))]
    Api {
        /// HTTP status code.
        status: u16,
        /// `detail` from the error body, when present.
        detail: Option<String>,
    },

    /// A success response whose body did not match the expected shape.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Reading or writing a local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An artifact name that cannot be used as a download path segment.
    #[error("Invalid artifact name '{0}'")]
    InvalidArtifactName(String),

    /// The configured base URL cannot carry request paths.
    #[error("Invalid backend URL '{0}'")]
    InvalidUrl(String),
}

impl BackendError {
    /// Backend-provided detail message, for user-facing notifications.
    pub fn detail(&self) -> Option<&str> {
        match self {
            BackendError::NotFound { detail } | BackendError::Api { detail, .. } => {
                detail.as_deref()
            }
            _ => None,
        }
    }
}

impl MosaicApi {
    /// Create a new API client for a backend.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://localhost:8000`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create a client whose requests time out after `timeout`.
    pub fn with_timeout(
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    /// Base HTTP URL of the backend.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Look up the road route through the given points.
    ///
    /// Sends `POST /api/v1/route`; the first and last points are the
    /// route endpoints.
    pub async fn lookup_route(&self, points: &[LngLat]) -> Result<RouteSnapshot, BackendError> {
        let response = self
            .client
            .post(self.endpoint(&["api", "v1", "route"])?)
            .json(&RouteRequest { points })
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Upload a probe or link data file as multipart form data.
    pub async fn upload(
        &self,
        path: &Path,
        data_type: DataType,
    ) -> Result<UploadResponse, BackendError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());

        let form = reqwest::multipart::Form::new()
            .text("data_type", data_type.as_str())
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let response = self
            .client
            .post(self.endpoint(&["api", "v1", "upload"])?)
            .multipart(form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Submit a mosaic generation request.
    ///
    /// Sends `POST /api/v1/mosaic/generate`. Returns the backend-assigned
    /// job id and the artifact name the job will produce.
    pub async fn submit_generation(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendError> {
        let response = self
            .client
            .post(self.endpoint(&["api", "v1", "mosaic", "generate"])?)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Retrieve the current status of a job.
    ///
    /// Sends `GET /api/v1/mosaic/status/{job_id}`, with the id
    /// percent-encoded as a single path segment. A job the backend has not
    /// indexed yet yields [`BackendError::NotFound`].
    pub async fn job_status(&self, job_id: &str) -> Result<StatusResponse, BackendError> {
        let response = self
            .client
            .get(self.endpoint(&["api", "v1", "mosaic", "status", job_id])?)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download URL of an artifact, without fetching it.
    pub fn download_url(&self, artifact_name: &str) -> Option<String> {
        artifact_download_url(&self.api_url, artifact_name)
    }

    /// Fetch an artifact and write it to `dest`. Returns the byte count.
    pub async fn download_artifact(
        &self,
        artifact_name: &str,
        dest: &Path,
    ) -> Result<u64, BackendError> {
        if !is_safe_artifact_name(artifact_name) {
            return Err(BackendError::InvalidArtifactName(artifact_name.to_string()));
        }
        let response = self
            .client
            .get(self.endpoint(&["api", "v1", "mosaic", "download", artifact_name])?)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;

        tracing::info!(
            artifact = %artifact_name,
            dest = %dest.display(),
            bytes = bytes.len(),
            "Artifact downloaded",
        );
        Ok(bytes.len() as u64)
    }

    // ---- private helpers ----

    /// Absolute URL for `segments` under the base URL. Each segment is
    /// percent-encoded, so ids containing `/`, `?` or `#` stay one segment.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, BackendError> {
        let invalid = || BackendError::InvalidUrl(self.api_url.clone());
        let mut url = reqwest::Url::parse(&self.api_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Ensure the response has a success status code. 404 maps to
    /// [`BackendError::NotFound`], any other failure to
    /// [`BackendError::Api`]; both carry the body's `detail` if present.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = ErrorBody::detail_from(&body);
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound { detail });
        }
        Err(BackendError::Api {
            status: status.as_u16(),
            detail,
        })
    }

    /// Parse a successful JSON response body into the expected type.
    ///
    /// The body is read in full first so that a shape mismatch surfaces
    /// as [`BackendError::Decode`] rather than a transport error.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
