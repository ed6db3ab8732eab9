//! Seam between the job engine and the compute backend.
//!
//! The engine only ever talks to a [`ComputeBackend`]; [`MosaicApi`] is
//! the HTTP implementation used in production.

use async_trait::async_trait;
use mosaic_core::route::{LngLat, RouteSnapshot};

use crate::api::{BackendError, MosaicApi};
use crate::messages::{GenerateRequest, GenerateResponse, StatusResponse};

/// Operations the job engine needs from the compute backend.
#[async_trait]
pub trait ComputeBackend: Send + Sync {
    /// Resolve a road route between captured points.
    async fn lookup_route(&self, points: &[LngLat]) -> Result<RouteSnapshot, BackendError>;

    /// Queue a generation job.
    async fn submit(&self, request: &GenerateRequest) -> Result<GenerateResponse, BackendError>;

    /// Current status of a job. A not-yet-indexed job yields
    /// [`BackendError::NotFound`].
    async fn job_status(&self, job_id: &str) -> Result<StatusResponse, BackendError>;

    /// Base URL artifacts are downloaded from.
    fn api_url(&self) -> &str;
}

#[async_trait]
impl ComputeBackend for MosaicApi {
    async fn lookup_route(&self, points: &[LngLat]) -> Result<RouteSnapshot, BackendError> {
        MosaicApi::lookup_route(self, points).await
    }

    async fn submit(&self, request: &GenerateRequest) -> Result<GenerateResponse, BackendError> {
        self.submit_generation(request).await
    }

    async fn job_status(&self, job_id: &str) -> Result<StatusResponse, BackendError> {
        MosaicApi::job_status(self, job_id).await
    }

    fn api_url(&self) -> &str {
        MosaicApi::api_url(self)
    }
}
