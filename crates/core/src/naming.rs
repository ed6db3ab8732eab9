//! Artifact naming convention.
//!
//! The compute backend names the artifact at submission time and serves
//! it from a fixed download path. Resolving a download location is pure
//! string work; no request is made.

use crate::job::{JobRecord, JobStatus};

/// Path prefix under which the backend serves generated artifacts.
pub const DOWNLOAD_PATH: &str = "/api/v1/mosaic/download";

/// Whether `name` can be used verbatim as a single URL path segment.
///
/// Rejects empty names, path separators and parent-directory references,
/// mirroring what the backend refuses to serve.
pub fn is_safe_artifact_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
        && !name.chars().any(char::is_control)
}

/// Download URL for an artifact name.
///
/// Convention: `{base_url}/api/v1/mosaic/download/{artifact_name}`
///
/// # Examples
///
/// ```
/// use mosaic_core::naming::artifact_download_url;
///
/// assert_eq!(
///     artifact_download_url("http://localhost:8000/", "out.tif"),
///     Some("http://localhost:8000/api/v1/mosaic/download/out.tif".to_string()),
/// );
/// assert_eq!(artifact_download_url("http://localhost:8000", "../etc"), None);
/// ```
pub fn artifact_download_url(base_url: &str, artifact_name: &str) -> Option<String> {
    if !is_safe_artifact_name(artifact_name) {
        return None;
    }
    Some(format!(
        "{}{DOWNLOAD_PATH}/{artifact_name}",
        base_url.trim_end_matches('/')
    ))
}

/// Download URL for a job, available only once it has `COMPLETED`.
pub fn resolve_download(base_url: &str, job: &JobRecord) -> Option<String> {
    if job.status != JobStatus::Completed {
        return None;
    }
    artifact_download_url(base_url, &job.artifact_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:8000";

    #[test]
    fn completed_job_resolves_from_artifact_name() {
        let mut job = JobRecord::new("J1", "out.tif");
        job.apply_status(JobStatus::Completed);
        assert_eq!(
            resolve_download(BASE, &job).as_deref(),
            Some("http://localhost:8000/api/v1/mosaic/download/out.tif")
        );
    }

    #[test]
    fn running_and_failed_jobs_do_not_resolve() {
        let job = JobRecord::new("J1", "out.tif");
        assert!(resolve_download(BASE, &job).is_none());

        let mut failed = JobRecord::new("J2", "out.tif");
        failed.apply_status(JobStatus::Failed);
        assert!(resolve_download(BASE, &failed).is_none());
    }

    #[test]
    fn trailing_slash_on_base_is_ignored() {
        assert_eq!(
            artifact_download_url("http://host/", "mosaic_1.png").as_deref(),
            Some("http://host/api/v1/mosaic/download/mosaic_1.png")
        );
    }

    #[test]
    fn unsafe_names_rejected() {
        assert!(!is_safe_artifact_name(""));
        assert!(!is_safe_artifact_name("../secret"));
        assert!(!is_safe_artifact_name("a/b.png"));
        assert!(!is_safe_artifact_name("a\\b.png"));
        assert!(!is_safe_artifact_name("a\nb"));
        assert!(is_safe_artifact_name("mosaic_0b1c.png"));
    }
}
