//! Subcommand handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use mosaic_backend::api::MosaicApi;
use mosaic_backend::engine::MosaicEngine;
use mosaic_backend::events::JobEvent;
use mosaic_backend::messages::DataType;
use mosaic_backend::submitter::SubmitError;
use mosaic_core::job::{JobRecord, JobStatus};
use mosaic_core::params::{GenerationParams, TimePitch};
use mosaic_core::route::{LngLat, RouteCapture};
use tokio::sync::broadcast;

use crate::args::Command;
use crate::config::CliConfig;

/// Execute one parsed subcommand.
pub async fn run(command: Command, config: &CliConfig) -> anyhow::Result<()> {
    let api = MosaicApi::with_timeout(&config.api_url, config.request_timeout())
        .context("Failed to build HTTP client")?;

    match command {
        Command::Route { from, to } => route(&api, from, to).await,
        Command::Upload { data_type, path } => upload(&api, data_type, &path).await,
        Command::Generate {
            from,
            to,
            pitch,
            date,
            end_date,
        } => {
            let params = build_params(pitch, date, end_date);
            generate(api, config, from, to, params).await
        }
        Command::Download { filename, dest } => download(&api, &filename, &dest).await,
    }
}

/// Parameter snapshot for a `generate` invocation.
pub fn build_params(
    pitch: TimePitch,
    date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> GenerationParams {
    GenerationParams {
        start_date: date.unwrap_or_else(|| Utc::now().date_naive()),
        end_date,
        time_pitch: pitch,
        ..GenerationParams::default()
    }
}

async fn route(api: &MosaicApi, from: LngLat, to: LngLat) -> anyhow::Result<()> {
    let route = api
        .lookup_route(&[from, to])
        .await
        .context("Route lookup failed")?;
    route.validate()?;

    tracing::info!(links = route.link_ids.len(), %from, %to, "Route found");
    for link_id in &route.link_ids {
        println!("{link_id}");
    }
    Ok(())
}

async fn upload(api: &MosaicApi, data_type: DataType, path: &Path) -> anyhow::Result<()> {
    let response = api
        .upload(path, data_type)
        .await
        .map_err(SubmitError::from)
        .with_context(|| format!("Upload of {} failed", path.display()))?;

    tracing::info!(%data_type, path = %path.display(), "Upload complete");
    println!(
        "{}",
        response
            .message
            .unwrap_or_else(|| format!("Uploaded {data_type} data"))
    );
    Ok(())
}

async fn generate(
    api: MosaicApi,
    config: &CliConfig,
    from: LngLat,
    to: LngLat,
    params: GenerationParams,
) -> anyhow::Result<()> {
    let engine = MosaicEngine::start(Arc::new(api), config.engine_config());
    let mut events = engine.subscribe();

    let mut capture = RouteCapture::new();
    capture.capture(from);
    capture.capture(to);
    if !engine
        .lookup_route(&mut capture)
        .await
        .context("Route lookup failed")?
    {
        anyhow::bail!("No usable route between {from} and {to}");
    }

    let record = engine.submit_from_capture(&mut capture, &params).await?;
    println!("Submitted job {} ({})", record.id, record.artifact_name);

    let done = tokio::select! {
        done = engine.wait_for_terminal(&record.id) => done,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(job_id = %record.id, "Interrupted, no longer waiting for job");
            engine.shutdown().await;
            return Ok(());
        }
    };
    engine.shutdown().await;

    let done = done.with_context(|| format!("Job {} is no longer tracked", record.id))?;
    report(&engine, &done, &mut events).await
}

async fn report(
    engine: &MosaicEngine,
    job: &JobRecord,
    events: &mut broadcast::Receiver<JobEvent>,
) -> anyhow::Result<()> {
    match job.status {
        JobStatus::Completed => {
            let url = engine
                .download_url(&job.id)
                .await
                .with_context(|| format!("Artifact name '{}' is unusable", job.artifact_name))?;
            println!("Job {} completed after {} polls", job.id, job.poll_attempts);
            println!("{url}");
            Ok(())
        }
        JobStatus::Failed => {
            let reason = failure_reason(events, &job.id);
            match reason {
                Some(reason) => anyhow::bail!("Job {} failed: {reason}", job.id),
                None => anyhow::bail!("Job {} failed on the backend", job.id),
            }
        }
        JobStatus::Running => anyhow::bail!("Job {} is still running", job.id),
    }
}

/// Reason attached to the job's `Failed` event, if one was buffered.
fn failure_reason(events: &mut broadcast::Receiver<JobEvent>, job_id: &str) -> Option<String> {
    while let Ok(event) = events.try_recv() {
        if let JobEvent::Failed {
            job_id: id,
            reason,
        } = event
        {
            if id == job_id {
                return reason;
            }
        }
    }
    None
}

async fn download(api: &MosaicApi, filename: &str, dest: &Path) -> anyhow::Result<()> {
    let bytes = api
        .download_artifact(filename, dest)
        .await
        .with_context(|| format!("Download of {filename} failed"))?;
    println!("Wrote {bytes} bytes to {}", dest.display());
    Ok(())
}
