//! `mosaic-cli` -- drive the mosaic compute backend from a terminal.
//!
//! Looks up routes, uploads input data, submits generation jobs and
//! follows them to completion, and downloads finished artifacts.
//!
//! # Environment variables
//!
//! | Variable                      | Required | Default                 | Description                      |
//! |-------------------------------|----------|-------------------------|----------------------------------|
//! | `MOSAIC_API_URL`              | no       | `http://localhost:8000` | Compute backend base URL         |
//! | `MOSAIC_FIRST_POLL_SECS`      | no       | `3`                     | Delay before the first status check |
//! | `MOSAIC_POLL_INTERVAL_SECS`   | no       | `5`                     | Delay between later status checks |
//! | `MOSAIC_DATA_CREDITS`         | no       | `Data: TomTom + OSM`    | Attribution rendered on artifacts |
//! | `MOSAIC_REQUEST_TIMEOUT_SECS` | no       | `30`                    | HTTP request timeout             |
//! | `RUST_LOG`                    | no       | `mosaic_cli=info,mosaic_backend=info` | Log filter         |

use clap::Parser;
use mosaic_cli::args::Cli;
use mosaic_cli::commands;
use mosaic_cli::config::CliConfig;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mosaic_cli=info,mosaic_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = CliConfig::from_env()?;

    tracing::debug!(api_url = %config.api_url, "Configuration loaded");

    commands::run(cli.command, &config).await
}
