use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use mosaic_backend::messages::DataType;
use mosaic_core::params::TimePitch;
use mosaic_core::route::LngLat;

/// Traffic speed mosaic generator.
#[derive(Debug, Parser)]
#[command(name = "mosaic-cli", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look up the road route between two points and print its links.
    Route {
        /// Start point as `lng,lat`.
        #[arg(allow_hyphen_values = true)]
        from: LngLat,
        /// End point as `lng,lat`.
        #[arg(allow_hyphen_values = true)]
        to: LngLat,
    },

    /// Upload probe records or link geometry to the backend.
    Upload {
        /// `probe` or `links`.
        data_type: DataType,
        path: PathBuf,
    },

    /// Generate a mosaic for the route between two points and wait for it.
    Generate {
        #[arg(allow_hyphen_values = true)]
        from: LngLat,
        #[arg(allow_hyphen_values = true)]
        to: LngLat,
        /// Aggregation pitch in minutes: 15, 30 or 60.
        #[arg(long, value_parser = parse_pitch, default_value = "60")]
        pitch: TimePitch,
        /// First day to include, `YYYY-MM-DD` (default: today).
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Last day to include, `YYYY-MM-DD` (default: same as `--date`).
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },

    /// Download a generated artifact.
    Download {
        /// Artifact name reported when the job was submitted.
        filename: String,
        dest: PathBuf,
    },
}

fn parse_pitch(s: &str) -> Result<TimePitch, String> {
    let minutes: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a number of minutes"))?;
    TimePitch::try_from(minutes).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn pitch_parser() {
        assert_eq!(parse_pitch("15").unwrap(), TimePitch::Min15);
        assert!(parse_pitch("45").is_err());
        assert!(parse_pitch("hourly").is_err());
    }
}
