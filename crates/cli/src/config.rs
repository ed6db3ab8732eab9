use std::time::Duration;

use anyhow::Context;
use mosaic_backend::engine::EngineConfig;
use mosaic_backend::scheduler::{PollConfig, DEFAULT_FIRST_POLL_DELAY, DEFAULT_POLL_INTERVAL};
use mosaic_backend::submitter::DEFAULT_DATA_CREDITS;

/// Default compute backend location for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// CLI configuration loaded from environment variables.
///
/// All fields have defaults suitable for a backend running locally.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Compute backend base URL (default: `http://localhost:8000`).
    pub api_url: String,
    /// Seconds before the first status check of a new job (default: `3`).
    pub first_poll_secs: u64,
    /// Seconds between later status checks (default: `5`).
    pub poll_interval_secs: u64,
    /// Attribution rendered onto generated artifacts.
    pub data_credits: String,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            first_poll_secs: DEFAULT_FIRST_POLL_DELAY.as_secs(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            data_credits: DEFAULT_DATA_CREDITS.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `MOSAIC_API_URL`              | `http://localhost:8000` |
    /// | `MOSAIC_FIRST_POLL_SECS`      | `3`                     |
    /// | `MOSAIC_POLL_INTERVAL_SECS`   | `5`                     |
    /// | `MOSAIC_DATA_CREDITS`         | `Data: TomTom + OSM`    |
    /// | `MOSAIC_REQUEST_TIMEOUT_SECS` | `30`                    |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let secs = |key: &str, default: u64| -> anyhow::Result<u64> {
            match lookup(key) {
                Some(v) => v
                    .trim()
                    .parse()
                    .with_context(|| format!("{key} must be a whole number of seconds, got '{v}'")),
                None => Ok(default),
            }
        };

        let config = Self {
            api_url: lookup("MOSAIC_API_URL").unwrap_or(defaults.api_url),
            first_poll_secs: secs("MOSAIC_FIRST_POLL_SECS", defaults.first_poll_secs)?,
            poll_interval_secs: secs("MOSAIC_POLL_INTERVAL_SECS", defaults.poll_interval_secs)?,
            data_credits: lookup("MOSAIC_DATA_CREDITS").unwrap_or(defaults.data_credits),
            request_timeout_secs: secs(
                "MOSAIC_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
        };

        if config.poll_interval_secs == 0 {
            anyhow::bail!("MOSAIC_POLL_INTERVAL_SECS must be at least 1");
        }
        if config.request_timeout_secs == 0 {
            anyhow::bail!("MOSAIC_REQUEST_TIMEOUT_SECS must be at least 1");
        }
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Engine settings derived from this config.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            poll: PollConfig {
                first_poll_delay: Duration::from_secs(self.first_poll_secs),
                poll_interval: Duration::from_secs(self.poll_interval_secs),
            },
            data_credits: self.data_credits.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<CliConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CliConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.api_url, "http://localhost:8000");

        let engine = config.engine_config();
        assert_eq!(engine.poll, PollConfig::default());
        assert_eq!(engine.data_credits, "Data: TomTom + OSM");
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("MOSAIC_API_URL", "http://mosaic:9000"),
            ("MOSAIC_FIRST_POLL_SECS", "1"),
            ("MOSAIC_POLL_INTERVAL_SECS", "2"),
            ("MOSAIC_DATA_CREDITS", "Data: in-house"),
            ("MOSAIC_REQUEST_TIMEOUT_SECS", "10"),
        ])
        .unwrap();

        assert_eq!(config.api_url, "http://mosaic:9000");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        let engine = config.engine_config();
        assert_eq!(engine.poll.first_poll_delay, Duration::from_secs(1));
        assert_eq!(engine.poll.poll_interval, Duration::from_secs(2));
        assert_eq!(engine.data_credits, "Data: in-house");
    }

    #[test]
    fn malformed_number_is_an_error() {
        let err = load(&[("MOSAIC_FIRST_POLL_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("MOSAIC_FIRST_POLL_SECS"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(load(&[("MOSAIC_POLL_INTERVAL_SECS", "0")]).is_err());
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let err = load(&[("MOSAIC_REQUEST_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("MOSAIC_REQUEST_TIMEOUT_SECS"));
    }
}
