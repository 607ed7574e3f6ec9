//! Subserver configuration
//!
//! Defines the hub and origin connection settings plus the timing knobs of
//! the poll loop and the response batcher.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONCURRENT_POLLS: usize = 1;
const DEFAULT_POLL_INTERVAL_MS: u64 = 20;
const DEFAULT_BUNDLE_TIME_MS: u64 = 100;
const DEFAULT_HOUSEKEEPING_INTERVAL_MS: u64 = 10;
const DEFAULT_STATUS_INTERVAL_SECS: u64 = 5;

/// Subserver configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Hub base URL (e.g., "https://hub.example.org")
    pub hub_url: String,

    /// Name this subserver is registered under at the hub
    pub subserver_name: String,

    /// Passcode for `subserver_name`; passed through to the hub untouched
    pub subserver_passcode: String,

    /// Origin server base URL (e.g., "http://localhost:6060")
    pub origin_url: String,

    /// How many polls may be outstanding at once
    pub desired_concurrent_polls: usize,

    /// Minimum time between the start of two polls
    pub poll_interval: Duration,

    /// How long completed responses are collected before one delivery POST
    pub bundle_time: Duration,

    /// Tick of the poll loop
    pub housekeeping_interval: Duration,

    /// How often the poll loop logs its status
    pub status_interval: Duration,
}

/// On-disk JSON form of [`Config`]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    hub_url: String,
    subserver_name: String,
    subserver_passcode: String,
    origin_url: String,
    concurrent_polls: Option<usize>,
    poll_interval_ms: Option<u64>,
    bundle_time_ms: Option<u64>,
    housekeeping_interval_ms: Option<u64>,
    status_interval_secs: Option<u64>,
}

impl Config {
    /// Creates a new configuration with default timings
    pub fn new(
        hub_url: String,
        subserver_name: String,
        subserver_passcode: String,
        origin_url: String,
    ) -> Self {
        Self {
            hub_url,
            subserver_name,
            subserver_passcode,
            origin_url,
            desired_concurrent_polls: DEFAULT_CONCURRENT_POLLS,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            bundle_time: Duration::from_millis(DEFAULT_BUNDLE_TIME_MS),
            housekeeping_interval: Duration::from_millis(DEFAULT_HOUSEKEEPING_INTERVAL_MS),
            status_interval: Duration::from_secs(DEFAULT_STATUS_INTERVAL_SECS),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - TETHER_HUB_URL (required)
    /// - TETHER_SUBSERVER_NAME (required)
    /// - TETHER_SUBSERVER_PASSCODE (required)
    /// - TETHER_ORIGIN_URL (required)
    /// - TETHER_CONCURRENT_POLLS (optional, default: 1)
    /// - TETHER_POLL_INTERVAL_MS (optional, default: 20)
    /// - TETHER_BUNDLE_TIME_MS (optional, default: 100)
    /// - TETHER_HOUSEKEEPING_INTERVAL_MS (optional, default: 10)
    /// - TETHER_STATUS_INTERVAL_SECS (optional, default: 5)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::new(
            required_env("TETHER_HUB_URL")?,
            required_env("TETHER_SUBSERVER_NAME")?,
            required_env("TETHER_SUBSERVER_PASSCODE")?,
            required_env("TETHER_ORIGIN_URL")?,
        );

        if let Some(polls) = parsed_env::<usize>("TETHER_CONCURRENT_POLLS") {
            config.desired_concurrent_polls = polls;
        }
        if let Some(ms) = parsed_env::<u64>("TETHER_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parsed_env::<u64>("TETHER_BUNDLE_TIME_MS") {
            config.bundle_time = Duration::from_millis(ms);
        }
        if let Some(ms) = parsed_env::<u64>("TETHER_HOUSEKEEPING_INTERVAL_MS") {
            config.housekeeping_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parsed_env::<u64>("TETHER_STATUS_INTERVAL_SECS") {
            config.status_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Loads configuration from a JSON file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parses the JSON config format
    ///
    /// Missing required fields come back empty and are rejected by
    /// [`Config::validate`].
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let file: ConfigFile = serde_json::from_str(text).context("Failed to parse config JSON")?;

        let mut config = Self::new(
            file.hub_url,
            file.subserver_name,
            file.subserver_passcode,
            file.origin_url,
        );
        if let Some(polls) = file.concurrent_polls {
            config.desired_concurrent_polls = polls;
        }
        if let Some(ms) = file.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = file.bundle_time_ms {
            config.bundle_time = Duration::from_millis(ms);
        }
        if let Some(ms) = file.housekeeping_interval_ms {
            config.housekeeping_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = file.status_interval_secs {
            config.status_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.subserver_name.is_empty() {
            anyhow::bail!("subserver_name cannot be empty");
        }

        if self.subserver_passcode.is_empty() {
            anyhow::bail!("subserver_passcode cannot be empty");
        }

        validate_url("hub_url", &self.hub_url)?;
        validate_url("origin_url", &self.origin_url)?;

        if self.desired_concurrent_polls == 0 {
            anyhow::bail!("desired_concurrent_polls must be greater than 0");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.housekeeping_interval.is_zero() {
            anyhow::bail!("housekeeping_interval must be greater than 0");
        }

        if self.bundle_time.is_zero() {
            anyhow::bail!("bundle_time must be greater than 0");
        }

        if self.status_interval.is_zero() {
            anyhow::bail!("status_interval must be greater than 0");
        }

        Ok(())
    }
}

fn validate_url(field: &str, url: &str) -> anyhow::Result<()> {
    if url.is_empty() {
        anyhow::bail!("{} cannot be empty", field);
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", field);
    }

    Ok(())
}

fn required_env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("{} environment variable not set", name))
}

fn parsed_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config::new(
            "https://hub.example.org".to_string(),
            "lab-node".to_string(),
            "secret".to_string(),
            "http://localhost:6060".to_string(),
        )
    }

    #[test]
    fn test_default_timings() {
        let config = sample();
        assert_eq!(config.desired_concurrent_polls, 1);
        assert_eq!(config.poll_interval, Duration::from_millis(20));
        assert_eq!(config.bundle_time, Duration::from_millis(100));
        assert_eq!(config.housekeeping_interval, Duration::from_millis(10));
        assert_eq!(config.status_interval, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = sample();

        config.subserver_name = String::new();
        assert!(config.validate().is_err());
        config.subserver_name = "lab-node".to_string();

        config.subserver_passcode = String::new();
        assert!(config.validate().is_err());
        config.subserver_passcode = "secret".to_string();

        config.hub_url = "hub.example.org".to_string();
        assert!(config.validate().is_err());
        config.hub_url = "https://hub.example.org".to_string();

        config.origin_url = String::new();
        assert!(config.validate().is_err());
        config.origin_url = "http://localhost:6060".to_string();

        config.desired_concurrent_polls = 0;
        assert!(config.validate().is_err());
        config.desired_concurrent_polls = 2;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut config = sample();
        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.housekeeping_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.bundle_time = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.status_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json() {
        let config = Config::from_json(
            r#"{
                "hub_url": "https://hub.example.org",
                "subserver_name": "lab-node",
                "subserver_passcode": "secret",
                "origin_url": "http://localhost:6060",
                "concurrent_polls": 3,
                "bundle_time_ms": 250
            }"#,
        )
        .unwrap();

        assert_eq!(config.subserver_name, "lab-node");
        assert_eq!(config.desired_concurrent_polls, 3);
        assert_eq!(config.bundle_time, Duration::from_millis(250));
        assert_eq!(config.poll_interval, Duration::from_millis(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_missing_field_fails_validation() {
        let config = Config::from_json(
            r#"{"hub_url": "https://hub.example.org", "subserver_name": "lab-node"}"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(Config::from_json("{not json").is_err());
    }
}
