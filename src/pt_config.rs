//! Tracker configuration
//!
//! Loaded from YAML. Every field has a default, so an empty file is a valid
//! configuration:
//!
//! ```
//! use pt_rust::pt_config::TrackerConfig;
//!
//! let config = TrackerConfig::from_yaml("poll_interval_secs: 30\n").unwrap();
//! assert_eq!(config.poll_interval_secs, 30);
//! assert_eq!(config.max_run_secs, 300);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use thiserror::Error;

use crate::pt_client::DEFAULT_ENDPOINT;
use crate::pt_interface::Score;

/// Upper bound for every duration in the config (ten years)
pub const MAX_CONFIG_SECS: u64 = 10 * 365 * 24 * 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How the very first observation of a peer is treated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstObservation {
    /// Unseen peers start from score 0; a first nonzero score is a win
    #[default]
    CountFromZero,

    /// The first observation only seeds the ledger
    Baseline,
}

impl FirstObservation {
    /// Score a new observation is compared against, `None` when no
    /// comparison applies
    pub fn baseline(self, previous: Option<Score>) -> Option<Score> {
        match (self, previous) {
            (_, Some(score)) => Some(score),
            (FirstObservation::CountFromZero, None) => Some(0),
            (FirstObservation::Baseline, None) => None,
        }
    }
}

/// Where win events go
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Append-only CSV file (created with a header if missing)
    pub csv_path: Option<PathBuf>,

    /// Also log every event at info level
    pub log_events: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            csv_path: None,
            log_events: true,
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Peer status endpoint, queried as `{endpoint}?id={peer_id}`
    pub endpoint: String,

    /// Per-request timeout (default: 10)
    pub request_timeout_secs: u64,

    /// Pause between two poll rounds (default: 60)
    pub poll_interval_secs: u64,

    /// A polling run ends after this long (default: 300)
    pub max_run_secs: u64,

    /// Window of the "recently active" view (default: 1 hour)
    pub active_window_secs: u64,

    /// Window of the "stale" view (default: 2 hours)
    pub stale_window_secs: u64,

    pub first_observation: FirstObservation,

    /// CSV roster with a `Username` column and peer id columns
    pub roster_path: Option<PathBuf>,

    pub sink: SinkConfig,

    /// One of error, warn, info, debug, trace
    pub log_level: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 10,
            poll_interval_secs: 60,
            max_run_secs: 300,
            active_window_secs: 3600,
            stale_window_secs: 2 * 3600,
            first_observation: FirstObservation::default(),
            roster_path: None,
            sink: SinkConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl TrackerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // an empty document deserializes to unit, not to a map
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("request_timeout_secs", self.request_timeout_secs),
            ("poll_interval_secs", self.poll_interval_secs),
            ("max_run_secs", self.max_run_secs),
        ];
        for (name, value) in durations {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }

        let windows = [
            ("request_timeout_secs", self.request_timeout_secs),
            ("poll_interval_secs", self.poll_interval_secs),
            ("max_run_secs", self.max_run_secs),
            ("active_window_secs", self.active_window_secs),
            ("stale_window_secs", self.stale_window_secs),
        ];
        for (name, value) in windows {
            if value > MAX_CONFIG_SECS {
                return Err(ConfigError::Invalid(format!(
                    "{} exceeds {} seconds",
                    name, MAX_CONFIG_SECS
                )));
            }
        }

        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint is empty".to_string()));
        }

        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.log_level
            )));
        }

        Ok(())
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn active_window(&self) -> Duration {
        seconds(self.active_window_secs)
    }

    pub fn stale_window(&self) -> Duration {
        seconds(self.stale_window_secs)
    }
}

/// Duration from config seconds, clamped to `MAX_CONFIG_SECS`
pub fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_CONFIG_SECS) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = TrackerConfig::from_yaml("").unwrap();
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.max_run_secs, 300);
        assert_eq!(config.first_observation, FirstObservation::CountFromZero);
        assert!(config.sink.log_events);
        assert!(config.sink.csv_path.is_none());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_partial_override() {
        let yaml = "
endpoint: http://localhost:9000/peer
first_observation: baseline
active_window_secs: 600
sink:
  csv_path: wins.csv
";
        let config = TrackerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.endpoint, "http://localhost:9000/peer");
        assert_eq!(config.first_observation, FirstObservation::Baseline);
        assert_eq!(config.active_window(), Duration::minutes(10));
        assert_eq!(config.stale_window(), Duration::hours(2));
        assert_eq!(config.sink.csv_path, Some(PathBuf::from("wins.csv")));
        // untouched nested default survives
        assert!(config.sink.log_events);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = TrackerConfig::from_yaml("poll_interval_secs: 0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let result = TrackerConfig::from_yaml("log_level: loud");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let result = TrackerConfig::from_yaml("first_observation: sometimes");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_first_observation_baseline() {
        assert_eq!(FirstObservation::CountFromZero.baseline(None), Some(0));
        assert_eq!(FirstObservation::Baseline.baseline(None), None);
        assert_eq!(FirstObservation::CountFromZero.baseline(Some(4)), Some(4));
        assert_eq!(FirstObservation::Baseline.baseline(Some(4)), Some(4));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.yaml");
        fs::write(&path, "max_run_secs: 120\nlog_level: debug\n").unwrap();

        let config = TrackerConfig::load(&path).unwrap();
        assert_eq!(config.max_run_secs, 120);
        assert_eq!(config.level_filter(), log::LevelFilter::Debug);
    }
}
