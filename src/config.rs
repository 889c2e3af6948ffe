//! Configuration types for leak-enricher

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Remote catalog fetching (retry budget, timeouts, backoff bounds, headers)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Detail page base URL; the record id is appended as the last path segment
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Maximum number of attempts per page (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base per-attempt timeout (default: 30 seconds)
    ///
    /// Attempt `n` uses `timeout * (1 + 0.5 * (n - 1))`.
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Lower bound of the backoff wait (default: 5.0 seconds)
    #[serde(default = "default_min_wait", with = "duration_serde")]
    pub min_wait: Duration,

    /// Upper bound of the backoff wait (default: 6.0 seconds)
    #[serde(default = "default_max_wait", with = "duration_serde")]
    pub max_wait: Duration,

    /// `User-Agent` header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// `Accept` header sent with every request
    #[serde(default = "default_accept")]
    pub accept: String,

    /// `Accept-Language` header sent with every request
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_retries: default_max_retries(),
            timeout: default_timeout(),
            min_wait: default_min_wait(),
            max_wait: default_max_wait(),
            user_agent: default_user_agent(),
            accept: default_accept(),
            accept_language: default_accept_language(),
        }
    }
}

/// Batch scheduling and rate-limit degradation thresholds
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Records per batch (default: 5)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Rate-limit responses after which batches run one item at a time (default: 10)
    #[serde(default = "default_rate_limit_threshold")]
    pub rate_limit_threshold: u32,

    /// Rate-limit responses after which no more network calls are made (default: 20)
    #[serde(default = "default_skip_network_threshold")]
    pub skip_network_threshold: u32,

    /// Pause after each item in single-thread mode (default: 2.0 seconds)
    #[serde(default = "default_single_thread_pause", with = "duration_serde")]
    pub single_thread_pause: Duration,

    /// Wait between batches once more than `throttled_after` 429s were seen (default: 6.0 seconds)
    #[serde(default = "default_throttled_batch_wait", with = "duration_serde")]
    pub throttled_batch_wait: Duration,

    /// Rate-limit count above which `throttled_batch_wait` applies (default: 5)
    #[serde(default = "default_throttled_after")]
    pub throttled_after: u32,

    /// Wait between batches in single-thread mode (default: 1.0 second)
    #[serde(default = "default_single_thread_batch_wait", with = "duration_serde")]
    pub single_thread_batch_wait: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            rate_limit_threshold: default_rate_limit_threshold(),
            skip_network_threshold: default_skip_network_threshold(),
            single_thread_pause: default_single_thread_pause(),
            throttled_batch_wait: default_throttled_batch_wait(),
            throttled_after: default_throttled_after(),
            single_thread_batch_wait: default_single_thread_batch_wait(),
        }
    }
}

/// Input cache locations and the output root
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the generated metadata tree (default: "data/jellyfin")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory holding `*_磁链.txt` / `*_magnet.txt` result files (default: "data/results")
    #[serde(default = "default_result_dir")]
    pub result_dir: PathBuf,

    /// Directory holding per-id magnet files (default: "data/magnets")
    #[serde(default = "default_magnet_dir")]
    pub magnet_dir: PathBuf,

    /// Root of the poster image tree (default: "data/img")
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            result_dir: default_result_dir(),
            magnet_dir: default_magnet_dir(),
            image_dir: default_image_dir(),
        }
    }
}

/// Main configuration for the enrichment pipeline
///
/// Every field has a default, so `Config::default()` is a working setup
/// against the public catalog with the conventional `data/` layout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote fetching behaviour
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Batch scheduling behaviour
    #[serde(default)]
    pub batch: BatchConfig,

    /// Cache and output locations
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Config {
    /// Parse a JSON configuration document and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file and validate it
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the settings for values the pipeline cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_retries == 0 {
            return Err(Error::config(
                "fetch.max_retries",
                "at least one attempt is required",
            ));
        }
        if self.fetch.timeout.is_zero() {
            return Err(Error::config("fetch.timeout", "timeout must be positive"));
        }
        if self.fetch.min_wait > self.fetch.max_wait {
            return Err(Error::config(
                "fetch.min_wait",
                format!(
                    "min_wait ({:.2}s) exceeds max_wait ({:.2}s)",
                    self.fetch.min_wait.as_secs_f64(),
                    self.fetch.max_wait.as_secs_f64()
                ),
            ));
        }
        if let Err(e) = url::Url::parse(&self.fetch.base_url) {
            return Err(Error::config(
                "fetch.base_url",
                format!("'{}' is not a valid URL: {}", self.fetch.base_url, e),
            ));
        }
        if self.batch.batch_size == 0 {
            return Err(Error::config(
                "batch.batch_size",
                "must be greater than zero",
            ));
        }
        if self.batch.skip_network_threshold < self.batch.rate_limit_threshold {
            tracing::warn!(
                skip_network_threshold = self.batch.skip_network_threshold,
                rate_limit_threshold = self.batch.rate_limit_threshold,
                "skip-network threshold is below the single-thread threshold"
            );
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://fc2ppvdb.com/articles".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_min_wait() -> Duration {
    Duration::from_secs_f64(5.0)
}

fn default_max_wait() -> Duration {
    Duration::from_secs_f64(6.0)
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_accept() -> String {
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".to_string()
}

fn default_accept_language() -> String {
    "zh-CN,zh;q=0.9,en;q=0.8".to_string()
}

fn default_batch_size() -> usize {
    5
}

fn default_rate_limit_threshold() -> u32 {
    10
}

fn default_skip_network_threshold() -> u32 {
    20
}

fn default_single_thread_pause() -> Duration {
    Duration::from_secs_f64(2.0)
}

fn default_throttled_batch_wait() -> Duration {
    Duration::from_secs_f64(6.0)
}

fn default_throttled_after() -> u32 {
    5
}

fn default_single_thread_batch_wait() -> Duration {
    Duration::from_secs_f64(1.0)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/jellyfin")
}

fn default_result_dir() -> PathBuf {
    PathBuf::from("data/results")
}

fn default_magnet_dir() -> PathBuf {
    PathBuf::from("data/magnets")
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("data/img")
}

// Durations are written as fractional seconds (e.g. `5.0`, `0.25`)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.fetch.min_wait, Duration::from_secs(5));
        assert_eq!(config.fetch.max_wait, Duration::from_secs(6));
        assert_eq!(config.batch.batch_size, 5);
        assert_eq!(config.batch.rate_limit_threshold, 10);
        assert_eq!(config.batch.skip_network_threshold, 20);
        assert_eq!(config.batch.single_thread_pause, Duration::from_secs(2));
        assert_eq!(config.batch.throttled_batch_wait, Duration::from_secs(6));
        assert_eq!(config.batch.single_thread_batch_wait, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = Config::from_json_str(
            r#"{
                "fetch": { "max_retries": 7, "min_wait": 0.25, "max_wait": 0.5 },
                "paths": { "output_dir": "/srv/jellyfin" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.fetch.max_retries, 7);
        assert_eq!(config.fetch.min_wait, Duration::from_millis(250));
        assert_eq!(config.fetch.max_wait, Duration::from_millis(500));
        assert_eq!(config.fetch.timeout, Duration::from_secs(30));
        assert_eq!(config.paths.output_dir, PathBuf::from("/srv/jellyfin"));
        assert_eq!(config.paths.result_dir, PathBuf::from("data/results"));
        assert_eq!(config.batch.batch_size, 5);
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["fetch"]["min_wait"], serde_json::json!(5.0));
        assert_eq!(json["batch"]["single_thread_pause"], serde_json::json!(2.0));
    }

    #[test]
    fn validate_rejects_zero_retries() {
        let mut config = Config::default();
        config.fetch.max_retries = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(ref k), .. } if k == "fetch.max_retries"));
    }

    #[test]
    fn validate_rejects_inverted_wait_bounds() {
        let mut config = Config::default();
        config.fetch.min_wait = Duration::from_secs(10);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(ref k), .. } if k == "fetch.min_wait"));
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.fetch.base_url = "not a url".into();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(ref k), .. } if k == "fetch.base_url"));
    }

    #[test]
    fn validate_rejects_empty_batches() {
        let mut config = Config::default();
        config.batch.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_duration_is_a_parse_error() {
        let result = Config::from_json_str(r#"{ "fetch": { "timeout": -1.0 } }"#);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn from_json_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "batch": { "batch_size": 2 } }"#).unwrap();

        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.batch.batch_size, 2);
    }
}
