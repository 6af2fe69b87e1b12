//! Configuration handling for the worker.
//!
//! All options are environment-style key/value pairs. `Config::from_env`
//! reads the process environment; `Config::from_lookup` takes any key lookup
//! so tests don't need to mutate global state.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::output::OutputFormat;

/// Environment variable names.
pub const ENV_BACKEND_POST_URL: &str = "BACKEND_POST_URL";
pub const ENV_BACKEND_TIMEOUT: &str = "BACKEND_TIMEOUT";
pub const ENV_BACKEND_MAX_ATTEMPTS: &str = "BACKEND_MAX_ATTEMPTS";
pub const ENV_BACKEND_BACKOFF_SECONDS: &str = "BACKEND_BACKOFF_SECONDS";
pub const ENV_SCRAPE_INTERVAL_SECONDS: &str = "SCRAPE_INTERVAL_SECONDS";
pub const ENV_RUN_AT_START: &str = "RUN_AT_START";
pub const ENV_ALLOW_OVERLAP: &str = "ALLOW_OVERLAP";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
pub const ENV_OUTPUT_DIR: &str = "OUTPUT_DIR";
pub const ENV_OUTPUT_FORMAT: &str = "OUTPUT_FORMAT";
pub const ENV_LOCK_PATH: &str = "LOCK_PATH";
pub const ENV_FEED_URLS: &str = "FEED_URLS";

const DEFAULT_BACKEND_TIMEOUT_SECS: f64 = 15.0;
const DEFAULT_BACKEND_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKEND_BACKOFF_SECS: f64 = 2.0;
const DEFAULT_SCRAPE_INTERVAL_SECS: u64 = 600;
const DEFAULT_LOG_LEVEL: &str = "INFO";
const DEFAULT_OUTPUT_DIR: &str = "data/unlabelled";
const DEFAULT_LOCK_PATH: &str = ".scrape.lock";

/// Log line rendering selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Worker runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    backend_post_url: Option<String>,
    backend_timeout: Duration,
    backend_max_attempts: u32,
    backend_backoff: Duration,
    scrape_interval: Duration,
    run_at_start: bool,
    allow_overlap: bool,
    log_level: String,
    log_format: LogFormat,
    output_dir: PathBuf,
    output_format: OutputFormat,
    lock_path: PathBuf,
    feed_urls: Option<Vec<String>>,
}

impl Config {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_post_url = lookup(ENV_BACKEND_POST_URL)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let backend_timeout = parse_seconds(
            ENV_BACKEND_TIMEOUT,
            lookup(ENV_BACKEND_TIMEOUT),
            DEFAULT_BACKEND_TIMEOUT_SECS,
        )?;
        let backend_max_attempts: u32 = parse_number(
            ENV_BACKEND_MAX_ATTEMPTS,
            lookup(ENV_BACKEND_MAX_ATTEMPTS),
            DEFAULT_BACKEND_MAX_ATTEMPTS,
        )?;
        if backend_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: ENV_BACKEND_MAX_ATTEMPTS,
                reason: "must be at least 1".to_string(),
            });
        }
        let backend_backoff = parse_seconds(
            ENV_BACKEND_BACKOFF_SECONDS,
            lookup(ENV_BACKEND_BACKOFF_SECONDS),
            DEFAULT_BACKEND_BACKOFF_SECS,
        )?;
        let scrape_interval = Duration::from_secs(parse_number(
            ENV_SCRAPE_INTERVAL_SECONDS,
            lookup(ENV_SCRAPE_INTERVAL_SECONDS),
            DEFAULT_SCRAPE_INTERVAL_SECS,
        )?);

        let run_at_start = parse_flag(lookup(ENV_RUN_AT_START), true);
        let allow_overlap = parse_flag(lookup(ENV_ALLOW_OVERLAP), false);

        let log_level = lookup(ENV_LOG_LEVEL)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let log_format = match lookup(ENV_LOG_FORMAT).map(|v| v.trim().to_lowercase()) {
            None => LogFormat::Text,
            Some(v) if v.is_empty() || v == "text" => LogFormat::Text,
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) => {
                return Err(ConfigError::InvalidValue {
                    field: ENV_LOG_FORMAT,
                    reason: format!("expected 'text' or 'json', got '{v}'"),
                });
            }
        };

        let output_dir = lookup(ENV_OUTPUT_DIR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        let output_format = match lookup(ENV_OUTPUT_FORMAT) {
            Some(v) if !v.trim().is_empty() => {
                v.parse::<OutputFormat>()
                    .map_err(|reason| ConfigError::InvalidValue {
                        field: ENV_OUTPUT_FORMAT,
                        reason,
                    })?
            }
            _ => OutputFormat::Text,
        };
        let lock_path = lookup(ENV_LOCK_PATH)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCK_PATH));

        let feed_urls = lookup(ENV_FEED_URLS)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|urls| !urls.is_empty());

        Ok(Self {
            backend_post_url,
            backend_timeout,
            backend_max_attempts,
            backend_backoff,
            scrape_interval,
            run_at_start,
            allow_overlap,
            log_level,
            log_format,
            output_dir,
            output_format,
            lock_path,
            feed_urls,
        })
    }

    /// Upload endpoint; `None` disables uploading.
    pub fn backend_post_url(&self) -> Option<&str> {
        self.backend_post_url.as_deref()
    }
    pub fn backend_timeout(&self) -> Duration {
        self.backend_timeout
    }
    pub fn backend_max_attempts(&self) -> u32 {
        self.backend_max_attempts
    }
    /// Initial backoff between failed upload attempts.
    pub fn backend_backoff(&self) -> Duration {
        self.backend_backoff
    }
    pub fn scrape_interval(&self) -> Duration {
        self.scrape_interval
    }
    pub fn run_at_start(&self) -> bool {
        self.run_at_start
    }
    pub fn allow_overlap(&self) -> bool {
        self.allow_overlap
    }
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
    /// Feed URL override from `FEED_URLS`, if set.
    pub fn feed_urls(&self) -> Option<&[String]> {
        self.feed_urls.as_deref()
    }
}

fn parse_flag(value: Option<String>, default: bool) -> bool {
    match value {
        Some(v) => v.trim().to_lowercase() == "true",
        None => default,
    }
}

fn parse_number<T: std::str::FromStr>(
    field: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    match value {
        Some(v) if !v.trim().is_empty() => {
            v.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue {
                    field,
                    reason: format!("'{}': {}", v.trim(), e),
                })
        }
        _ => Ok(default),
    }
}

fn parse_seconds(
    field: &'static str,
    value: Option<String>,
    default: f64,
) -> Result<Duration, ConfigError> {
    let secs: f64 = parse_number(field, value, default)?;
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidValue {
        field,
        reason: e.to_string(),
    })
}

/// Errors that can occur while building a configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Ensure environment-variable manipulating tests run serially.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_set() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg.backend_post_url(), None);
        assert_eq!(cfg.backend_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.backend_max_attempts(), 3);
        assert_eq!(cfg.backend_backoff(), Duration::from_secs(2));
        assert_eq!(cfg.scrape_interval(), Duration::from_secs(600));
        assert!(cfg.run_at_start());
        assert!(!cfg.allow_overlap());
        assert_eq!(cfg.log_level(), "INFO");
        assert_eq!(cfg.log_format(), LogFormat::Text);
        assert_eq!(cfg.output_dir(), Path::new("data/unlabelled"));
        assert_eq!(cfg.output_format(), OutputFormat::Text);
        assert_eq!(cfg.lock_path(), Path::new(".scrape.lock"));
        assert!(cfg.feed_urls().is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = from_pairs(&[
            (ENV_BACKEND_POST_URL, " https://collector.example/api "),
            (ENV_BACKEND_TIMEOUT, "2.5"),
            (ENV_BACKEND_MAX_ATTEMPTS, "5"),
            (ENV_BACKEND_BACKOFF_SECONDS, "1"),
            (ENV_SCRAPE_INTERVAL_SECONDS, "60"),
            (ENV_RUN_AT_START, "FALSE"),
            (ENV_ALLOW_OVERLAP, "True"),
            (ENV_LOG_LEVEL, "debug"),
            (ENV_LOG_FORMAT, "json"),
            (ENV_OUTPUT_FORMAT, "json"),
            (ENV_FEED_URLS, "https://a.example/rss, ,https://b.example/feed"),
        ])
        .unwrap();

        assert_eq!(cfg.backend_post_url(), Some("https://collector.example/api"));
        assert_eq!(cfg.backend_timeout(), Duration::from_millis(2500));
        assert_eq!(cfg.backend_max_attempts(), 5);
        assert_eq!(cfg.backend_backoff(), Duration::from_secs(1));
        assert_eq!(cfg.scrape_interval(), Duration::from_secs(60));
        assert!(!cfg.run_at_start());
        assert!(cfg.allow_overlap());
        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.log_format(), LogFormat::Json);
        assert_eq!(cfg.output_format(), OutputFormat::Json);
        assert_eq!(
            cfg.feed_urls().unwrap(),
            &["https://a.example/rss".to_string(), "https://b.example/feed".to_string()]
        );
    }

    #[test]
    fn blank_endpoint_disables_upload() {
        let cfg = from_pairs(&[(ENV_BACKEND_POST_URL, "   ")]).unwrap();
        assert_eq!(cfg.backend_post_url(), None);
    }

    #[test]
    fn non_true_flags_are_false() {
        let cfg = from_pairs(&[(ENV_RUN_AT_START, "yes"), (ENV_ALLOW_OVERLAP, "1")]).unwrap();
        assert!(!cfg.run_at_start());
        assert!(!cfg.allow_overlap());
    }

    #[test]
    fn rejects_invalid_numbers() {
        let err = from_pairs(&[(ENV_SCRAPE_INTERVAL_SECONDS, "soon")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: ENV_SCRAPE_INTERVAL_SECONDS, .. }
        ));

        let err = from_pairs(&[(ENV_BACKEND_MAX_ATTEMPTS, "0")]).unwrap_err();
        assert!(err.to_string().contains(ENV_BACKEND_MAX_ATTEMPTS));

        assert!(from_pairs(&[(ENV_BACKEND_TIMEOUT, "-1")]).is_err());
        assert!(from_pairs(&[(ENV_OUTPUT_FORMAT, "csv")]).is_err());
    }

    #[test]
    fn reads_process_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe {
            env::set_var(ENV_SCRAPE_INTERVAL_SECONDS, "42");
        }
        let cfg = Config::from_env().unwrap();
        unsafe {
            env::remove_var(ENV_SCRAPE_INTERVAL_SECONDS);
        }
        assert_eq!(cfg.scrape_interval(), Duration::from_secs(42));
    }
}
