//! Configuration management for the autopost engine
//!
//! Settings load from environment variables or a TOML file, are validated
//! once at startup, and are threaded to the components that need them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tick scheduling and selection
    pub scheduler: SchedulerConfig,

    /// Rate-limit gate seed values
    pub limiter: LimiterConfig,

    /// Publish transports
    pub publisher: PublisherConfig,

    /// Roster and backlog files
    pub store: StoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Tick scheduling and selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between tick fires
    pub interval_secs: u64,

    /// Staleness window in days for accounts that set none
    pub default_term_days: i64,

    /// Upper bound of the random pre-publish delay in seconds
    pub max_jitter_secs: u64,
}

/// Rate-limit gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Assumed remaining requests before the first real response
    pub initial_remaining: i64,

    /// Assumed reset countdown in seconds before the first real response
    pub initial_reset_secs: i64,

    /// Sleep applied to a throttled attempt, in seconds
    pub throttle_sleep_secs: u64,

    /// Optimistic remaining count restored when the countdown elapses
    pub probe_floor: i64,
}

/// Publish transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Structured API endpoint
    pub endpoint: String,

    /// Payloads at or above this many characters take the interactive path
    pub char_threshold: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Log publishes instead of sending them
    pub dry_run: bool,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Roster file
    pub accounts_path: PathBuf,

    /// Directory of per-account backlog files
    pub backlog_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let interval_secs = env_parse("AUTOPOST_INTERVAL_SECS", 60);
        let default_term_days = env_parse("AUTOPOST_DEFAULT_TERM_DAYS", 3);
        let max_jitter_secs = env_parse("AUTOPOST_MAX_JITTER_SECS", 150);

        let initial_remaining = env_parse("AUTOPOST_LIMITER_REMAINING", 10);
        let initial_reset_secs = env_parse("AUTOPOST_LIMITER_RESET_SECS", 900);
        let throttle_sleep_secs = env_parse("AUTOPOST_LIMITER_SLEEP_SECS", 15);
        let probe_floor = env_parse("AUTOPOST_LIMITER_PROBE_FLOOR", 10);

        let endpoint = std::env::var("AUTOPOST_ENDPOINT")
            .unwrap_or_else(|_| String::from("https://api.twitter.com/2/tweets"));
        let char_threshold = env_parse("AUTOPOST_CHAR_THRESHOLD", 140);
        let timeout_secs = env_parse("AUTOPOST_TIMEOUT_SECS", 30);
        let dry_run = std::env::var("AUTOPOST_DRY_RUN")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let accounts_path = std::env::var("AUTOPOST_ACCOUNTS_PATH")
            .unwrap_or_else(|_| String::from("data/accounts.json"))
            .into();
        let backlog_dir = std::env::var("AUTOPOST_BACKLOG_DIR")
            .unwrap_or_else(|_| String::from("data/backlogs"))
            .into();

        let level = std::env::var("AUTOPOST_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let format = std::env::var("AUTOPOST_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            scheduler: SchedulerConfig {
                interval_secs,
                default_term_days,
                max_jitter_secs,
            },
            limiter: LimiterConfig {
                initial_remaining,
                initial_reset_secs,
                throttle_sleep_secs,
                probe_floor,
            },
            publisher: PublisherConfig {
                endpoint,
                char_threshold,
                timeout_secs,
                dry_run,
            },
            store: StoreConfig {
                accounts_path,
                backlog_dir,
            },
            logging: LoggingConfig { level, format },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.interval_secs == 0 {
            anyhow::bail!("interval_secs must be greater than 0");
        }

        if self.scheduler.default_term_days < 0 {
            anyhow::bail!("default_term_days must not be negative");
        }

        if self.publisher.char_threshold == 0 {
            anyhow::bail!("char_threshold must be greater than 0");
        }

        if self.limiter.initial_remaining <= 0 {
            anyhow::bail!("initial_remaining must be positive");
        }

        if self.limiter.probe_floor <= 1 {
            anyhow::bail!("probe_floor must exceed the throttle watermark of 1");
        }

        if self.limiter.throttle_sleep_secs == 0 {
            anyhow::bail!("throttle_sleep_secs must be greater than 0");
        }

        Ok(())
    }

    /// Get tick interval as Duration
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.interval_secs)
    }

    /// Get transport timeout as Duration
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.publisher.timeout_secs)
    }

    /// Get throttle sleep as Duration
    #[must_use]
    pub fn throttle_sleep(&self) -> Duration {
        Duration::from_secs(self.limiter.throttle_sleep_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig {
                interval_secs: 60,
                default_term_days: 3,
                max_jitter_secs: 150,
            },
            limiter: LimiterConfig {
                initial_remaining: 10,
                initial_reset_secs: 900,
                throttle_sleep_secs: 15,
                probe_floor: 10,
            },
            publisher: PublisherConfig {
                endpoint: String::from("https://api.twitter.com/2/tweets"),
                char_threshold: 140,
                timeout_secs: 30,
                dry_run: false,
            },
            store: StoreConfig {
                accounts_path: PathBuf::from("data/accounts.json"),
                backlog_dir: PathBuf::from("data/backlogs"),
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
