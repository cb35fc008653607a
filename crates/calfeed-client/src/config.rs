//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calfeed/config.toml` by default:
//!
//! ```toml
//! [feed]
//! url = "webcal://calendar.example.com/team.ics"
//! default_timezone = "Asia/Tokyo"
//!
//! [paths]
//! calendar = "calendar.json"
//! expanded = "expanded-calendar.json"
//!
//! [expand]
//! on_malformed = "skip"
//!
//! [watch]
//! interval_secs = 900
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use calfeed_core::MalformedPolicy;
use calfeed_providers::FeedConfig;
use calfeed_server::SchedulerConfig;

use crate::error::{ClientError, ClientResult};

/// Configuration for the calfeed client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub feed: FeedSettings,
    pub paths: PathSettings,
    pub expand: ExpandSettings,
    pub watch: WatchSettings,
}

/// Where and how to fetch the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// Feed URL (`http`, `https` or `webcal`).
    pub url: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// IANA zone for floating times and all-day events.
    pub default_timezone: String,

    /// End open-ended rules this many days after their first occurrence.
    /// `0` leaves them unbounded, which makes them malformed.
    pub horizon_days: u32,
}

impl FeedSettings {
    pub const DEFAULT_HORIZON_DAYS: u32 = 365;
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: FeedConfig::DEFAULT_TIMEOUT_SECS,
            default_timezone: "UTC".to_string(),
            horizon_days: Self::DEFAULT_HORIZON_DAYS,
        }
    }
}

/// Output file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Events as fetched from the feed.
    pub calendar: PathBuf,

    /// Expanded occurrences.
    pub expanded: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            calendar: PathBuf::from("calendar.json"),
            expanded: PathBuf::from("expanded-calendar.json"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandSettings {
    /// `fail` aborts on the first malformed recurring event, `skip` drops it.
    pub on_malformed: MalformedPolicy,
}

/// Watch mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Seconds between refreshes.
    pub interval_secs: u64,

    /// Stop after this many consecutive failed refreshes.
    pub max_failures: u32,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            interval_secs: 900,
            max_failures: 10,
        }
    }
}

impl WatchSettings {
    /// Builds the scheduler configuration, with an optional interval override.
    pub fn to_scheduler_config(&self, interval_override: Option<u64>) -> SchedulerConfig {
        let interval = interval_override.unwrap_or(self.interval_secs).max(1);
        SchedulerConfig::new(Duration::from_secs(interval)).with_max_failures(self.max_failures)
    }
}

impl FeedSettings {
    /// Builds the feed configuration. `url_override` takes precedence over
    /// the configured URL.
    pub fn to_feed_config(&self, url_override: Option<&str>) -> ClientResult<FeedConfig> {
        let url = url_override.or(self.url.as_deref()).ok_or_else(|| {
            ClientError::Config(
                "no feed URL: set [feed] url in the config file or pass --url".to_string(),
            )
        })?;

        let mut config = FeedConfig::new(url)?
            .with_timezone_name(&self.default_timezone)?
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if self.horizon_days > 0 {
            config = config.with_horizon_days(self.horizon_days);
        }
        Ok(config)
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if it does
    /// not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calfeed")
    }

    /// Checks that the configuration can drive a sync.
    pub fn validate(&self) -> ClientResult<()> {
        self.feed.to_feed_config(None)?;

        if self.watch.interval_secs == 0 {
            return Err(ClientError::Config(
                "watch.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.paths.calendar == self.paths.expanded {
            return Err(ClientError::Config(
                "paths.calendar and paths.expanded must differ".to_string(),
            ));
        }
        Ok(())
    }
}
