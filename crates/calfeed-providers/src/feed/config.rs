//! iCalendar feed configuration.

use std::time::Duration;

use chrono_tz::Tz;
use url::Url;

use crate::error::{ProviderError, ProviderResult};

/// Configuration for fetching and parsing an iCalendar feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Feed URL. `webcal://` URLs are fetched over HTTPS.
    pub url: Url,

    /// Zone for floating times and all-day dates.
    pub default_timezone: Tz,

    /// Days after the anchor date used as the end of rules without UNTIL.
    ///
    /// `None` leaves such rules without an until date, which the expander
    /// treats as malformed.
    pub horizon_days: Option<u32>,

    /// Whether to verify TLS certificates.
    pub verify_tls: bool,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl FeedConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration for the given feed URL.
    ///
    /// # Errors
    ///
    /// Fails if the URL does not parse or is not http, https or webcal.
    pub fn new(url: impl AsRef<str>) -> ProviderResult<Self> {
        let url = parse_feed_url(url.as_ref())?;
        Ok(Self {
            url,
            default_timezone: Tz::UTC,
            horizon_days: None,
            verify_tls: true,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calfeed/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Sets the default timezone.
    pub fn with_default_timezone(mut self, tz: Tz) -> Self {
        self.default_timezone = tz;
        self
    }

    /// Sets the default timezone from an IANA name such as `Asia/Tokyo`.
    ///
    /// # Errors
    ///
    /// Fails with [`ProviderError::UnknownTimezone`] for unknown names.
    pub fn with_timezone_name(self, name: &str) -> ProviderResult<Self> {
        let tz = name
            .parse::<Tz>()
            .map_err(|_| ProviderError::UnknownTimezone(name.to_string()))?;
        Ok(self.with_default_timezone(tz))
    }

    /// Sets the horizon for open-ended rules.
    pub fn with_horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = Some(days);
        self
    }

    /// Disables TLS verification (for testing only).
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the URL as a string.
    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }
}

/// Parses a feed URL, rewriting `webcal://` to `https://`.
fn parse_feed_url(raw: &str) -> ProviderResult<Url> {
    let rewritten;
    let raw = match raw.strip_prefix("webcal://") {
        Some(rest) => {
            rewritten = format!("https://{}", rest);
            rewritten.as_str()
        }
        None => raw,
    };

    let url = Url::parse(raw).map_err(|source| ProviderError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ProviderError::UnsupportedScheme(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_creation() {
        let config = FeedConfig::new("https://calendar.example.com/public/basic.ics").unwrap();
        assert_eq!(
            config.url_str(),
            "https://calendar.example.com/public/basic.ics"
        );
        assert_eq!(config.default_timezone, Tz::UTC);
        assert!(config.horizon_days.is_none());
        assert!(config.verify_tls);
        assert!(config.user_agent.starts_with("calfeed/"));
    }

    #[test]
    fn webcal_is_fetched_over_https() {
        let config = FeedConfig::new("webcal://calendar.example.com/feed.ics").unwrap();
        assert_eq!(config.url.scheme(), "https");
        assert_eq!(config.url_str(), "https://calendar.example.com/feed.ics");
    }

    #[test]
    fn builder_methods() {
        let config = FeedConfig::new("https://calendar.example.com/feed.ics")
            .unwrap()
            .with_timezone_name("Asia/Tokyo")
            .unwrap()
            .with_horizon_days(90)
            .with_insecure_tls()
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent");

        assert_eq!(config.default_timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(config.horizon_days, Some(90));
        assert!(!config.verify_tls);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let err = FeedConfig::new("https://calendar.example.com/feed.ics")
            .unwrap()
            .with_timezone_name("Mars/Olympus")
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownTimezone(ref name) if name == "Mars/Olympus"));
    }

    #[test]
    fn invalid_urls_are_rejected() {
        assert!(matches!(
            FeedConfig::new("not a url"),
            Err(ProviderError::InvalidUrl { .. })
        ));
        assert!(matches!(
            FeedConfig::new("ftp://example.com/feed.ics"),
            Err(ProviderError::UnsupportedScheme(ref scheme)) if scheme == "ftp"
        ));
    }
}
