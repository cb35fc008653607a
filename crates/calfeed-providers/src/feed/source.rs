//! iCalendar feed source.

use tracing::{debug, info};

use crate::error::ProviderResult;
use crate::source::{BoxFuture, CalendarSource, FetchResult};

use super::client::FeedClient;
use super::config::FeedConfig;
use super::ics::{ParseOptions, parse_ics_content};

/// Fetches events from a published iCalendar feed.
pub struct IcsFeedSource {
    client: FeedClient,
    options: ParseOptions,
}

impl IcsFeedSource {
    /// Creates a new feed source with the given configuration.
    pub fn new(config: FeedConfig) -> ProviderResult<Self> {
        let options = ParseOptions {
            default_timezone: config.default_timezone,
            horizon_days: config.horizon_days,
        };
        let client = FeedClient::new(config)?;

        Ok(Self { client, options })
    }

    pub fn config(&self) -> &FeedConfig {
        self.client.config()
    }

    async fn fetch_and_parse(&self) -> ProviderResult<FetchResult> {
        debug!(url = %self.client.config().url_str(), "Fetching feed");

        let body = self.client.fetch().await?;
        let parsed = parse_ics_content(&body, &self.options)?;
        let result = FetchResult::with_events(parsed.events).with_skipped(parsed.skipped);

        info!(
            events = result.events.len(),
            recurring = result.recurring_count(),
            skipped = result.skipped,
            "Fetched feed"
        );
        Ok(result)
    }
}

impl CalendarSource for IcsFeedSource {
    fn name(&self) -> &str {
        "ics"
    }

    fn fetch_events(&self) -> BoxFuture<'_, ProviderResult<FetchResult>> {
        Box::pin(self.fetch_and_parse())
    }
}
