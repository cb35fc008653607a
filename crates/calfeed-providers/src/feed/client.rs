//! HTTP client for fetching iCalendar feeds.

use reqwest::{Client, Response};
use tracing::{debug, trace, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::FeedConfig;

/// HTTP client for a single feed.
pub struct FeedClient {
    client: Client,
    config: FeedConfig,
}

impl FeedClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: FeedConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self { client, config })
    }

    /// Downloads the feed body.
    pub async fn fetch(&self) -> ProviderResult<String> {
        self.get(self.config.url_str()).await
    }

    /// Performs a GET request and returns the body as text.
    pub async fn get(&self, url: &str) -> ProviderResult<String> {
        trace!(url = %url, "Sending request");

        let response = self
            .client
            .get(url)
            .header("Accept", "text/calendar, */*;q=0.5")
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                url: url.to_string(),
                source,
            })?;

        read_body(url, response).await
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }
}

/// Returns the body of a successful response, or the status error.
async fn read_body(url: &str, response: Response) -> ProviderResult<String> {
    let status = response.status();
    debug!(status = %status, "Received response");

    if status.is_success() {
        return response
            .text()
            .await
            .map_err(|source| ProviderError::Request {
                url: url.to_string(),
                source,
            });
    }

    let body = response.text().await.unwrap_or_default();
    warn!(status = %status, url = %url, "Feed request rejected");
    Err(ProviderError::status(status, &body))
}
