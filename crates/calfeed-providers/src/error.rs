//! Errors raised while configuring, downloading or parsing a feed.

use reqwest::StatusCode;
use thiserror::Error;

/// A specialized Result type for feed operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Why a feed could not be turned into events.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The URL does not parse.
    #[error("invalid feed URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Only http, https and webcal feeds can be fetched.
    #[error("unsupported feed URL scheme '{0}'")]
    UnsupportedScheme(String),

    /// The default timezone is not an IANA zone name.
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    /// The HTTP client could not be built.
    #[error("failed to set up HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request did not complete (DNS, connect, TLS, timeout, body read).
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("feed server returned {status}: {reason}")]
    Status { status: StatusCode, reason: String },

    /// The body is not a usable iCalendar document.
    #[error("invalid feed content: {0}")]
    InvalidContent(String),
}

impl ProviderError {
    /// Builds the error for a non-success HTTP status.
    ///
    /// Client errors get a fixed explanation, other statuses keep the
    /// first line of the response body.
    pub fn status(status: StatusCode, body: &str) -> Self {
        let reason = match status {
            StatusCode::UNAUTHORIZED => "feed requires authentication".to_string(),
            StatusCode::FORBIDDEN => "access to feed denied".to_string(),
            StatusCode::NOT_FOUND => "feed not found".to_string(),
            StatusCode::TOO_MANY_REQUESTS => "too many requests".to_string(),
            _ => body.lines().next().unwrap_or_default().trim().to_string(),
        };
        Self::Status { status, reason }
    }
}
