//! Client error types.

use std::fmt;
use std::path::PathBuf;

use calfeed_core::ExpandError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Fetching or parsing the feed failed.
    Provider(String),
    /// Reading or writing a file failed.
    File {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A JSON file could not be read or written.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Expansion aborted on a malformed event.
    Expand(ExpandError),
    /// The watch loop stopped with an error.
    Watch(String),
}

impl ClientError {
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Provider(msg) => write!(f, "feed error: {}", msg),
            Self::File { path, source } => write!(f, "{}: {}", path.display(), source),
            Self::Json { path, source } => {
                write!(f, "{}: invalid JSON: {}", path.display(), source)
            }
            Self::Expand(err) => write!(f, "expansion failed: {}", err),
            Self::Watch(msg) => write!(f, "watch stopped: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::File { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Expand(err) => Some(err),
            _ => None,
        }
    }
}

impl From<calfeed_providers::ProviderError> for ClientError {
    fn from(err: calfeed_providers::ProviderError) -> Self {
        Self::Provider(err.to_string())
    }
}

impl From<ExpandError> for ClientError {
    fn from(err: ExpandError) -> Self {
        Self::Expand(err)
    }
}

impl From<calfeed_server::ServerError> for ClientError {
    fn from(err: calfeed_server::ServerError) -> Self {
        Self::Watch(err.to_string())
    }
}
