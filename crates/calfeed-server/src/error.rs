//! Scheduler error types.

use thiserror::Error;

/// Result type for scheduler operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can stop the refresh loop.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The job failed too many times in a row.
    #[error("giving up after {failures} consecutive failures: {last_error}")]
    TooManyFailures { failures: u32, last_error: String },

    /// The scheduler loop was started twice.
    #[error("scheduler is already running")]
    AlreadyRunning,

    /// Installing a signal handler failed.
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

impl ServerError {
    pub fn too_many_failures(failures: u32, last_error: impl Into<String>) -> Self {
        Self::TooManyFailures {
            failures,
            last_error: last_error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = ServerError::too_many_failures(5, "network_error: connection refused");
        assert_eq!(
            err.to_string(),
            "giving up after 5 consecutive failures: network_error: connection refused"
        );
        assert_eq!(
            ServerError::AlreadyRunning.to_string(),
            "scheduler is already running"
        );
    }
}
