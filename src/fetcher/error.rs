//! Fetcher component-boundary error type.

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {0} timed out")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("robots.txt denies this URL")]
    RobotsDenied,

    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    /// Transient errors (network timeout, transport failure, 5xx) are
    /// retried with backoff; permanent ones (4xx, robots denial,
    /// cancellation) are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::HttpStatus(status) => *status >= 500,
            Self::RobotsDenied | Self::Cancelled => false,
        }
    }
}
