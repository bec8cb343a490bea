use thiserror::Error;

/// Failure of a single outbound HTTP exchange, after the retry budget is spent.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("connection to {url} failed: {source}")]
    ConnectionFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid request URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl TransportError {
    /// Timeouts, bad statuses and connection failures are all retried the
    /// same way. A request that cannot be built never will be.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::HttpStatus { .. } | Self::ConnectionFailed { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to parse {source_name} page: {reason}")]
    Parse { source_name: String, reason: String },
}
