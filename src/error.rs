//! Failure types for fetching, rendering and caching.
//!
//! None of these reach the API layer: the aggregator recovers every
//! [`ScrapeError`] into an empty result.

use crate::browser::BrowserError;

/// Transport-level failure from the throttled fetcher.
#[derive(Debug, thiserror::Error)]
pub enum FetchFailure {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("http client setup failed: {0}")]
    Client(String),
}

impl FetchFailure {
    pub(crate) fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchFailure::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = e.status() {
            FetchFailure::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else if e.is_body() || e.is_decode() {
            FetchFailure::Body {
                url: url.to_string(),
                message: e.to_string(),
            }
        } else {
            FetchFailure::Connect {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchFailure::Status { status: 429, .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchFailure::Timeout { .. })
    }
}

/// Either tier of the cache failed. Always treated as a miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    #[error("cache value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Unavailable(e.to_string())
    }
}

/// Anything that stops an adapter operation.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchFailure),

    #[error(transparent)]
    Render(#[from] BrowserError),

    #[error("rendering is disabled for source {0}")]
    RenderingDisabled(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
