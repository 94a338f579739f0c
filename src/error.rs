//! Error types for the carrd extraction library.
//!
//! Only a failed fetch of the primary page is ever surfaced to the caller.
//! Everything else (unrecognized URLs, pages with unusual markup, failed
//! variant probes) degrades to a best-effort [`ExtractionResult`](crate::ExtractionResult).

use thiserror::Error;

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, CarrdError>;

/// Errors reported by a [`PageFetcher`](crate::PageFetcher).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, connection reset, ...)
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The request did not complete in time
    #[error("timed out fetching {0}")]
    Timeout(String),
}

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum CarrdError {
    /// The primary page could not be retrieved at all
    #[error("failed to fetch {url}: {source}")]
    FetchFailure {
        url: String,
        #[source]
        source: FetchError,
    },

    /// Input is not an absolute http(s) URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// General error
    #[error("Carrd extraction error: {0}")]
    Other(String),
}
