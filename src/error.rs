use reqwest::StatusCode;
use thiserror::Error;

/// A feed could not be fetched or understood. Every variant means the data
/// is unavailable for this request; retrying is left to the caller.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to fetch {feed}: {source}")]
    Http {
        feed: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{feed} returned {status}")]
    Status {
        feed: &'static str,
        status: StatusCode,
    },
    #[error("failed to parse {feed}: {source}")]
    Parse {
        feed: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("no ODPT consumer key configured")]
    MissingToken,
}
