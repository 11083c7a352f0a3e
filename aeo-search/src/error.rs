//! Error types for the aeo-search crate.
//!
//! All errors use stable string messages suitable for display to users
//! and for recording against a provider in a run result. No API keys
//! appear in error messages.

/// Errors that can occur while querying an answer engine.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider did not answer within its configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The provider answered with a non-success status or an empty answer.
    #[error("provider error: {0}")]
    Provider(String),

    /// The response body was not readable as the expected format.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SearchError {
    /// Classify a [`reqwest::Error`] raised while talking to `provider`.
    pub fn from_reqwest(provider: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("{provider} did not respond in time"))
        } else if err.is_decode() {
            Self::Parse(format!("{provider} response body: {err}"))
        } else {
            Self::Http(format!("{provider} request failed: {err}"))
        }
    }
}

/// Convenience type alias for aeo-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
