//! Shared HTTP plumbing for answer engine requests.
//!
//! Builds per-provider [`reqwest::Client`]s with the provider's timeout and
//! turns non-success responses into [`SearchError::Provider`] values that
//! carry a bounded excerpt of the body.

use std::time::Duration;

use crate::error::SearchError;

/// Maximum number of body characters kept in an error message.
pub const ERROR_BODY_LIMIT: usize = 500;

const USER_AGENT: &str = concat!("aeo-search/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] that gives up after `timeout_seconds`.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(timeout_seconds: u64) -> Result<reqwest::Client, SearchError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}

/// Keep at most [`ERROR_BODY_LIMIT`] characters of `body`.
pub fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Send `request` and decode a JSON body, mapping every failure to a
/// [`SearchError`] attributed to `provider`.
///
/// # Errors
///
/// - [`SearchError::Timeout`] / [`SearchError::Http`] for transport faults
/// - [`SearchError::Provider`] for non-success statuses
/// - [`SearchError::Parse`] when the body is not JSON
pub async fn send_json(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, SearchError> {
    let response = request
        .send()
        .await
        .map_err(|e| SearchError::from_reqwest(provider, &e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SearchError::from_reqwest(provider, &e))?;

    if !status.is_success() {
        return Err(SearchError::Provider(format!(
            "{provider} HTTP {}: {}",
            status.as_u16(),
            truncate_body(&body)
        )));
    }

    tracing::trace!(provider, bytes = body.len(), "response received");

    serde_json::from_str(&body)
        .map_err(|e| SearchError::Parse(format!("{provider} returned invalid JSON: {e}")))
}
