//! SerpAPI organic Google results.
//!
//! Unlike the answer engines this client returns ranked organic results
//! directly; it backs the non-scoring search-and-export workflow.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SerpApiSettings;
use crate::error::SearchError;
use crate::http;

/// One organic search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganicResult {
    /// Rank reported by the search engine.
    pub position: Option<u32>,
    /// Result title.
    pub title: String,
    /// Result URL.
    pub link: String,
    /// Text snippet.
    pub snippet: String,
    /// Breadcrumb-style display URL.
    pub displayed_link: String,
}

/// SerpAPI `/search` client.
pub struct SerpApiClient {
    settings: SerpApiSettings,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for SerpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerpApiClient")
            .field("engine", &self.settings.engine)
            .field("base_url", &self.settings.base_url)
            .finish()
    }
}

impl SerpApiClient {
    /// Create a client from settings and an API key.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: &SerpApiSettings, api_key: impl Into<String>) -> Result<Self, SearchError> {
        let client = http::build_client(settings.timeout_seconds)?;
        Ok(Self {
            settings: settings.clone(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Run one organic search.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] for transport faults, non-success statuses
    /// or a non-JSON body. A response without `organic_results` is an
    /// empty result set, not an error.
    pub async fn search(&self, query: &str) -> Result<Vec<OrganicResult>, SearchError> {
        tracing::info!(query, "searching SerpAPI");

        let num = self.settings.num_results.to_string();
        let request = self
            .client
            .get(format!("{}/search", self.settings.base_url))
            .query(&[
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("engine", self.settings.engine.as_str()),
                ("num", num.as_str()),
                ("hl", self.settings.language.as_str()),
            ]);

        let body = http::send_json("serpapi", request).await?;
        let results = parse_organic_results(&body);
        tracing::info!(count = results.len(), "SerpAPI returned results");
        Ok(results)
    }
}

/// Extract `organic_results` from a SerpAPI response, skipping entries
/// that are not objects.
pub fn parse_organic_results(body: &Value) -> Vec<OrganicResult> {
    body.get("organic_results")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}
