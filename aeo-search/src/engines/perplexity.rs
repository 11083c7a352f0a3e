//! Perplexity answer engine.
//!
//! Perplexity returns a top-level `citations` list next to the chat
//! completion. Entries are usually bare URL strings, but object entries
//! with `url`/`title` are accepted as well.

use serde_json::{json, Value};

use crate::config::{ProviderSettings, SearchConfig};
use crate::engine::AnswerEngine;
use crate::error::SearchError;
use crate::http;
use crate::types::{Provider, ProviderPayload, RawCitation};

const SYSTEM_PROMPT: &str =
    "You are a helpful search assistant. Provide detailed results with source URLs.";

/// Perplexity chat completions client with citations enabled.
pub struct PerplexityEngine {
    settings: ProviderSettings,
    api_key: String,
    temperature: f64,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for PerplexityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerplexityEngine")
            .field("model", &self.settings.model)
            .field("base_url", &self.settings.base_url)
            .finish()
    }
}

impl PerplexityEngine {
    /// Create a client from the shared config and an API key.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig, api_key: impl Into<String>) -> Result<Self, SearchError> {
        let settings = config.perplexity.clone();
        let client = http::build_client(settings.timeout_seconds)?;
        Ok(Self {
            settings,
            api_key: api_key.into(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn build_body(&self, subject: &str) -> Value {
        json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": format!("Search for: {subject}\n\nList all relevant sources and URLs.")}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "return_citations": true,
        })
    }
}

impl AnswerEngine for PerplexityEngine {
    async fn query(&self, subject: &str) -> Result<ProviderPayload, SearchError> {
        tracing::debug!(subject, model = %self.settings.model, "Perplexity search");

        let request = self
            .client
            .post(format!("{}/chat/completions", self.settings.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.build_body(subject));

        let body = http::send_json(Provider::Perplexity.name(), request).await?;
        parse_perplexity_response(&body)
    }

    fn provider(&self) -> Provider {
        Provider::Perplexity
    }
}

/// Map a Perplexity chat completion onto a structured payload.
///
/// # Errors
///
/// Returns [`SearchError::Provider`] when the response has no choices.
pub fn parse_perplexity_response(body: &Value) -> Result<ProviderPayload, SearchError> {
    let Some(choice) = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    else {
        return Err(SearchError::Provider("No response".into()));
    };

    let answer = choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let citations = body
        .get("citations")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(citation_entry).collect())
        .unwrap_or_default();

    Ok(ProviderPayload::Structured { answer, citations })
}

fn citation_entry(entry: &Value) -> Option<RawCitation> {
    match entry {
        Value::String(url) => Some(RawCitation::url(url.as_str())),
        Value::Object(obj) => Some(RawCitation {
            url: obj.get("url").and_then(Value::as_str).map(String::from),
            title: obj.get("title").and_then(Value::as_str).map(String::from),
        }),
        _ => None,
    }
}
