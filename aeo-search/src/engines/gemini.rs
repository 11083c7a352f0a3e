//! Gemini answer engine with Google Search grounding.
//!
//! Gemini returns its sources as grounding chunks in the candidate's
//! `groundingMetadata`, so its payload is always
//! [`ProviderPayload::Structured`].

use serde_json::{json, Value};

use crate::config::{ProviderSettings, SearchConfig};
use crate::engine::AnswerEngine;
use crate::error::SearchError;
use crate::http;
use crate::types::{Provider, ProviderPayload, RawCitation};

/// Gemini `generateContent` client with the `google_search` tool enabled.
pub struct GeminiEngine {
    settings: ProviderSettings,
    api_key: String,
    temperature: f64,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiEngine")
            .field("model", &self.settings.model)
            .field("base_url", &self.settings.base_url)
            .finish()
    }
}

impl GeminiEngine {
    /// Create a client from the shared config and an API key.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig, api_key: impl Into<String>) -> Result<Self, SearchError> {
        let settings = config.gemini.clone();
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
            "contents": [{
                "parts": [{
                    "text": format!(
                        "Search for: {subject}\n\nProvide results with source URLs. List all relevant URLs you find."
                    )
                }]
            }],
            "tools": [{ "google_search": {} }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens,
            }
        })
    }
}

impl AnswerEngine for GeminiEngine {
    async fn query(&self, subject: &str) -> Result<ProviderPayload, SearchError> {
        tracing::debug!(subject, model = %self.settings.model, "Gemini grounded search");

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url, self.settings.model
        );
        let request = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.build_body(subject));

        let body = http::send_json(Provider::Gemini.name(), request).await?;
        parse_gemini_response(&body)
    }

    fn provider(&self) -> Provider {
        Provider::Gemini
    }
}

/// Map a `generateContent` response onto a structured payload.
///
/// Text parts of the first candidate are concatenated into the answer;
/// every grounding chunk with a `web` entry becomes a citation in order.
///
/// # Errors
///
/// Returns [`SearchError::Provider`] when the response has no candidates.
pub fn parse_gemini_response(body: &Value) -> Result<ProviderPayload, SearchError> {
    let Some(candidate) = body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    else {
        return Err(SearchError::Provider("No response".into()));
    };

    let answer: String = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    let citations = candidate
        .pointer("/groundingMetadata/groundingChunks")
        .and_then(Value::as_array)
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| chunk.get("web"))
                .filter(|web| web.as_object().is_some_and(|o| !o.is_empty()))
                .map(|web| RawCitation {
                    url: web.get("uri").and_then(Value::as_str).map(String::from),
                    title: web.get("title").and_then(Value::as_str).map(String::from),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ProviderPayload::Structured { answer, citations })
}
