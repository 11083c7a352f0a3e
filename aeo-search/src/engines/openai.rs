//! OpenAI answer engine.
//!
//! Plain chat completions carry no citation metadata, so every URL has to
//! come from the answer text; the payload is [`ProviderPayload::FreeText`].

use serde_json::{json, Value};

use crate::config::{ProviderSettings, SearchConfig};
use crate::engine::AnswerEngine;
use crate::error::SearchError;
use crate::http;
use crate::types::{Provider, ProviderPayload};

const SYSTEM_PROMPT: &str = "You are a helpful search assistant. When searching, always include source URLs. Format URLs clearly.";

/// OpenAI chat completions client.
pub struct OpenAiEngine {
    settings: ProviderSettings,
    api_key: String,
    temperature: f64,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEngine")
            .field("model", &self.settings.model)
            .field("base_url", &self.settings.base_url)
            .finish()
    }
}

impl OpenAiEngine {
    /// Create a client from the shared config and an API key.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig, api_key: impl Into<String>) -> Result<Self, SearchError> {
        let settings = config.openai.clone();
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
                {"role": "user", "content": format!(
                    "Search for: {subject}\n\nProvide results with source URLs. List all relevant URLs you know about."
                )}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }
}

impl AnswerEngine for OpenAiEngine {
    async fn query(&self, subject: &str) -> Result<ProviderPayload, SearchError> {
        tracing::debug!(subject, model = %self.settings.model, "OpenAI search");

        let request = self
            .client
            .post(format!("{}/v1/chat/completions", self.settings.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.build_body(subject));

        let body = http::send_json(Provider::OpenAi.name(), request).await?;
        parse_openai_response(&body)
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }
}

/// Map a chat completion onto a free-text payload.
///
/// # Errors
///
/// Returns [`SearchError::Provider`] when the response has no choices.
pub fn parse_openai_response(body: &Value) -> Result<ProviderPayload, SearchError> {
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

    Ok(ProviderPayload::FreeText { answer })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice_content() {
        let body = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "Visit https://a.com."}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        });
        let payload = parse_openai_response(&body).expect("parse");
        assert_eq!(
            payload,
            ProviderPayload::FreeText {
                answer: "Visit https://a.com.".into()
            }
        );
    }

    #[test]
    fn missing_choices_is_provider_error() {
        let err = parse_openai_response(&json!({})).unwrap_err();
        assert!(err.to_string().contains("No response"));
    }

    #[test]
    fn body_uses_configured_model() {
        let mut config = SearchConfig::default();
        config.openai.model = "gpt-4o-mini".into();
        let engine = OpenAiEngine::new(&config, "key").expect("engine");
        assert_eq!(engine.build_body("x")["model"], "gpt-4o-mini");
    }
}
