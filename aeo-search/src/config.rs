//! Provider configuration with sensible defaults.
//!
//! [`SearchConfig`] controls where each answer engine lives, which model it
//! runs, how long each call may take and how wide the fan-out is. API keys
//! are deliberately absent: callers supply them per query.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::types::Provider;

/// Connection settings for one answer engine.
///
/// When a provider section appears in a config file, all three fields must
/// be given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Scheme and authority of the API, without a trailing slash.
    pub base_url: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl ProviderSettings {
    fn new(base_url: &str, model: &str, timeout_seconds: u64) -> Self {
        Self {
            base_url: base_url.to_owned(),
            model: model.to_owned(),
            timeout_seconds,
        }
    }
}

/// Settings for the SerpAPI organic search client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerpApiSettings {
    /// Scheme and authority of the API.
    pub base_url: String,
    /// SerpAPI engine name.
    pub engine: String,
    /// Number of organic results requested.
    pub num_results: u32,
    /// Interface language (`hl`).
    pub language: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for SerpApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://serpapi.com".into(),
            engine: "google".into(),
            num_results: 10,
            language: "en".into(),
            timeout_seconds: 30,
        }
    }
}

/// Configuration for answer engine queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum provider calls in flight at once within one run.
    pub fan_out_width: usize,
    /// Sampling temperature sent to every answer engine.
    pub temperature: f64,
    /// Output token cap sent to every answer engine.
    pub max_tokens: u32,
    /// Gemini (grounded search) settings.
    pub gemini: ProviderSettings,
    /// Perplexity settings.
    pub perplexity: ProviderSettings,
    /// OpenAI settings.
    pub openai: ProviderSettings,
    /// SerpAPI settings (used by the non-scoring search workflow).
    pub serpapi: SerpApiSettings,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fan_out_width: 3,
            temperature: 0.1,
            max_tokens: 4096,
            gemini: ProviderSettings::new(
                "https://generativelanguage.googleapis.com",
                "gemini-2.0-flash",
                90,
            ),
            perplexity: ProviderSettings::new("https://api.perplexity.ai", "sonar", 90),
            openai: ProviderSettings::new("https://api.openai.com", "gpt-4o", 90),
            serpapi: SerpApiSettings::default(),
        }
    }
}

impl SearchConfig {
    /// Settings for the given provider.
    pub fn provider(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::Gemini => &self.gemini,
            Provider::Perplexity => &self.perplexity,
            Provider::OpenAi => &self.openai,
        }
    }

    /// Mutable settings for the given provider.
    pub fn provider_mut(&mut self, provider: Provider) -> &mut ProviderSettings {
        match provider {
            Provider::Gemini => &mut self.gemini,
            Provider::Perplexity => &mut self.perplexity,
            Provider::OpenAi => &mut self.openai,
        }
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `fan_out_width` must be greater than 0
    /// - every provider timeout must be greater than 0
    /// - every provider base URL and model must be non-empty
    /// - `serpapi.num_results` must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.fan_out_width == 0 {
            return Err(SearchError::Config(
                "fan_out_width must be greater than 0".into(),
            ));
        }
        for provider in Provider::all() {
            let settings = self.provider(*provider);
            if settings.timeout_seconds == 0 {
                return Err(SearchError::Config(format!(
                    "{provider} timeout_seconds must be greater than 0"
                )));
            }
            if settings.base_url.trim().is_empty() {
                return Err(SearchError::Config(format!(
                    "{provider} base_url must not be empty"
                )));
            }
            if settings.model.trim().is_empty() {
                return Err(SearchError::Config(format!(
                    "{provider} model must not be empty"
                )));
            }
        }
        if self.serpapi.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "serpapi timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.serpapi.num_results == 0 {
            return Err(SearchError::Config(
                "serpapi num_results must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
