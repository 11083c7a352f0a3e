//! Answer engine implementations.
//!
//! Each module provides a client for one vendor API. The three answer
//! engines implement [`crate::engine::AnswerEngine`]; SerpAPI is a plain
//! organic-results client.

pub mod gemini;
pub mod openai;
pub mod perplexity;
pub mod serpapi;

pub use gemini::GeminiEngine;
pub use openai::OpenAiEngine;
pub use perplexity::PerplexityEngine;
pub use serpapi::{OrganicResult, SerpApiClient};

use crate::config::SearchConfig;
use crate::engine::AnswerEngine;
use crate::error::SearchError;
use crate::types::{Provider, ProviderPayload};

/// Any configured answer engine, dispatched by [`Provider`].
#[derive(Debug)]
pub enum ProviderEngine {
    /// Gemini grounded search.
    Gemini(GeminiEngine),
    /// Perplexity Sonar.
    Perplexity(PerplexityEngine),
    /// OpenAI chat completions.
    OpenAi(OpenAiEngine),
}

impl ProviderEngine {
    /// Build the engine for `provider` with the given API key.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(
        provider: Provider,
        config: &SearchConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, SearchError> {
        Ok(match provider {
            Provider::Gemini => Self::Gemini(GeminiEngine::new(config, api_key)?),
            Provider::Perplexity => Self::Perplexity(PerplexityEngine::new(config, api_key)?),
            Provider::OpenAi => Self::OpenAi(OpenAiEngine::new(config, api_key)?),
        })
    }
}

impl AnswerEngine for ProviderEngine {
    async fn query(&self, subject: &str) -> Result<ProviderPayload, SearchError> {
        match self {
            Self::Gemini(engine) => engine.query(subject).await,
            Self::Perplexity(engine) => engine.query(subject).await,
            Self::OpenAi(engine) => engine.query(subject).await,
        }
    }

    fn provider(&self) -> Provider {
        match self {
            Self::Gemini(engine) => engine.provider(),
            Self::Perplexity(engine) => engine.provider(),
            Self::OpenAi(engine) => engine.provider(),
        }
    }
}
