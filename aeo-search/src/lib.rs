//! # aeo-search
//!
//! Answer-engine presence measurement for a target domain.
//!
//! This crate asks several AI answer engines the same question, turns their
//! heterogeneous answers into one citation model, and scores how
//! prominently a given domain shows up in what each engine cites. It knows
//! nothing about runs or workflows; the `aeo-runner` crate drives it.
//!
//! ## Design
//!
//! - Gemini (grounded search), Perplexity and OpenAI behind one
//!   [`AnswerEngine`] trait, each returning a [`ProviderPayload`]
//! - Concurrent fan-out on spawned tasks with a bounded worker budget;
//!   one provider failing never affects the others
//! - A single normaliser for every payload shape, merging structured
//!   citations with URLs found in the answer text
//! - Position-weighted scoring: rank 1 scores 100, each rank below costs
//!   10 points, any match is worth at least 10
//!
//! ## Security
//!
//! - API keys are passed in per call and never stored in config
//! - `Debug` output of every client omits its key
//! - Subjects are logged at debug level only

pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod types;

use std::collections::BTreeMap;

pub use config::{ProviderSettings, SearchConfig, SerpApiSettings};
pub use engine::AnswerEngine;
pub use engines::{OrganicResult, ProviderEngine, SerpApiClient};
pub use error::{Result, SearchError};
pub use orchestrator::fanout::{FanOutCoordinator, QueryThunk, MISSING_CREDENTIAL};
pub use types::{Citation, Provider, ProviderPayload, ProviderScore, RawCitation};

/// Everything one presence measurement produced for a single provider.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProviderReport {
    /// Normalised citations, in rank order.
    pub citations: Vec<Citation>,
    /// Presence evaluation against the target domain.
    pub score: ProviderScore,
    /// Why the provider contributed nothing, if it failed.
    pub error: Option<String>,
}

impl ProviderReport {
    /// Normalise and score one settled payload.
    pub fn from_payload(payload: &ProviderPayload, domain: &str) -> Self {
        let citations = orchestrator::normalize::normalize(payload);
        let score = orchestrator::scoring::score_citations(&citations, domain);
        Self {
            citations,
            score,
            error: payload.error_message().map(str::to_owned),
        }
    }
}

/// Query every provider about `subject` and score `domain` against each.
///
/// Providers without a key in `keys` are reported with the
/// [`MISSING_CREDENTIAL`] error and a zero score.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if `config` is invalid. Provider
/// failures are reported per provider, never as an error here.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> aeo_search::Result<()> {
/// use std::collections::BTreeMap;
/// use aeo_search::{Provider, SearchConfig};
///
/// let mut keys = BTreeMap::new();
/// keys.insert(Provider::Perplexity, "pplx-…".to_string());
/// let reports = aeo_search::measure_presence(
///     "Acme Kettle Acme",
///     "shop.example",
///     &SearchConfig::default(),
///     &keys,
/// )
/// .await?;
/// for (provider, report) in &reports {
///     println!("{provider}: {}", report.score.score);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn measure_presence(
    subject: &str,
    domain: &str,
    config: &SearchConfig,
    keys: &BTreeMap<Provider, String>,
) -> Result<BTreeMap<Provider, ProviderReport>> {
    let payloads = orchestrator::fanout::query_providers(subject, config, keys).await?;
    Ok(payloads
        .iter()
        .map(|(provider, payload)| (*provider, ProviderReport::from_payload(payload, domain)))
        .collect())
}
