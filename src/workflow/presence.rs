//! `aeo-visibility-score`: how prominently answer engines cite a retailer.
//!
//! fetch_product → search_ai_engines → calculate_scores → export_to_csv

use std::collections::BTreeMap;

use aeo_search::orchestrator::fanout::query_providers;
use aeo_search::orchestrator::scoring::{overall_score, providers_with_presence};
use aeo_search::{Provider, ProviderPayload, ProviderReport};
use serde_json::Value;

use super::{RunSteps, VisibilityResult, WorkflowContext, input_text};
use crate::error::{Result, RunnerError};

struct PresenceInput {
    product_id: String,
    retailer_domain: String,
}

impl PresenceInput {
    fn parse(input: &Value) -> Result<Self> {
        let product_id = input_text(input, "product_id")
            .ok_or_else(|| RunnerError::Precondition("product_id is required".into()))?;
        let retailer_domain = input_text(input, "retailer_domain")
            .ok_or_else(|| RunnerError::Precondition("retailer_domain is required".into()))?;
        Ok(Self {
            product_id,
            retailer_domain,
        })
    }
}

/// Score every settled payload against `domain`.
///
/// Returns the per-provider scores, citations and errors, plus the overall
/// score and the number of providers with presence.
pub fn score_payloads(
    payloads: &BTreeMap<Provider, ProviderPayload>,
    domain: &str,
) -> ScoredProviders {
    let reports: BTreeMap<Provider, ProviderReport> = payloads
        .iter()
        .map(|(provider, payload)| (*provider, ProviderReport::from_payload(payload, domain)))
        .collect();

    let scores = || reports.values().map(|r| r.score.score);
    let mut scored = ScoredProviders {
        overall_score: overall_score(scores()),
        engines_with_presence: providers_with_presence(scores()),
        ..Default::default()
    };
    for (provider, report) in reports {
        if let Some(error) = report.error {
            scored.provider_errors.insert(provider, error);
        }
        scored.per_provider.insert(provider, report.score);
        scored.citations_by_provider.insert(provider, report.citations);
    }
    scored
}

/// Aggregated scoring output across providers.
#[derive(Debug, Default)]
pub struct ScoredProviders {
    pub overall_score: f64,
    pub engines_with_presence: usize,
    pub per_provider: BTreeMap<Provider, aeo_search::ProviderScore>,
    pub citations_by_provider: BTreeMap<Provider, Vec<aeo_search::Citation>>,
    pub provider_errors: BTreeMap<Provider, String>,
}

/// Run the visibility workflow.
///
/// # Errors
///
/// Missing `product_id`, `retailer_domain` or catalogue key, a catalogue
/// failure, invalid search configuration or an export failure. Answer
/// engine failures are recorded per provider instead.
pub async fn run(
    ctx: &WorkflowContext,
    steps: &RunSteps,
    input: &Value,
) -> Result<VisibilityResult> {
    let input = PresenceInput::parse(input)?;
    let subjects = ctx.subject_client()?;
    ctx.config.search.validate()?;
    let keys = ctx.credentials.provider_keys();

    steps.enter("fetch_product")?;
    let subject = subjects.fetch_first().await?;
    let product_id = subject.identifier.clone().unwrap_or(input.product_id);
    let query = subject.search_query();
    tracing::info!(%product_id, %query, domain = %input.retailer_domain, "measuring visibility");

    steps.enter("search_ai_engines")?;
    let payloads = query_providers(&query, &ctx.config.search, &keys).await?;

    steps.enter("calculate_scores")?;
    let scored = score_payloads(&payloads, &input.retailer_domain);
    tracing::info!(
        overall = scored.overall_score,
        engines_with_presence = scored.engines_with_presence,
        "visibility scored"
    );

    let mut result = VisibilityResult {
        product_id,
        product_name: subject.name,
        brand: subject.brand,
        retailer_domain: input.retailer_domain,
        overall_score: scored.overall_score,
        engines_with_presence: scored.engines_with_presence,
        per_provider: scored.per_provider,
        citations_by_provider: scored.citations_by_provider,
        provider_errors: scored.provider_errors,
        artifact_path: String::new(),
    };

    steps.enter("export_to_csv")?;
    let path = ctx.exporter.write_visibility(&result)?;
    result.artifact_path = path.display().to_string();
    Ok(result)
}
