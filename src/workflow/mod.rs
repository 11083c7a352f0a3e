//! Workflow execution.
//!
//! A run executes exactly one workflow from a closed set, selected by its
//! `flow_id`. Each workflow checks its preconditions before doing any
//! network work, then reports its phases through [`RunSteps`]; the first
//! phase moves the run from `starting` to `running`.
//!
//! Failures split into two paths:
//!
//! - run-fatal errors (missing input or credential, catalogue failure,
//!   translation failure, export failure) are returned as [`RunnerError`]
//!   and fail the whole run;
//! - answer-engine failures are absorbed by the fan-out and only show up as
//!   per-provider errors inside a completed result.

pub mod catalog;
pub mod localization;
pub mod presence;
pub mod search_export;

use std::collections::BTreeMap;
use std::sync::Arc;

use aeo_search::{Citation, OrganicResult, Provider, ProviderScore};
use serde::Serialize;
use serde_json::Value;

use crate::config::RunnerConfig;
use crate::credentials::{Credentials, TRUSTANA_API_KEY};
use crate::error::{Result, RunnerError};
use crate::export::CsvExporter;
use crate::runs::RunRegistry;
use crate::subject::SubjectClient;

pub use catalog::{WorkflowCatalog, WorkflowSummary};

/// The workflows this runner can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Answer-engine visibility score for a retailer domain.
    AeoVisibility,
    /// Google organic results for a product, exported to CSV.
    SearchExport,
    /// Translation of selected product attributes.
    Localization,
}

impl Flow {
    /// Every workflow, in catalogue order.
    pub const ALL: [Flow; 3] = [Self::AeoVisibility, Self::SearchExport, Self::Localization];

    /// Resolve a `flow_id`.
    pub fn from_id(flow_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flow| flow.id() == flow_id)
    }

    /// The stable identifier callers use to select this workflow.
    pub fn id(self) -> &'static str {
        match self {
            Self::AeoVisibility => "aeo-visibility-score",
            Self::SearchExport => "trustana-serpapi-csv",
            Self::Localization => "localization",
        }
    }
}

/// Result of the visibility workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibilityResult {
    pub product_id: String,
    pub product_name: String,
    pub brand: String,
    pub retailer_domain: String,
    /// Mean of the non-zero provider scores, one decimal place.
    pub overall_score: f64,
    /// Providers with a non-zero score.
    pub engines_with_presence: usize,
    pub per_provider: BTreeMap<Provider, ProviderScore>,
    pub citations_by_provider: BTreeMap<Provider, Vec<Citation>>,
    /// Providers that contributed nothing, with the reason.
    pub provider_errors: BTreeMap<Provider, String>,
    pub artifact_path: String,
}

/// Result of the search-and-export workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchExportResult {
    pub product_name: String,
    pub brand: String,
    pub sku: Option<String>,
    pub search_query: String,
    pub search_results_count: usize,
    pub artifact_path: String,
    pub search_results: Vec<OrganicResult>,
}

/// Result of the localization workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalizationResult {
    pub product_id: String,
    pub product_name: String,
    pub brand: String,
    pub target_language: String,
    pub original_fields: BTreeMap<String, String>,
    pub translated_fields: BTreeMap<String, String>,
    pub field_count: usize,
}

/// The result attached to a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunOutput {
    Visibility(VisibilityResult),
    SearchExport(SearchExportResult),
    Localization(LocalizationResult),
}

/// Everything a workflow needs besides its input.
#[derive(Debug)]
pub struct WorkflowContext {
    pub config: RunnerConfig,
    pub credentials: Credentials,
    pub exporter: CsvExporter,
}

impl WorkflowContext {
    /// Build a context writing artifacts to `config.paths.output_dir`.
    pub fn new(config: RunnerConfig, credentials: Credentials) -> Self {
        let exporter = CsvExporter::new(config.paths.output_dir.clone());
        Self {
            config,
            credentials,
            exporter,
        }
    }

    /// Catalogue client using the mandatory catalogue key.
    ///
    /// # Errors
    ///
    /// [`RunnerError::Precondition`] when `TRUSTANA_API_KEY` is absent.
    pub fn subject_client(&self) -> Result<SubjectClient> {
        let key = Credentials::require(&self.credentials.trustana, TRUSTANA_API_KEY)?;
        SubjectClient::new(&self.config.subject, key)
    }
}

/// Reports phase boundaries of one run to the registry.
#[derive(Debug, Clone)]
pub struct RunSteps {
    registry: RunRegistry,
    run_id: String,
}

impl RunSteps {
    pub fn new(registry: RunRegistry, run_id: impl Into<String>) -> Self {
        Self {
            registry,
            run_id: run_id.into(),
        }
    }

    /// Enter `step`.
    ///
    /// # Errors
    ///
    /// Fails if the run is unknown or already terminal.
    pub fn enter(&self, step: &str) -> Result<()> {
        self.registry.begin_step(&self.run_id, step)
    }
}

/// Drive one run to a terminal state.
///
/// Never returns an error: every outcome is committed to the registry.
pub async fn execute(
    ctx: Arc<WorkflowContext>,
    registry: RunRegistry,
    run_id: String,
    flow_id: String,
    input: Value,
) {
    let steps = RunSteps::new(registry.clone(), run_id.clone());

    let outcome = match Flow::from_id(&flow_id) {
        Some(Flow::AeoVisibility) => presence::run(&ctx, &steps, &input)
            .await
            .map(RunOutput::Visibility),
        Some(Flow::SearchExport) => search_export::run(&ctx, &steps)
            .await
            .map(RunOutput::SearchExport),
        Some(Flow::Localization) => localization::run(&ctx, &steps, &input)
            .await
            .map(RunOutput::Localization),
        None => Err(RunnerError::UnsupportedWorkflow(flow_id.clone())),
    };

    let committed = match outcome {
        Ok(output) => {
            tracing::info!(%run_id, %flow_id, "run completed");
            registry.complete(&run_id, output)
        }
        Err(err) => {
            tracing::error!(%run_id, %flow_id, error = %err, "run failed");
            registry.fail(&run_id, err.to_string())
        }
    };

    if let Err(err) = committed {
        tracing::error!(%run_id, error = %err, "could not record run outcome");
    }
}

/// A non-empty string input field. Numbers are accepted and rendered.
pub(crate) fn input_text(input: &Value, key: &str) -> Option<String> {
    match input.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::runs::RunStatus;
    use serde_json::json;

    #[test]
    fn flow_ids_roundtrip() {
        for flow in Flow::ALL {
            assert_eq!(Flow::from_id(flow.id()), Some(flow));
        }
        assert_eq!(Flow::from_id("aeo-visibility-score"), Some(Flow::AeoVisibility));
        assert!(Flow::from_id("unknown").is_none());
    }

    #[test]
    fn input_text_accepts_strings_and_numbers() {
        let input = json!({"a": " x ", "b": 42, "c": "", "d": null, "e": true});
        assert_eq!(input_text(&input, "a").as_deref(), Some("x"));
        assert_eq!(input_text(&input, "b").as_deref(), Some("42"));
        assert!(input_text(&input, "c").is_none());
        assert!(input_text(&input, "d").is_none());
        assert!(input_text(&input, "e").is_none());
        assert!(input_text(&json!(null), "a").is_none());
    }

    #[tokio::test]
    async fn unsupported_flow_fails_the_run() {
        let registry = RunRegistry::new();
        let ctx = Arc::new(WorkflowContext::new(
            RunnerConfig::default(),
            Credentials::default(),
        ));
        let id = registry.create("bogus", "default", Value::Null);

        execute(ctx, registry.clone(), id.clone(), "bogus".into(), Value::Null).await;

        let run = registry.get(&id).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("Unsupported workflow: bogus"));
    }

    #[tokio::test]
    async fn missing_catalogue_key_fails_before_running() {
        let registry = RunRegistry::new();
        let ctx = Arc::new(WorkflowContext::new(
            RunnerConfig::default(),
            Credentials::default(),
        ));
        let id = registry.create("trustana-serpapi-csv", "default", Value::Null);

        execute(
            ctx,
            registry.clone(),
            id.clone(),
            "trustana-serpapi-csv".into(),
            Value::Null,
        )
        .await;

        let run = registry.get(&id).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("TRUSTANA_API_KEY not set"));
        assert!(run.current_step.is_none());
    }
}
