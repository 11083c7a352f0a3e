//! `trustana-serpapi-csv`: Google organic results for a product, as CSV.
//!
//! fetch_product → build_query → search_google → export_to_csv

use aeo_search::SerpApiClient;

use super::{RunSteps, SearchExportResult, WorkflowContext};
use crate::credentials::{Credentials, SERPAPI_API_KEY};
use crate::error::Result;

/// Run the search-and-export workflow. It takes no input.
///
/// # Errors
///
/// Missing catalogue or SerpAPI key, a catalogue failure, a SerpAPI
/// failure or an export failure. With a single provider there is nothing
/// to isolate, so a search failure fails the run.
pub async fn run(ctx: &WorkflowContext, steps: &RunSteps) -> Result<SearchExportResult> {
    let subjects = ctx.subject_client()?;
    let serp_key = Credentials::require(&ctx.credentials.serpapi, SERPAPI_API_KEY)?;
    let search = SerpApiClient::new(&ctx.config.search.serpapi, serp_key)?;

    steps.enter("fetch_product")?;
    let subject = subjects.fetch_first().await?;

    steps.enter("build_query")?;
    let query = subject.search_query();
    tracing::info!(%query, "search query built");

    steps.enter("search_google")?;
    let results = search.search(&query).await?;

    steps.enter("export_to_csv")?;
    let path = ctx.exporter.write_search(&subject, &results)?;

    Ok(SearchExportResult {
        product_name: subject.name,
        brand: subject.brand,
        sku: subject.identifier,
        search_query: query,
        search_results_count: results.len(),
        artifact_path: path.display().to_string(),
        search_results: results,
    })
}
