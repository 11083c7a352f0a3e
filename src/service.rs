//! Run creation and lookup.
//!
//! [`RunService`] owns the run registry and the shared workflow context.
//! Creating a run registers it, spawns a task executing it and returns the
//! id immediately; callers poll the registry for progress.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::RunnerConfig;
use crate::credentials::Credentials;
use crate::error::{Result, RunnerError};
use crate::export::CsvExporter;
use crate::runs::{Run, RunRegistry, RunView};
use crate::workflow::{self, WorkflowCatalog, WorkflowContext};

/// Tenant assigned to runs created without one.
pub const DEFAULT_TENANT: &str = "default";

/// Creates runs and answers queries about them.
#[derive(Debug, Clone)]
pub struct RunService {
    registry: RunRegistry,
    ctx: Arc<WorkflowContext>,
    catalog: WorkflowCatalog,
}

impl RunService {
    /// Build a service with an empty registry.
    pub fn new(config: RunnerConfig, credentials: Credentials) -> Self {
        Self::with_registry(config, credentials, RunRegistry::new())
    }

    /// Build a service over an existing registry.
    pub fn with_registry(
        config: RunnerConfig,
        credentials: Credentials,
        registry: RunRegistry,
    ) -> Self {
        let catalog = WorkflowCatalog::new(config.paths.workflow_dir.clone());
        Self {
            registry,
            ctx: Arc::new(WorkflowContext::new(config, credentials)),
            catalog,
        }
    }

    /// Register a run and start executing it in the background.
    ///
    /// Returns the new run id. The run starts in `starting`; its first
    /// workflow phase moves it to `running`.
    ///
    /// # Errors
    ///
    /// [`RunnerError::Precondition`] for an empty `flow_id`. When a workflow
    /// directory is configured, [`RunnerError::NotFound`] if it has no
    /// definition for `flow_id` and [`RunnerError::Config`] if the
    /// definition is not valid JSON.
    pub fn create(&self, flow_id: &str, tenant_id: Option<&str>, input: Value) -> Result<String> {
        let flow_id = flow_id.trim();
        if flow_id.is_empty() {
            return Err(RunnerError::Precondition("flow_id is required".into()));
        }
        if self.catalog.is_configured() {
            let definition = self.catalog.load(flow_id)?;
            tracing::debug!(
                flow_id,
                name = definition.get("name").and_then(serde_json::Value::as_str).unwrap_or(flow_id),
                "workflow definition loaded"
            );
        }
        let tenant_id = tenant_id
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TENANT);

        let run_id = self.registry.create(flow_id, tenant_id, input.clone());
        tracing::info!(%run_id, flow_id, tenant_id, "run created");

        let task = tokio::spawn(workflow::execute(
            Arc::clone(&self.ctx),
            self.registry.clone(),
            run_id.clone(),
            flow_id.to_owned(),
            input,
        ));

        let registry = self.registry.clone();
        let supervised_id = run_id.clone();
        tokio::spawn(async move {
            if let Err(err) = task.await {
                tracing::error!(run_id = %supervised_id, error = %err, "workflow task aborted");
                if let Err(e) = registry.fail(&supervised_id, format!("workflow task aborted: {err}"))
                {
                    tracing::debug!(run_id = %supervised_id, error = %e, "run already terminal");
                }
            }
        });

        Ok(run_id)
    }

    /// Snapshot of a run.
    pub fn get(&self, run_id: &str) -> Option<Run> {
        self.registry.get(run_id)
    }

    /// Status view of a run.
    pub fn view(&self, run_id: &str) -> Option<RunView> {
        self.registry.view(run_id)
    }

    /// Poll until the run reaches a terminal state.
    ///
    /// Returns `None` if the run does not exist.
    pub async fn wait_for_terminal(&self, run_id: &str, poll: Duration) -> Option<Run> {
        loop {
            let run = self.registry.get(run_id)?;
            if run.status.is_terminal() {
                return Some(run);
            }
            tokio::time::sleep(poll).await;
        }
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    pub fn exporter(&self) -> &CsvExporter {
        &self.ctx.exporter
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::runs::RunStatus;
    use serde_json::json;

    fn service() -> RunService {
        RunService::new(RunnerConfig::default(), Credentials::default())
    }

    #[tokio::test]
    async fn empty_flow_id_is_rejected() {
        let err = service().create("  ", None, Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "flow_id is required");
    }

    #[tokio::test]
    async fn tenant_defaults_and_run_settles() {
        let service = service();
        let id = service
            .create("aeo-visibility-score", Some(""), json!({"product_id": "p1"}))
            .unwrap();

        let run = service
            .wait_for_terminal(&id, Duration::from_millis(5))
            .await
            .unwrap();

        assert_eq!(run.tenant_id, DEFAULT_TENANT);
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("retailer_domain is required"));
    }

    #[tokio::test]
    async fn configured_catalog_must_know_the_flow() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("localization.json"), "{}").unwrap();
        let mut config = RunnerConfig::default();
        config.paths.workflow_dir = Some(dir.path().to_path_buf());
        let service = RunService::new(config, Credentials::default());

        let err = service
            .create("trustana-serpapi-csv", None, Value::Null)
            .unwrap_err();
        assert!(matches!(err, RunnerError::NotFound(_)));
        assert!(service.registry().is_empty());

        assert!(service.create("localization", None, Value::Null).is_ok());
    }

    #[tokio::test]
    async fn malformed_definition_is_rejected_before_registering() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("localization.json"), "{oops").unwrap();
        let mut config = RunnerConfig::default();
        config.paths.workflow_dir = Some(dir.path().to_path_buf());
        let service = RunService::new(config, Credentials::default());

        let err = service.create("localization", None, Value::Null).unwrap_err();

        assert!(matches!(err, RunnerError::Config(_)));
        assert!(service.registry().is_empty());
    }

    #[tokio::test]
    async fn unknown_run_waits_for_nothing() {
        assert!(
            service()
                .wait_for_terminal("deadbeef", Duration::from_millis(1))
                .await
                .is_none()
        );
    }
}
