//! In-memory run registry.
//!
//! Holds the lifecycle record of every run and enforces the state machine:
//!
//! ```text
//! starting ──▶ running ──▶ completed
//!     │           │
//!     └───────────┴──────▶ failed
//! ```
//!
//! Every mutation of a run happens under one lock, so a reader never sees
//! `completed` without its result or `failed` without its error. Terminal
//! runs are never modified again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RunnerError};
use crate::workflow::RunOutput;

/// Length of a run identifier in hex characters.
pub const RUN_ID_LEN: usize = 8;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, no work started yet.
    Starting,
    /// Executing; `current_step` names the phase.
    Running,
    /// Finished with a result.
    Completed,
    /// Finished with an error.
    Failed,
}

impl RunStatus {
    /// Whether no further transition is allowed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One workflow invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Run {
    /// Unique, never reused.
    pub run_id: String,
    /// Workflow executed by this run.
    pub flow_id: String,
    /// Caller-supplied tenant, `"default"` when absent.
    pub tenant_id: String,
    /// Current lifecycle state.
    pub status: RunStatus,
    /// Phase in progress while running.
    pub current_step: Option<String>,
    /// Caller-supplied input.
    pub input: Value,
    /// Set exactly when completed.
    pub result: Option<RunOutput>,
    /// Set exactly when failed.
    pub error: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the terminal transition.
    pub completed_at: Option<DateTime<Utc>>,
}

/// What a status query exposes about a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunView {
    pub run_id: String,
    pub flow_id: String,
    pub status: RunStatus,
    pub current_step: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RunOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Run> for RunView {
    fn from(run: &Run) -> Self {
        let completed = run.status == RunStatus::Completed;
        Self {
            run_id: run.run_id.clone(),
            flow_id: run.flow_id.clone(),
            status: run.status,
            current_step: run.current_step.clone(),
            created_at: run.created_at,
            result: if completed { run.result.clone() } else { None },
            completed_at: if completed { run.completed_at } else { None },
            error: if run.status == RunStatus::Failed {
                run.error.clone()
            } else {
                None
            },
        }
    }
}

/// Thread-safe registry of runs, shared by the creating path, the
/// executing task and status readers.
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    runs: Arc<Mutex<HashMap<String, Run>>>,
}

impl RunRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Run>> {
        // A panic while holding the lock cannot leave a run half-updated:
        // every mutation below is a sequence of plain field assignments.
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a new run in `starting` state and return its id.
    pub fn create(&self, flow_id: &str, tenant_id: &str, input: Value) -> String {
        let mut runs = self.lock();
        let run_id = loop {
            let candidate = new_run_id();
            if !runs.contains_key(&candidate) {
                break candidate;
            }
        };
        runs.insert(
            run_id.clone(),
            Run {
                run_id: run_id.clone(),
                flow_id: flow_id.to_owned(),
                tenant_id: tenant_id.to_owned(),
                status: RunStatus::Starting,
                current_step: None,
                input,
                result: None,
                error: None,
                created_at: Utc::now(),
                completed_at: None,
            },
        );
        tracing::debug!(run_id, flow_id, tenant_id, "run created");
        run_id
    }

    /// Snapshot of a run.
    pub fn get(&self, run_id: &str) -> Option<Run> {
        self.lock().get(run_id).cloned()
    }

    /// Status view of a run.
    pub fn view(&self, run_id: &str) -> Option<RunView> {
        self.lock().get(run_id).map(RunView::from)
    }

    /// Number of runs ever created.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no run has been created.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Enter `step`, moving a `starting` run to `running`.
    ///
    /// # Errors
    ///
    /// [`RunnerError::NotFound`] for an unknown id,
    /// [`RunnerError::InvalidTransition`] for a terminal run.
    pub fn begin_step(&self, run_id: &str, step: &str) -> Result<()> {
        let mut runs = self.lock();
        let run = lookup(&mut runs, run_id)?;
        if run.status.is_terminal() {
            return Err(RunnerError::InvalidTransition(format!(
                "run {run_id} is {} and cannot enter step {step}",
                run.status
            )));
        }
        run.status = RunStatus::Running;
        run.current_step = Some(step.to_owned());
        tracing::info!(run_id, step, "run step");
        Ok(())
    }

    /// Attach the result and move a `running` run to `completed`.
    ///
    /// # Errors
    ///
    /// [`RunnerError::NotFound`] for an unknown id,
    /// [`RunnerError::InvalidTransition`] unless the run is running.
    pub fn complete(&self, run_id: &str, result: RunOutput) -> Result<()> {
        let mut runs = self.lock();
        let run = lookup(&mut runs, run_id)?;
        if run.status != RunStatus::Running {
            return Err(RunnerError::InvalidTransition(format!(
                "run {run_id} is {} and cannot complete",
                run.status
            )));
        }
        run.status = RunStatus::Completed;
        run.current_step = None;
        run.result = Some(result);
        run.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Record `error` and move a non-terminal run to `failed`.
    ///
    /// # Errors
    ///
    /// [`RunnerError::NotFound`] for an unknown id,
    /// [`RunnerError::InvalidTransition`] for a terminal run.
    pub fn fail(&self, run_id: &str, error: impl Into<String>) -> Result<()> {
        let mut runs = self.lock();
        let run = lookup(&mut runs, run_id)?;
        if run.status.is_terminal() {
            return Err(RunnerError::InvalidTransition(format!(
                "run {run_id} is {} and cannot fail",
                run.status
            )));
        }
        run.status = RunStatus::Failed;
        run.current_step = None;
        run.error = Some(error.into());
        run.completed_at = Some(Utc::now());
        Ok(())
    }
}

fn lookup<'a>(runs: &'a mut HashMap<String, Run>, run_id: &str) -> Result<&'a mut Run> {
    runs.get_mut(run_id)
        .ok_or_else(|| RunnerError::NotFound(format!("run {run_id}")))
}

fn new_run_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(RUN_ID_LEN);
    id
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::workflow::SearchExportResult;
    use serde_json::json;

    fn output() -> RunOutput {
        RunOutput::SearchExport(SearchExportResult {
            product_name: "Acme Kettle".into(),
            brand: "Acme".into(),
            sku: Some("SKU-1".into()),
            search_query: "Acme Kettle Acme".into(),
            search_results_count: 0,
            artifact_path: "/tmp/out.csv".into(),
            search_results: vec![],
        })
    }

    #[test]
    fn new_run_is_starting_without_outcome() {
        let registry = RunRegistry::new();
        let id = registry.create("aeo-visibility-score", "default", json!({"a": 1}));

        assert_eq!(id.len(), RUN_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

        let run = registry.get(&id).unwrap();
        assert_eq!(run.status, RunStatus::Starting);
        assert!(run.current_step.is_none());
        assert!(run.result.is_none());
        assert!(run.error.is_none());
        assert!(run.completed_at.is_none());
        assert_eq!(run.input, json!({"a": 1}));
    }

    #[test]
    fn ids_are_unique() {
        let registry = RunRegistry::new();
        let ids: std::collections::HashSet<String> =
            (0..500).map(|_| registry.create("f", "t", Value::Null)).collect();
        assert_eq!(ids.len(), 500);
        assert_eq!(registry.len(), 500);
    }

    #[test]
    fn happy_path_transitions() {
        let registry = RunRegistry::new();
        let id = registry.create("f", "default", Value::Null);

        registry.begin_step(&id, "fetch_product").unwrap();
        let run = registry.get(&id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.current_step.as_deref(), Some("fetch_product"));

        registry.begin_step(&id, "export_to_csv").unwrap();
        registry.complete(&id, output()).unwrap();

        let run = registry.get(&id).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.current_step.is_none());
        assert!(run.result.is_some());
        assert!(run.error.is_none());
        assert!(run.completed_at.is_some());
    }

    #[test]
    fn starting_run_can_fail_directly() {
        let registry = RunRegistry::new();
        let id = registry.create("f", "default", Value::Null);
        registry.fail(&id, "product_id is required").unwrap();

        let run = registry.get(&id).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("product_id is required"));
        assert!(run.result.is_none());
    }

    #[test]
    fn starting_run_cannot_complete() {
        let registry = RunRegistry::new();
        let id = registry.create("f", "default", Value::Null);
        let err = registry.complete(&id, output()).unwrap_err();
        assert!(matches!(err, RunnerError::InvalidTransition(_)));
        assert_eq!(registry.get(&id).unwrap().status, RunStatus::Starting);
    }

    #[test]
    fn terminal_runs_never_change() {
        let registry = RunRegistry::new();
        let id = registry.create("f", "default", Value::Null);
        registry.begin_step(&id, "fetch_product").unwrap();
        registry.fail(&id, "boom").unwrap();
        let before = registry.get(&id).unwrap();

        assert!(registry.begin_step(&id, "again").is_err());
        assert!(registry.complete(&id, output()).is_err());
        assert!(registry.fail(&id, "again").is_err());

        let after = registry.get(&id).unwrap();
        assert_eq!(after.status, RunStatus::Failed);
        assert_eq!(after.error, before.error);
        assert_eq!(after.completed_at, before.completed_at);
    }

    #[test]
    fn unknown_run_is_not_found() {
        let registry = RunRegistry::new();
        assert!(registry.get("deadbeef").is_none());
        assert!(matches!(
            registry.begin_step("deadbeef", "x"),
            Err(RunnerError::NotFound(_))
        ));
    }

    #[test]
    fn view_exposes_outcome_by_status() {
        let registry = RunRegistry::new();

        let running = registry.create("f", "default", Value::Null);
        registry.begin_step(&running, "fetch_product").unwrap();
        let json = serde_json::to_value(registry.view(&running).unwrap()).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["current_step"], "fetch_product");
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_none());
        assert!(json.get("completed_at").is_none());

        let failed = registry.create("f", "default", Value::Null);
        registry.fail(&failed, "boom").unwrap();
        let json = serde_json::to_value(registry.view(&failed).unwrap()).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert!(json["current_step"].is_null());
        assert!(json.get("completed_at").is_none());

        let done = registry.create("f", "default", Value::Null);
        registry.begin_step(&done, "export_to_csv").unwrap();
        registry.complete(&done, output()).unwrap();
        let json = serde_json::to_value(registry.view(&done).unwrap()).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["result"]["search_query"], "Acme Kettle Acme");
        assert!(json.get("completed_at").is_some());
    }

    #[tokio::test]
    async fn concurrent_reader_never_sees_completed_without_result() {
        let registry = RunRegistry::new();
        let id = registry.create("f", "default", Value::Null);

        let reader = {
            let registry = registry.clone();
            let id = id.clone();
            tokio::spawn(async move {
                loop {
                    let run = registry.get(&id).unwrap();
                    match run.status {
                        RunStatus::Completed => {
                            assert!(run.result.is_some());
                            assert!(run.completed_at.is_some());
                            break;
                        }
                        RunStatus::Failed => panic!("unexpected failure"),
                        _ => tokio::task::yield_now().await,
                    }
                }
            })
        };

        registry.begin_step(&id, "fetch_product").unwrap();
        tokio::task::yield_now().await;
        registry.complete(&id, output()).unwrap();

        reader.await.unwrap();
    }
}
