//! Workflow definitions on disk.
//!
//! Each `<flow_id>.json` in the workflow directory describes one workflow.
//! Definitions are descriptive only: execution is always one of the
//! built-in [`Flow`](super::Flow)s.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, RunnerError};

/// One entry in the workflow listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowSummary {
    pub flow_id: String,
    pub name: String,
    pub description: String,
}

/// Directory of workflow definition files.
#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
    dir: Option<PathBuf>,
}

impl WorkflowCatalog {
    /// A catalogue over `dir`; `None` leaves it unconfigured.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Whether a workflow directory was configured.
    pub fn is_configured(&self) -> bool {
        self.dir.is_some()
    }

    /// Summaries of every readable definition, sorted by `flow_id`.
    ///
    /// Unreadable or malformed files are skipped. A missing or
    /// unconfigured directory yields an empty list.
    pub fn list(&self) -> Vec<WorkflowSummary> {
        let Some(dir) = &self.dir else {
            return Vec::new();
        };
        let Ok(entries) = std::fs::read_dir(dir) else {
            tracing::warn!(dir = %dir.display(), "workflow directory not readable");
            return Vec::new();
        };

        let mut summaries: Vec<WorkflowSummary> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|path| summarize(&path))
            .collect();
        summaries.sort_by(|a, b| a.flow_id.cmp(&b.flow_id));
        summaries
    }

    /// Load the definition for `flow_id`.
    ///
    /// # Errors
    ///
    /// [`RunnerError::NotFound`] when the catalogue is unconfigured, the id
    /// is not a plain file stem or no definition file exists;
    /// [`RunnerError::Config`] when the file cannot be read or is not JSON.
    pub fn load(&self, flow_id: &str) -> Result<Value> {
        let not_found = || RunnerError::NotFound(format!("Workflow '{flow_id}' not found"));
        let path = self.definition_path(flow_id).ok_or_else(not_found)?;
        if !path.is_file() {
            return Err(not_found());
        }
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| RunnerError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw).map_err(|e| {
            RunnerError::Config(format!("invalid workflow definition {}: {e}", path.display()))
        })
    }

    fn definition_path(&self, flow_id: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        if flow_id.is_empty()
            || flow_id.contains('/')
            || flow_id.contains('\\')
            || flow_id.contains("..")
        {
            return None;
        }
        Some(dir.join(format!("{flow_id}.json")))
    }
}

fn read_definition(path: &Path) -> Option<Value> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping malformed workflow definition");
            None
        }
    }
}

fn summarize(path: &Path) -> Option<WorkflowSummary> {
    let flow_id = path.file_stem()?.to_str()?.to_owned();
    let definition = read_definition(path)?;
    let name = definition
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(flow_id.as_str())
        .to_owned();
    let description = definition
        .pointer("/metadata/description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    Some(WorkflowSummary {
        flow_id,
        name,
        description,
    })
}
