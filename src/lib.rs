//! aeo-runner: asynchronous workflow runs over a product catalogue.
//!
//! A caller creates a run for one of a closed set of workflows and gets an
//! id back immediately; the run executes on its own task and callers poll
//! its status until it completes or fails.
//!
//! # Architecture
//!
//! - **Runs**: an injected [`RunRegistry`] holds every run and enforces the
//!   `starting → running → completed | failed` state machine
//! - **Workflows**: visibility scoring across answer engines (via
//!   `aeo-search`), Google search export and attribute localization
//! - **Subjects**: the product a run is about, fetched from the catalogue
//! - **Artifacts**: CSV files written to the output directory
//! - **Surface**: an axum HTTP API and a clap CLI over [`RunService`]

pub mod config;
pub mod credentials;
pub mod error;
pub mod export;
pub mod runs;
pub mod server;
pub mod service;
pub mod subject;
pub mod workflow;

pub use config::RunnerConfig;
pub use credentials::Credentials;
pub use error::{Result, RunnerError};
pub use runs::{Run, RunRegistry, RunStatus, RunView};
pub use service::RunService;
pub use workflow::{Flow, RunOutput};
