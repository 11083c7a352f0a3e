//! CLI binary for the workflow runner.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aeo_runner::{Credentials, RunService, RunStatus, RunnerConfig};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Asynchronous product workflow runner.
#[derive(Parser)]
#[command(name = "aeo-runner", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default).
    Serve,

    /// Execute one workflow in the foreground and print the run as JSON.
    Run {
        /// Workflow identifier, e.g. `aeo-visibility-score`.
        flow_id: String,

        /// Workflow input as a JSON object.
        #[arg(short, long)]
        input: Option<String>,

        /// Tenant the run belongs to.
        #[arg(short, long)]
        tenant: Option<String>,
    },

    /// List workflow definitions in the workflow directory.
    Workflows,

    /// Write the effective configuration (file, defaults and environment
    /// overrides) to the config path.
    InitConfig {
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Users can override with RUST_LOG=debug to see everything.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("aeo_runner=info,aeo_search=info")),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(RunnerConfig::default_config_path);
    let mut config = if cli.config.is_some() || config_path.is_file() {
        RunnerConfig::from_file(&config_path)?
    } else {
        RunnerConfig::default()
    };
    config.apply_env_overrides()?;
    config.validate()?;

    if let Some(Command::InitConfig { force }) = &cli.command {
        if config_path.exists() && !*force {
            anyhow::bail!(
                "{} already exists; pass --force to replace it",
                config_path.display()
            );
        }
        config.save_to_file(&config_path)?;
        println!("wrote {}", config_path.display());
        return Ok(());
    }

    let credentials = Credentials::from_env();
    tracing::debug!(?credentials, "credentials loaded");

    let server_config = config.server.clone();
    let service = Arc::new(RunService::new(config, credentials));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            aeo_runner::server::serve(&server_config, service).await?;
            Ok(())
        }
        Command::Run {
            flow_id,
            input,
            tenant,
        } => run_once(&service, &flow_id, input.as_deref(), tenant.as_deref()).await,
        Command::Workflows => {
            for workflow in service.catalog().list() {
                println!("{}\t{}\t{}", workflow.flow_id, workflow.name, workflow.description);
            }
            Ok(())
        }
        // Written before the service is built.
        Command::InitConfig { .. } => Ok(()),
    }
}

async fn run_once(
    service: &RunService,
    flow_id: &str,
    input: Option<&str>,
    tenant: Option<&str>,
) -> anyhow::Result<()> {
    let input = match input {
        Some(raw) => serde_json::from_str(raw).context("--input is not valid JSON")?,
        None => serde_json::Value::Null,
    };

    let run_id = service.create(flow_id, tenant, input)?;
    let run = service
        .wait_for_terminal(&run_id, Duration::from_millis(200))
        .await
        .with_context(|| format!("run {run_id} disappeared"))?;

    let view = aeo_runner::RunView::from(&run);
    println!("{}", serde_json::to_string_pretty(&view)?);

    if run.status == RunStatus::Failed {
        anyhow::bail!(run.error.unwrap_or_else(|| "run failed".to_owned()));
    }
    Ok(())
}
