//! HTTP surface for creating and polling runs.
//!
//! | Method | Path                  | Purpose                          |
//! |--------|-----------------------|----------------------------------|
//! | GET    | `/health`             | liveness                         |
//! | POST   | `/runs`               | create a run, returns `201`      |
//! | GET    | `/runs/{run_id}`      | run status and result            |
//! | GET    | `/workflows`          | workflow definitions on disk     |
//! | GET    | `/output/{file_name}` | download a CSV artifact          |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::ServerConfig;
use crate::error::{Result, RunnerError};
use crate::runs::RunStatus;
use crate::service::RunService;

#[derive(Debug, Deserialize)]
struct CreateRunBody {
    #[serde(default)]
    flow_id: Option<String>,
    #[serde(default)]
    tenant_id: Option<String>,
    #[serde(default)]
    input: Value,
}

/// Routes over a shared [`RunService`].
pub fn router(service: Arc<RunService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/runs", post(create_run))
        .route("/runs/{run_id}", get(get_run))
        .route("/workflows", get(list_workflows))
        .route("/output/{file_name}", get(download_output))
        .with_state(service)
}

/// Bind `{host}:{port}` and serve until the listener fails.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server stops
/// with an I/O error.
pub async fn serve(config: &ServerConfig, service: Arc<RunService>) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!("workflow runner listening on http://{local_addr}");
    axum::serve(listener, router(service)).await?;
    Ok(())
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "workflow-runner"
    }))
}

async fn create_run(
    State(service): State<Arc<RunService>>,
    Json(body): Json<CreateRunBody>,
) -> Response {
    let flow_id = body.flow_id.unwrap_or_default();
    match service.create(&flow_id, body.tenant_id.as_deref(), body.input) {
        Ok(run_id) => (
            StatusCode::CREATED,
            Json(json!({
                "run_id": run_id,
                "flow_id": flow_id.trim(),
                "status": RunStatus::Starting,
                "message": format!("Workflow started. Check status at GET /runs/{run_id}"),
            })),
        )
            .into_response(),
        Err(RunnerError::Precondition(message)) => error_body(StatusCode::BAD_REQUEST, message),
        Err(RunnerError::NotFound(message)) => error_body(StatusCode::NOT_FOUND, message),
        Err(e) => {
            tracing::error!(error = %e, "run creation failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn get_run(
    State(service): State<Arc<RunService>>,
    Path(run_id): Path<String>,
) -> Response {
    match service.view(&run_id) {
        Some(view) => Json(view).into_response(),
        None => error_body(StatusCode::NOT_FOUND, "Run not found"),
    }
}

async fn list_workflows(State(service): State<Arc<RunService>>) -> impl IntoResponse {
    Json(json!({ "workflows": service.catalog().list() }))
}

async fn download_output(
    State(service): State<Arc<RunService>>,
    Path(file_name): Path<String>,
) -> Response {
    let path = match service.exporter().resolve(&file_name) {
        Ok(path) => path,
        Err(RunnerError::Precondition(_)) => {
            return error_body(StatusCode::BAD_REQUEST, "Invalid file name");
        }
        Err(_) => return error_body(StatusCode::NOT_FOUND, "File not found"),
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "text/csv".to_owned()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{file_name}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "artifact read failed");
            error_body(StatusCode::NOT_FOUND, "File not found")
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::config::RunnerConfig;
    use crate::credentials::Credentials;

    #[test]
    fn create_body_fields_are_optional() {
        let body: CreateRunBody = serde_json::from_str("{}").unwrap();
        assert!(body.flow_id.is_none());
        assert!(body.tenant_id.is_none());
        assert!(body.input.is_null());
    }

    #[test]
    fn router_builds() {
        let service = Arc::new(RunService::new(
            RunnerConfig::default(),
            Credentials::default(),
        ));
        let _ = router(service);
    }
}
