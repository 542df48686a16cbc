//! HTTP API for ingestion and generation.
//!
//! A thin endpoint layer over the three pipeline operations; the page
//! renderer in front of it only ever calls these routes.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/v1/ingestion/upload` | Ingest a batch of files (JSON + base64 content) |
//! | `POST` | `/api/v1/generation/test-cases` | Generate test cases for a feature query |
//! | `POST` | `/api/v1/generation/script` | Generate a script for one test case |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "store_unavailable", "message": "..." } }
//! ```
//!
//! Upload is the exception: it always answers 200 with a per-file
//! result list, because a failing file must not abort the batch.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser-based
//! frontend can call the API directly.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::PipelineError;
use crate::ingest::{self, FileOutcome};
use crate::llm::{ChatCompleter, Completer};
use crate::models::TestCase;
use crate::script;
use crate::store::KnowledgeStore;
use crate::testcase;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<KnowledgeStore>,
    llm: Arc<dyn Completer>,
}

/// Start the HTTP server with the production store and model client.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(KnowledgeStore::from_config(config)?);
    let llm: Arc<dyn Completer> = Arc::new(ChatCompleter::new(&config.llm)?);
    run_server_with(config, store, llm).await
}

/// Start the HTTP server with injected collaborators.
pub async fn run_server_with(
    config: &Config,
    store: Arc<KnowledgeStore>,
    llm: Arc<dyn Completer>,
) -> anyhow::Result<()> {
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        llm,
    };
    let app = router(state);

    let bind = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    println!("listening on http://{}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/ingestion/upload", post(upload))
        .route("/api/v1/generation/test-cases", post(generate_test_cases))
        .route("/api/v1/generation/script", post(generate_script))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

#[derive(Deserialize)]
struct UploadRequest {
    files: Vec<UploadFile>,
}

#[derive(Deserialize)]
struct UploadFile {
    filename: String,
    content_base64: String,
}

/// Batch ingestion. Always 200; each file reports its own outcome in
/// input order.
async fn upload(State(state): State<AppState>, Json(request): Json<UploadRequest>) -> Response {
    let mut slots: Vec<Option<FileOutcome>> = Vec::with_capacity(request.files.len());
    let mut decoded: Vec<(String, Vec<u8>)> = Vec::new();
    let mut decoded_positions: Vec<usize> = Vec::new();

    for (position, file) in request.files.into_iter().enumerate() {
        match base64::engine::general_purpose::STANDARD.decode(&file.content_base64) {
            Ok(bytes) => {
                slots.push(None);
                decoded_positions.push(position);
                decoded.push((file.filename, bytes));
            }
            Err(e) => slots.push(Some(FileOutcome::failure(
                file.filename,
                format!("invalid base64 content: {}", e),
            ))),
        }
    }

    let outcomes =
        ingest::process_batch(state.store.clone(), state.config.clone(), decoded).await;
    for (position, outcome) in decoded_positions.into_iter().zip(outcomes) {
        slots[position] = Some(outcome);
    }

    Json(slots.into_iter().flatten().collect::<Vec<_>>()).into_response()
}

#[derive(Deserialize)]
struct GenerateRequest {
    query: String,
}

async fn generate_test_cases(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    if request.query.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "query must not be empty",
        );
    }

    match testcase::generate_test_cases(&state.store, state.llm.as_ref(), &request.query).await {
        Ok(cases) => Json(cases).into_response(),
        Err(e) => pipeline_error_response(e),
    }
}

#[derive(Deserialize)]
struct ScriptRequest {
    test_case: TestCase,
}

async fn generate_script(
    State(state): State<AppState>,
    Json(request): Json<ScriptRequest>,
) -> Response {
    match script::generate_script(&state.store, state.llm.as_ref(), &request.test_case).await {
        Ok(script_text) => Json(serde_json::json!({ "script": script_text })).into_response(),
        Err(e) => pipeline_error_response(e),
    }
}

async fn health() -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
        PipelineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::EmbeddingFailure(_)
        | PipelineError::GenerationFormatError { .. }
        | PipelineError::UpstreamGenerationError(_) => StatusCode::BAD_GATEWAY,
    }
}

fn pipeline_error_response(err: PipelineError) -> Response {
    error_response(status_for(&err), err.code(), &err.to_string())
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": { "code": code, "message": message }
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses_follow_the_taxonomy() {
        assert_eq!(
            status_for(&PipelineError::UnsupportedFormat("xyz".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&PipelineError::StoreUnavailable("refused".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&PipelineError::GenerationFormatError {
                detail: "bad".into(),
                raw: "raw".into()
            }),
            StatusCode::BAD_GATEWAY
        );
    }
}
