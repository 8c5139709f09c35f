//! HTTP server.
//!
//! Exposes manual snapshots, indexing, retrieval, and tone classification
//! as a JSON HTTP API. Handlers are thin: they validate the request, call
//! into the shared [`Pipeline`], and map [`RagError`]s onto the error
//! contract below.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/manuals` | Store a manual snapshot, optionally indexing it |
//! | `GET`  | `/manuals/{id}` | Read a stored snapshot |
//! | `POST` | `/rag/embed` | Index a manual (inline or stored) |
//! | `POST` | `/rag/retrieve` | Nearest chunks of one manual for a query |
//! | `POST` | `/tone/classify` | Classify a tone description |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "limit must be >= 1" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `embeddings_disabled` (400),
//! `index_mismatch` (409), `index_unavailable` (503), `internal` (500).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::RagError;
use crate::manuals::ManualSnapshot;
use crate::models::{IndexReport, RetrievedChunk};
use crate::pipeline::Pipeline;
use crate::retriever::context_json;
use crate::tone::{classify_tone, Tone};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pipeline = Pipeline::connect(config).await?;
    let bind_addr = config.server.bind.clone();
    let app = router(AppState::new(Arc::new(pipeline)));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    println!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router. Exposed separately so tests can serve it on an
/// ephemeral port.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/manuals", post(handle_create_manual))
        .route("/manuals/{id}", get(handle_get_manual))
        .route("/rag/embed", post(handle_embed))
        .route("/rag/retrieve", post(handle_retrieve))
        .route("/tone/classify", post(handle_classify_tone))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn internal(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        let message = err.to_string();
        match err {
            RagError::InvalidRequest(_) => bad_request(message),
            RagError::ManualNotFound(_) => {
                AppError::new(StatusCode::NOT_FOUND, "not_found", message)
            }
            RagError::IndexMismatch(_) | RagError::DimensionMismatch { .. } => {
                AppError::new(StatusCode::CONFLICT, "index_mismatch", message)
            }
            RagError::IndexUnavailable { .. } => {
                AppError::new(StatusCode::SERVICE_UNAVAILABLE, "index_unavailable", message)
            }
            RagError::Provider(_) | RagError::Store(_) => {
                tracing::error!(error = %message, "request failed");
                internal(message)
            }
        }
    }
}

fn require_embeddings(state: &AppState) -> Result<(), AppError> {
    if state.pipeline.config().embedding.is_enabled() {
        Ok(())
    } else {
        Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "embeddings_disabled",
            "embeddings are disabled; set [embedding].provider",
        ))
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /manuals, GET /manuals/{id} ============

#[derive(Deserialize)]
struct CreateManualRequest {
    manual: serde_json::Value,
    #[serde(default)]
    index: bool,
}

#[derive(Serialize)]
struct CreateManualResponse {
    id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<IndexReport>,
}

async fn handle_create_manual(
    State(state): State<AppState>,
    Json(req): Json<CreateManualRequest>,
) -> Result<(StatusCode, Json<CreateManualResponse>), AppError> {
    if !req.manual.is_object() {
        return Err(bad_request("manual must be a JSON object"));
    }
    if req.index {
        require_embeddings(&state)?;
    }

    let id = state
        .pipeline
        .manuals()
        .create(&req.manual)
        .await
        .map_err(|e| internal(format!("{:#}", e)))?;

    let report = if req.index {
        Some(state.pipeline.index_manual(id, Some(&req.manual)).await?)
    } else {
        None
    };

    Ok((StatusCode::CREATED, Json(CreateManualResponse { id, report })))
}

async fn handle_get_manual(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ManualSnapshot>, AppError> {
    let snapshot = state
        .pipeline
        .manuals()
        .get_snapshot(id)
        .await
        .map_err(|e| internal(format!("{:#}", e)))?
        .ok_or(RagError::ManualNotFound(id))?;
    Ok(Json(snapshot))
}

// ============ POST /rag/embed ============

#[derive(Deserialize)]
struct EmbedRequest {
    manual_id: i64,
    /// Inline manual; the stored snapshot is used when omitted.
    #[serde(default)]
    manual_json: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct EmbedResponse {
    message: String,
    report: IndexReport,
}

async fn handle_embed(
    State(state): State<AppState>,
    Json(req): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>, AppError> {
    require_embeddings(&state)?;

    let report = state
        .pipeline
        .index_manual(req.manual_id, req.manual_json.as_ref())
        .await?;

    Ok(Json(EmbedResponse {
        message: format!(
            "manual {}: {} of {} chunks indexed",
            req.manual_id,
            report.persisted(),
            report.chunks
        ),
        report,
    }))
}

// ============ POST /rag/retrieve ============

#[derive(Deserialize)]
struct RetrieveRequest {
    manual_id: i64,
    query: String,
    /// Raw JSON, checked by `parse_limit`.
    #[serde(default)]
    limit: Option<serde_json::Value>,
}

fn parse_limit(limit: Option<&serde_json::Value>) -> Result<Option<usize>, AppError> {
    match limit {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| bad_request(format!("limit must be a non-negative integer, got {}", value))),
    }
}

#[derive(Serialize)]
struct RetrieveResponse {
    results: Vec<RetrievedChunk>,
    /// The retrieved chunks alone, as interpolated into generation prompts.
    context: serde_json::Value,
}

async fn handle_retrieve(
    State(state): State<AppState>,
    Json(req): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let limit = parse_limit(req.limit.as_ref())?;
    require_embeddings(&state)?;

    let results = state
        .pipeline
        .retrieve(req.manual_id, &req.query, limit)
        .await?;
    let context = context_json(&results);

    Ok(Json(RetrieveResponse { results, context }))
}

// ============ POST /tone/classify ============

#[derive(Deserialize)]
struct ToneRequest {
    text: String,
}

#[derive(Serialize)]
struct ToneResponse {
    tone: Tone,
}

async fn handle_classify_tone(Json(req): Json<ToneRequest>) -> Json<ToneResponse> {
    Json(ToneResponse {
        tone: classify_tone(&req.text),
    })
}
