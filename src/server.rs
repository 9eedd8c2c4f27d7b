//! HTTP server.
//!
//! Exposes batch translation as a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/translate` | Translate a batch of `gs://` SQL files |
//! | `POST` | `/` | Same as `/translate` (function-style deployments) |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Request
//!
//! ```json
//! { "databricks_sql_gcs_paths": ["gs://b/ok.sql"], "perform_dry_run": true }
//! ```
//!
//! # Response
//!
//! `200` with a JSON array holding one record per input path, in order.
//! Malformed requests are rejected as a whole before any processing:
//!
//! ```json
//! { "error": { "code": "ERROR_INVALID_INPUT", "message": "..." } }
//! ```

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::batch::Translator;
use crate::error::TranslateError;
use crate::models::{TranslationRequest, TranslationResult};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    translator: Arc<Translator>,
}

/// Starts the HTTP server on `[server].bind`.
///
/// Runs until the process is terminated. Returns an error if binding fails.
pub async fn run_server(translator: Arc<Translator>) -> anyhow::Result<()> {
    let bind_addr = translator.config().server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Translation server listening on http://{}", bind_addr);

    axum::serve(listener, router(translator)).await?;
    Ok(())
}

/// Build the application router.
pub fn router(translator: Arc<Translator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", post(handle_translate))
        .route("/translate", post(handle_translate))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { translator })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<TranslateError> for AppError {
    fn from(err: TranslateError) -> Self {
        AppError {
            status: StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: err.kind().as_str().to_string(),
            message: err.to_string(),
        }
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

// ============ POST /translate ============

/// Parses the body into a [`TranslationRequest`] and runs the batch.
///
/// The raw body is taken as bytes so that every shape error (bad JSON,
/// missing field, wrong type) is reported as `ERROR_INVALID_INPUT` rather
/// than Axum's default rejection.
async fn handle_translate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<TranslationResult>>, AppError> {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("translate", %request_id);

    async move {
        tracing::info!("Received request to translate SQL.");
        let request = parse_request(&body)?;
        let results = state.translator.translate_batch(&request).await?;
        Ok(Json(results))
    }
    .instrument(span)
    .await
}

fn parse_request(body: &[u8]) -> Result<TranslationRequest, AppError> {
    let request: TranslationRequest = serde_json::from_slice(body).map_err(|e| {
        let msg = format!(
            "Invalid request body: {}. Expected {{\"databricks_sql_gcs_paths\": [string], \"perform_dry_run\": bool}}",
            e
        );
        tracing::error!("{}", msg);
        AppError::from(TranslateError::InvalidInput(msg))
    })?;
    request.validate()?;
    Ok(request)
}
