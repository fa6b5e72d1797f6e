//! HTTP server for the concept mapping service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/map-concepts` | Map a transcript to concepts, title and summary |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Errors are `{"error": "<message>"}`:
//! - `400` for a missing or too-short transcript, or a body that is not
//!   valid JSON;
//! - `500` when embedding or the index lookup fails.
//!
//! A summarizer failure is not an error: the response carries the
//! fallback title and summary.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front ends
//! can call the service directly.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info};

use concept_mapper_core::mapping::{ConceptMapper, MappingRequest, MappingResponse};
use concept_mapper_core::retrieve::RetrieveError;

use crate::config::Config;
use crate::search::build_mapper;

#[derive(Clone)]
struct AppState {
    mapper: Arc<ConceptMapper>,
}

/// Starts the HTTP server on `[server].bind`. Runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let mapper = build_mapper(config).await?;
    let bind_addr = config.server.bind.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(
        embedding = %config.embedding.provider,
        summarizer = %config.summarizer.provider,
        "concept mapper listening on http://{}",
        bind_addr
    );
    println!("Concept mapper listening on http://{}", bind_addr);

    axum::serve(listener, router(mapper)).await?;
    Ok(())
}

/// The application routes with CORS applied.
pub fn router(mapper: ConceptMapper) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState {
        mapper: Arc::new(mapper),
    };

    Router::new()
        .route("/map-concepts", post(handle_map_concepts))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.into(),
    }
}

impl From<RetrieveError> for AppError {
    fn from(err: RetrieveError) -> Self {
        match err {
            RetrieveError::Validation(e) => {
                debug!(reason = ?e, "rejected transcript");
                bad_request(e.to_string())
            }
            other => {
                error!("concept mapping failed: {}", other);
                internal(other.to_string())
            }
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

// ============ POST /map-concepts ============

async fn handle_map_concepts(
    State(state): State<AppState>,
    body: Result<Json<MappingRequest>, JsonRejection>,
) -> Result<Json<MappingResponse>, AppError> {
    let Json(request) = body.map_err(|e| bad_request(e.body_text()))?;
    let response = state.mapper.map(&request).await?;
    Ok(Json(response))
}
