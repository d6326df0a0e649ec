//! HTTP API for upgrade path queries.
//!
//! One [`UpgradeService`] (and so one graph cache) is shared by all request
//! handlers. Graphs are built lazily by the first path request for a model
//! and reused until `POST /models/{model_id}/rebuild`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/models` | List models (`vendor`, `skip`, `limit` query parameters) |
//! | `GET`  | `/models/{model_id}` | Model lifecycle rollup with its versions |
//! | `GET`  | `/models/{model_id}/versions` | Versions with lifecycle data |
//! | `POST` | `/upgrade-path` | Compute an upgrade path between two version labels |
//! | `POST` | `/upgrade-path/validate` | Check reachability against the cached graph |
//! | `POST` | `/models/{model_id}/rebuild` | Rebuild a model's cached graph |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "version_not_found", "message": "version '9.9' not found for model 1" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `version_not_found` (404),
//! `no_upgrade_path` (404), `internal` (500).

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use lifecycle_harness_core::engine::PathValidation;
use lifecycle_harness_core::models::ModelId;

use crate::config::Config;
use crate::db;
use crate::models::{
    list_models, model_lifecycle, ModelLifecycle, ModelResponse, DEFAULT_LIMIT, DEFAULT_SKIP,
};
use crate::upgrade::{PathLookup, PathRequest, PathResponse, RebuildResponse, UpgradeService};
use crate::versions::{list_versions, VersionListResponse};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    service: UpgradeService,
}

/// Starts the HTTP server on `[server].bind`. Runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let app = router(UpgradeService::new(pool));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "server listening");
    println!("lch server listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router around an existing service.
pub fn router(service: UpgradeService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/models", get(handle_models))
        .route("/models/{model_id}", get(handle_model))
        .route("/models/{model_id}/versions", get(handle_versions))
        .route("/models/{model_id}/rebuild", post(handle_rebuild))
        .route("/upgrade-path", post(handle_upgrade_path))
        .route("/upgrade-path/validate", post(handle_validate))
        .layer(cors)
        .with_state(AppState { service })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"version_not_found"`).
    code: String,
    message: String,
}

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

fn app_error(status: StatusCode, code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code: code.to_string(),
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    app_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn model_not_found(model_id: ModelId) -> AppError {
    app_error(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("model not found: {}", model_id),
    )
}

fn internal(err: anyhow::Error) -> AppError {
    let message = format!("{:#}", err);
    tracing::error!(error = %message, "request failed");
    app_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

fn parse_request(payload: Result<Json<PathRequest>, JsonRejection>) -> Result<PathRequest, AppError> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    if req.current_version.trim().is_empty() || req.target_version.trim().is_empty() {
        return Err(bad_request("current_version and target_version must not be empty"));
    }
    Ok(req)
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

// ============ GET /models ============

#[derive(Deserialize)]
struct ModelsQuery {
    vendor: Option<String>,
    skip: Option<u32>,
    limit: Option<u32>,
}

async fn handle_models(
    State(state): State<AppState>,
    query: Result<Query<ModelsQuery>, QueryRejection>,
) -> Result<Json<Vec<ModelResponse>>, AppError> {
    let Query(query) = query.map_err(|e| bad_request(e.body_text()))?;
    let vendor = query.vendor.as_deref().filter(|v| !v.trim().is_empty());
    let models = list_models(
        state.service.catalog(),
        vendor,
        query.skip.unwrap_or(DEFAULT_SKIP),
        query.limit.unwrap_or(DEFAULT_LIMIT),
    )
    .await
    .map_err(internal)?;
    Ok(Json(models))
}

// ============ GET /models/{model_id} ============

async fn handle_model(
    State(state): State<AppState>,
    Path(model_id): Path<ModelId>,
) -> Result<Json<ModelLifecycle>, AppError> {
    model_lifecycle(state.service.catalog(), model_id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| model_not_found(model_id))
}

// ============ GET /models/{model_id}/versions ============

async fn handle_versions(
    State(state): State<AppState>,
    Path(model_id): Path<ModelId>,
) -> Result<Json<VersionListResponse>, AppError> {
    if !state
        .service
        .catalog()
        .model_exists(model_id)
        .await
        .map_err(internal)?
    {
        return Err(model_not_found(model_id));
    }
    let listing = list_versions(state.service.catalog(), model_id)
        .await
        .map_err(internal)?;
    Ok(Json(listing))
}

// ============ POST /upgrade-path ============

async fn handle_upgrade_path(
    State(state): State<AppState>,
    payload: Result<Json<PathRequest>, JsonRejection>,
) -> Result<Json<PathResponse>, AppError> {
    let req = parse_request(payload)?;
    let lookup = state
        .service
        .lookup_path(req.model_id, &req.current_version, &req.target_version)
        .await
        .map_err(internal)?;

    match lookup {
        PathLookup::Found(path) => Ok(Json(path)),
        PathLookup::VersionNotFound(message) => Err(app_error(
            StatusCode::NOT_FOUND,
            "version_not_found",
            message,
        )),
        PathLookup::NoPath { from, to } => Err(app_error(
            StatusCode::NOT_FOUND,
            "no_upgrade_path",
            format!("no upgrade path found from {} to {}", from, to),
        )),
    }
}

// ============ POST /upgrade-path/validate ============

async fn handle_validate(
    State(state): State<AppState>,
    payload: Result<Json<PathRequest>, JsonRejection>,
) -> Result<Json<PathValidation>, AppError> {
    let req = parse_request(payload)?;
    let validation = state
        .service
        .validate(req.model_id, &req.current_version, &req.target_version)
        .await
        .map_err(internal)?;
    Ok(Json(validation))
}

// ============ POST /models/{model_id}/rebuild ============

async fn handle_rebuild(
    State(state): State<AppState>,
    Path(model_id): Path<ModelId>,
) -> Result<Json<RebuildResponse>, AppError> {
    let rebuilt = state.service.rebuild(model_id).await.map_err(internal)?;
    Ok(Json(rebuilt))
}
