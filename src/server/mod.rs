//! HTTP transport for the sync engine.
//!
//! # Endpoints
//!
//! - `GET /healthz`: Health check (no auth required)
//! - `POST /pair`: Pair a device and receive its credential (no auth required)
//! - `POST /sync/push`, `GET /sync/pull?since=N`: Events
//! - `POST /growth/push`, `GET /growth/pull?since=N`: Growth data

mod auth;
mod error;

pub use error::ErrorResponse;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::db::RecordTable;
use crate::error::SyncError;
use crate::models::{Device, Event, GrowthData};
use crate::sync::{PairResponse, PullResponse, PushResponse, SyncEngine};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
}

/// Builds the application router.
pub fn router(engine: Arc<SyncEngine>) -> Router {
    let state = AppState { engine };

    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/healthz", get(health))
        .route("/pair", post(pair));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/sync/push", post(push::<Event>))
        .route("/sync/pull", get(pull::<Event>))
        .route("/growth/push", post(push::<GrowthData>))
        .route("/growth/pull", get(pull::<GrowthData>))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_device,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct PairRequest {
    #[serde(default)]
    pairing_code: String,
    device_id: String,
    name: Option<String>,
}

async fn pair(
    State(state): State<AppState>,
    payload: Result<Json<PairRequest>, JsonRejection>,
) -> Result<Json<PairResponse>, SyncError> {
    let Json(request) = payload?;
    let paired = state
        .engine
        .pair(
            &request.pairing_code,
            &request.device_id,
            request.name.as_deref(),
        )
        .await?;
    Ok(Json(paired))
}

async fn push<R: RecordTable>(
    State(state): State<AppState>,
    Extension(device): Extension<Device>,
    payload: Result<Json<Vec<Value>>, JsonRejection>,
) -> Result<Json<PushResponse<R>>, SyncError> {
    let Json(items) = payload?;
    let response = state.engine.push::<R>(&device, items).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct PullParams {
    #[serde(default)]
    since: i64,
}

async fn pull<R: RecordTable>(
    State(state): State<AppState>,
    Extension(device): Extension<Device>,
    params: Result<Query<PullParams>, QueryRejection>,
) -> Result<Json<PullResponse<R>>, SyncError> {
    let Query(params) = params?;
    let response = state.engine.pull::<R>(&device, params.since).await?;
    Ok(Json(response))
}
