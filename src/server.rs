//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/data` | Live snapshot |
//! | `GET`  | `/history?date=YYYY-MM-DD` | Historical snapshot |
//! | `GET`  | `/history/manifest` | Archived dates |
//! | `GET`  | `/config` | Project name and dataset names |
//! | `GET`  | `/mapbox-tiles/styles/v1/{path}` | Token-hiding style proxy |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser map clients
//! on other origins can read the data.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, RawQuery, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};

use crate::error::AppError;
use crate::models::{PublicConfig, SnapshotDocument};
use crate::services::{QueryService, TileProxy};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub query: Arc<QueryService>,
    pub tiles: Arc<TileProxy>,
}

/// Build the router with every route and the CORS layer.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/data", get(handle_live))
        .route("/history", get(handle_history))
        .route("/history/manifest", get(handle_manifest))
        .route("/config", get(handle_config))
        .route("/mapbox-tiles/styles/v1/{*path}", get(handle_tiles))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Serve `router` on `bind_addr` until Ctrl-C.
pub async fn serve(router: Router, bind_addr: &str) -> crate::error::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

// ============ Error response ============

/// JSON error response with an arbitrary body.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ============ GET /data ============

async fn handle_live(State(state): State<AppState>) -> Result<Json<SnapshotDocument>, ApiError> {
    state.query.live().await.map(Json).map_err(|e| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "live data unavailable", "details": e.to_string() }),
        )
    })
}

// ============ GET /history ============

#[derive(Debug, Deserialize)]
struct HistoryParams {
    #[serde(default)]
    date: Option<String>,
}

async fn handle_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<SnapshotDocument>, ApiError> {
    let date = params.date.unwrap_or_default();
    state
        .query
        .historical(date.trim())
        .await
        .map(Json)
        .map_err(|e| match e {
            AppError::InvalidDateFormat(_) => ApiError::new(
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid date format. Use YYYY-MM-DD" }),
            ),
            AppError::NotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, json!({ "error": "No data for that date" }))
            }
            other => {
                log::error!("History read failed for {}: {}", date, other);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "history data unavailable", "details": other.to_string() }),
                )
            }
        })
}

// ============ GET /history/manifest ============

async fn handle_manifest(State(state): State<AppState>) -> Json<Vec<String>> {
    match state.query.manifest().await {
        Ok(dates) => Json(dates),
        Err(e) => {
            log::warn!("Manifest unavailable: {}", e);
            Json(Vec::new())
        }
    }
}

// ============ GET /config ============

async fn handle_config(State(state): State<AppState>) -> Result<Json<PublicConfig>, ApiError> {
    state.query.public_config().map(Json).map_err(|e| {
        if e.is_config() {
            log::warn!("Project config unusable: {}", e);
        } else {
            log::error!("Config read failed: {}", e);
        }
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
    })
}

// ============ GET /mapbox-tiles/styles/v1/{path} ============

async fn handle_tiles(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    match state.tiles.fetch(&path, query.as_deref()).await {
        Ok(tile) if tile.is_success() => {
            let status = StatusCode::from_u16(tile.status).unwrap_or(StatusCode::OK);
            let mut response = (status, tile.body).into_response();
            let headers = response.headers_mut();
            for (name, value) in &tile.headers {
                if let (Ok(name), Ok(value)) =
                    (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
                {
                    headers.insert(name, value);
                }
            }
            response
        }
        Ok(tile) => {
            let status = StatusCode::from_u16(tile.status).unwrap_or(StatusCode::BAD_GATEWAY);
            ApiError::new(status, json!({ "error": "tile fetch failed", "status": tile.status }))
                .into_response()
        }
        Err(AppError::Proxy(message)) => {
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message })).into_response()
        }
        Err(AppError::NotFound(_)) => {
            ApiError::new(StatusCode::NOT_FOUND, json!({ "error": "tile fetch failed", "status": 404 }))
                .into_response()
        }
        Err(e) => {
            log::warn!("Tile fetch failed for {}: {}", path, e);
            ApiError::new(StatusCode::BAD_GATEWAY, json!({ "error": "tile fetch failed", "status": 502 }))
                .into_response()
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
