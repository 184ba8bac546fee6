//! Moderation service routes
//!
//! The thin HTTP boundary for the upload and polling collaborators:
//! register an asset, poll its status, list the gallery. Authentication
//! and role checks live in the gateway in front of this service.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{error::ApiError, models::NewAsset, state::AppState};

/// Create the router for the moderation service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/videos", post(ingest_video).get(list_videos))
        .route("/videos/:id", get(get_video))
        .route("/videos/:id/status", get(get_video_status))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "moderation-service"
    }))
}

/// Register an uploaded video and schedule its content analysis. Returns
/// immediately with the initial record; clients poll the status endpoint
/// for the verdict.
pub async fn ingest_video(
    State(state): State<AppState>,
    Json(payload): Json<NewAsset>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.storage_ref.trim().is_empty() {
        return Err(ApiError::BadRequest("storage_ref is required".to_string()));
    }

    let asset = state.orchestrator.ingest(payload).await.map_err(|e| {
        tracing::error!("Failed to register video: {}", e);
        ApiError::InternalServerError
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Video registered successfully. Content analysis in progress...",
            "video": asset,
        })),
    ))
}

/// Query parameters for the video listing
#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    /// When true, return only assets visible to viewers
    pub visible: Option<bool>,
}

/// List video assets, newest first
pub async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let assets = if query.visible.unwrap_or(false) {
        state.store.list_visible().await
    } else {
        state.store.list_all().await
    }
    .map_err(|e| {
        tracing::error!("Failed to list videos: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(assets))
}

/// Get a video asset by ID
pub async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let asset = state
        .store
        .get(id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get video: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(asset))
}

/// Get the moderation status of a video asset. Polled by clients until a
/// terminal state is observed.
pub async fn get_video_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state
        .store
        .status(id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get video status: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(status))
}
