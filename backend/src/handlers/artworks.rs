use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::activity_log::ActivityLog;
use crate::state::AppState;

use super::trash_service;

#[derive(Debug, Deserialize)]
pub struct BatchDeletePayload {
    pub ids: Vec<String>,
}

/// DELETE /api/admin/artworks/{id}
///
/// Soft delete: the artwork moves to trash and the response is the log entry
/// that can later restore it.
pub async fn delete_artwork(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActivityLog>, AppError> {
    let entry = trash_service(&state).trash_artwork(&id, None).await?;
    Ok(Json(entry))
}

/// POST /api/admin/artworks/batch-delete
pub async fn delete_artworks_batch(
    State(state): State<AppState>,
    Json(payload): Json<BatchDeletePayload>,
) -> Result<Json<ActivityLog>, AppError> {
    let entry = trash_service(&state)
        .trash_artworks_batch(&payload.ids, None)
        .await?;
    Ok(Json(entry))
}
