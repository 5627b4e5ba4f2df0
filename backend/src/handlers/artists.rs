use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppError;
use crate::models::activity_log::ActivityLog;
use crate::state::AppState;

use super::trash_service;

/// DELETE /api/admin/artists/{id}
pub async fn delete_artist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActivityLog>, AppError> {
    let entry = trash_service(&state).trash_artist(&id, None).await?;
    Ok(Json(entry))
}
