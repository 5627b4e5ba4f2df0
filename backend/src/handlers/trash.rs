use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::models::activity_log::ActivityLog;
use crate::models::{PaginatedResponse, PaginationQuery};
use crate::repositories::activity_log;
use crate::state::AppState;

use super::trash_service;

/// Trash bin list item: the log entry without its snapshot payload, which
/// can be large and is of no use to the listing UI.
#[derive(Debug, Serialize)]
pub struct TrashItem {
    pub id: String,
    pub action: String,
    pub target_type: String,
    pub target_ids: Vec<String>,
    pub target_names: Option<Value>,
    pub trash_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityLog> for TrashItem {
    fn from(entry: ActivityLog) -> Self {
        let target_ids = entry.target_ids().iter().map(|s| s.to_string()).collect();
        let target_names = entry.target_names().cloned();
        Self {
            id: entry.id,
            action: entry.action,
            target_type: entry.target_type,
            target_ids,
            target_names,
            trash_expires_at: entry.trash_expires_at,
            created_at: entry.created_at,
        }
    }
}

/// GET /api/admin/trash
pub async fn list_trash(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<TrashItem>>, AppError> {
    let limit = pagination.limit();
    let offset = pagination.offset();
    let (entries, total) = activity_log::list_trash(state.pool.as_ref(), limit, offset).await?;

    let items = entries.into_iter().map(TrashItem::from).collect();
    Ok(Json(PaginatedResponse::new(items, total, limit, offset)))
}

/// POST /api/admin/trash/{id}/restore
pub async fn restore_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActivityLog>, AppError> {
    let audit = trash_service(&state).restore(&id, None).await?;
    Ok(Json(audit))
}
