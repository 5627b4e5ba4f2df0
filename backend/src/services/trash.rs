//! Write side of the soft-delete model: destructive admin actions become
//! immutable activity-log entries carrying a before-snapshot and a retention
//! deadline instead of plain row deletes. The purge job consumes what this
//! service writes.

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::activity_log::{
    ActionKind, ActivityLog, TargetType, META_SOURCE_ENTRY_ID, META_STORAGE_CLEANUP_DEFERRED,
    META_TARGET_NAMES, TARGET_ID_DELIMITER,
};
use crate::models::artist::Artist;
use crate::models::artwork::Artwork;
use crate::models::snapshot::TrashSnapshot;
use crate::repositories::{activity_log, artist as artist_repo, artwork as artwork_repo};

#[derive(Debug, Clone)]
pub struct TrashService {
    pool: PgPool,
    retention: Duration,
}

impl TrashService {
    pub fn new(pool: PgPool, retention_days: i64) -> Self {
        Self {
            pool,
            retention: Duration::days(retention_days),
        }
    }

    /// Soft-deletes one artwork: the row goes away, its before-image lands in
    /// a reversible log entry that expires after the retention window.
    pub async fn trash_artwork(
        &self,
        id: &str,
        actor_id: Option<&str>,
    ) -> Result<ActivityLog, AppError> {
        let mut tx = self.pool.begin().await?;

        let artwork = artwork_repo::delete_artwork_returning(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Artwork {id} not found")))?;

        let mut names = BTreeMap::new();
        names.insert(artwork.id.clone(), artwork.title.clone());

        let entry = self.deletion_entry(
            ActionKind::ArtworkDeleted,
            TargetType::Artwork,
            id.to_string(),
            artwork.snapshot(),
            names,
            actor_id,
        );
        activity_log::insert_activity_log(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(entry)
    }

    /// Soft-deletes several artworks behind a single log entry; `target_id`
    /// carries the delimited id list and the snapshot is an array.
    pub async fn trash_artworks_batch(
        &self,
        ids: &[String],
        actor_id: Option<&str>,
    ) -> Result<ActivityLog, AppError> {
        if ids.is_empty() {
            return Err(AppError::BadRequest("ids must not be empty".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let mut snapshots = Vec::with_capacity(ids.len());
        let mut names = BTreeMap::new();
        for id in ids {
            let artwork = artwork_repo::delete_artwork_returning(&mut *tx, id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Artwork {id} not found")))?;
            names.insert(artwork.id.clone(), artwork.title.clone());
            snapshots.push(artwork.snapshot());
        }

        let target_id = ids.join(&TARGET_ID_DELIMITER.to_string());
        let entry = self.deletion_entry(
            ActionKind::BatchArtworkDeleted,
            TargetType::Artwork,
            target_id,
            Value::Array(snapshots),
            names,
            actor_id,
        );
        activity_log::insert_activity_log(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(entry)
    }

    /// Soft-deletes an artist profile.
    pub async fn trash_artist(
        &self,
        id: &str,
        actor_id: Option<&str>,
    ) -> Result<ActivityLog, AppError> {
        let mut tx = self.pool.begin().await?;

        let artist = artist_repo::delete_artist_returning(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Artist {id} not found")))?;

        let mut names = BTreeMap::new();
        names.insert(artist.id.clone(), artist.name.clone());

        let entry = self.deletion_entry(
            ActionKind::ArtistDeleted,
            TargetType::Artist,
            id.to_string(),
            artist.snapshot(),
            names,
            actor_id,
        );
        activity_log::insert_activity_log(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(entry)
    }

    /// Restores the entity/entities held in a trash entry. Refused once the
    /// entry has been purged (its storage is gone) or already restored; the
    /// conditional update is the same optimistic guard the purge job uses,
    /// so a restore racing a purge cannot half-succeed.
    pub async fn restore(
        &self,
        entry_id: &str,
        actor_id: Option<&str>,
    ) -> Result<ActivityLog, AppError> {
        let entry = activity_log::fetch_activity_log(&self.pool, entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Trash entry {entry_id} not found")))?;
        ensure_restorable(&entry)?;

        let Some(Json(snapshot_value)) = entry.before_snapshot.clone() else {
            return Err(AppError::Conflict(
                "Trash entry no longer carries a snapshot".to_string(),
            ));
        };

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let restored_action = match TargetType::parse(&entry.target_type) {
            Some(TargetType::Artwork) => {
                for value in snapshot_rows(&snapshot_value) {
                    let mut artwork: Artwork = serde_json::from_value(value.clone())
                        .map_err(|e| AppError::InternalServerError(e.into()))?;
                    artwork.updated_at = now;
                    artwork_repo::insert_artwork(&mut *tx, &artwork).await?;
                }
                ActionKind::ArtworkRestored
            }
            Some(TargetType::Artist) => {
                let mut artist: Artist = serde_json::from_value(snapshot_value.clone())
                    .map_err(|e| AppError::InternalServerError(e.into()))?;
                artist.updated_at = now;
                artist_repo::insert_artist(&mut *tx, &artist).await?;
                ActionKind::ArtistRestored
            }
            None => {
                return Err(AppError::Conflict(format!(
                    "Trash entry has unknown target type `{}`",
                    entry.target_type
                )))
            }
        };

        let reverted = activity_log::mark_reverted(&mut *tx, entry_id, now).await?;
        if !reverted {
            // Lost a race with a purge run or a concurrent restore.
            return Err(AppError::Conflict(
                "Trash entry was purged or restored concurrently".to_string(),
            ));
        }

        let names = TrashSnapshot::parse(&entry.target_type, &snapshot_value).display_names();
        let audit = ActivityLog {
            id: Uuid::new_v4().to_string(),
            action: restored_action.as_str().to_string(),
            actor_id: actor_id.map(str::to_string),
            target_type: entry.target_type.clone(),
            target_id: entry.target_id.clone(),
            before_snapshot: None,
            after_snapshot: None,
            reversible: false,
            reverted_at: None,
            purged_at: None,
            trash_expires_at: None,
            metadata: Some(Json(json!({
                META_SOURCE_ENTRY_ID: entry.id,
                META_TARGET_NAMES: names,
            }))),
            created_at: now,
        };
        activity_log::insert_activity_log(&mut *tx, &audit).await?;

        tx.commit().await?;
        Ok(audit)
    }

    fn deletion_entry(
        &self,
        action: ActionKind,
        target_type: TargetType,
        target_id: String,
        before_snapshot: Value,
        names: BTreeMap<String, String>,
        actor_id: Option<&str>,
    ) -> ActivityLog {
        let now = Utc::now();
        ActivityLog {
            id: Uuid::new_v4().to_string(),
            action: action.as_str().to_string(),
            actor_id: actor_id.map(str::to_string),
            target_type: target_type.as_str().to_string(),
            target_id,
            before_snapshot: Some(Json(before_snapshot)),
            after_snapshot: None,
            reversible: true,
            reverted_at: None,
            purged_at: None,
            trash_expires_at: Some(now + self.retention),
            metadata: Some(Json(json!({
                META_STORAGE_CLEANUP_DEFERRED: true,
                META_TARGET_NAMES: names,
            }))),
            created_at: now,
        }
    }
}

/// Guard shared by the restore path: a purged entry's storage is gone and it
/// must never be treated as restorable again.
pub fn ensure_restorable(entry: &ActivityLog) -> Result<(), AppError> {
    if entry.purged_at.is_some() {
        return Err(AppError::Conflict(
            "Trash entry has been permanently purged".to_string(),
        ));
    }
    if entry.reverted_at.is_some() {
        return Err(AppError::Conflict(
            "Trash entry has already been restored".to_string(),
        ));
    }
    if !entry.is_restorable() {
        return Err(AppError::Conflict(
            "Entry is not a restorable delete".to_string(),
        ));
    }
    Ok(())
}

fn snapshot_rows(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn service() -> TrashService {
        // connect_lazy never opens a connection, but its pool maintenance
        // still needs a running Tokio context.
        let pool = PgPool::connect_lazy("postgres://localhost/unused").expect("lazy pool");
        TrashService::new(pool, 30)
    }

    #[tokio::test]
    async fn deletion_entry_carries_snapshot_retention_and_deferred_flag() {
        let mut names = BTreeMap::new();
        names.insert("art-1".to_string(), "Dawn".to_string());
        let entry = service().deletion_entry(
            ActionKind::ArtworkDeleted,
            TargetType::Artwork,
            "art-1".to_string(),
            json!({ "id": "art-1", "images": [] }),
            names,
            Some("admin"),
        );

        assert!(entry.reversible);
        assert!(entry.is_restorable());
        assert!(entry.before_snapshot.is_some());
        assert!(entry.after_snapshot.is_none());
        assert!(entry.storage_cleanup_deferred());
        assert_eq!(entry.actor_id.as_deref(), Some("admin"));

        let expires = entry.trash_expires_at.expect("deadline");
        let days = (expires - entry.created_at).num_days();
        assert_eq!(days, 30);

        let names = entry.target_names().expect("names");
        assert_eq!(names["art-1"], "Dawn");
    }

    fn trashed_entry() -> ActivityLog {
        ActivityLog {
            id: "log-1".to_string(),
            action: ActionKind::ArtworkDeleted.as_str().to_string(),
            actor_id: None,
            target_type: "artwork".to_string(),
            target_id: "art-1".to_string(),
            before_snapshot: Some(Json(json!({ "images": [] }))),
            after_snapshot: None,
            reversible: true,
            reverted_at: None,
            purged_at: None,
            trash_expires_at: Some(Utc::now() + Duration::days(30)),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn trashed_entry_is_restorable() {
        assert!(ensure_restorable(&trashed_entry()).is_ok());
    }

    #[test]
    fn restore_after_purge_is_rejected() {
        let mut entry = trashed_entry();
        entry.purged_at = Some(Utc::now());
        entry.before_snapshot = None;
        entry.reversible = false;
        assert!(matches!(
            ensure_restorable(&entry),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn double_restore_is_rejected() {
        let mut entry = trashed_entry();
        entry.reverted_at = Some(Utc::now());
        entry.before_snapshot = None;
        assert!(matches!(
            ensure_restorable(&entry),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn entry_without_snapshot_is_not_restorable() {
        let mut entry = trashed_entry();
        entry.before_snapshot = None;
        assert!(ensure_restorable(&entry).is_err());
    }
}
