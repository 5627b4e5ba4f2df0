use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use std::fmt;

/// Metadata key: storage objects were left in place at delete time and must
/// be reclaimed by the purge job.
pub const META_STORAGE_CLEANUP_DEFERRED: &str = "storage_cleanup_deferred";
/// Metadata key: human-readable name per target id (map for batch entries).
pub const META_TARGET_NAMES: &str = "target_names";
/// Metadata key: cleanup counters merged in when an entry is purged.
pub const META_CLEANUP_RESULT: &str = "cleanup_result";
/// Metadata key on audit entries: the id of the entry the audit refers to.
pub const META_SOURCE_ENTRY_ID: &str = "source_entry_id";

/// Delimiter for multi-id `target_id` values on batch entries.
pub const TARGET_ID_DELIMITER: char = ',';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    ArtworkDeleted,
    ArtistDeleted,
    ArtistArtworkDeleted,
    BatchArtworkDeleted,
    ArtworkRestored,
    ArtistRestored,
    TrashPurged,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::ArtworkDeleted => "artwork_deleted",
            ActionKind::ArtistDeleted => "artist_deleted",
            ActionKind::ArtistArtworkDeleted => "artist_artwork_deleted",
            ActionKind::BatchArtworkDeleted => "batch_artwork_deleted",
            ActionKind::ArtworkRestored => "artwork_restored",
            ActionKind::ArtistRestored => "artist_restored",
            ActionKind::TrashPurged => "trash_purged",
        }
    }

    pub fn parse(s: &str) -> Option<ActionKind> {
        match s {
            "artwork_deleted" => Some(ActionKind::ArtworkDeleted),
            "artist_deleted" => Some(ActionKind::ArtistDeleted),
            "artist_artwork_deleted" => Some(ActionKind::ArtistArtworkDeleted),
            "batch_artwork_deleted" => Some(ActionKind::BatchArtworkDeleted),
            "artwork_restored" => Some(ActionKind::ArtworkRestored),
            "artist_restored" => Some(ActionKind::ArtistRestored),
            "trash_purged" => Some(ActionKind::TrashPurged),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a log entry's action applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Artwork,
    Artist,
}

impl TargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Artwork => "artwork",
            TargetType::Artist => "artist",
        }
    }

    pub fn parse(s: &str) -> Option<TargetType> {
        match s {
            "artwork" => Some(TargetType::Artwork),
            "artist" => Some(TargetType::Artist),
            _ => None,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded administrative action. A trashed (undoable) delete is the
/// combination `after_snapshot IS NULL` + `before_snapshot IS NOT NULL`;
/// purging nulls both snapshots and is one-way.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLog {
    pub id: String,
    pub action: String,
    pub actor_id: Option<String>,
    pub target_type: String,
    pub target_id: String,
    pub before_snapshot: Option<Json<Value>>,
    pub after_snapshot: Option<Json<Value>>,
    pub reversible: bool,
    pub reverted_at: Option<DateTime<Utc>>,
    pub purged_at: Option<DateTime<Utc>>,
    pub trash_expires_at: Option<DateTime<Utc>>,
    pub metadata: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    /// An entry can be restored while it still holds its before-image and
    /// has been neither reverted nor purged.
    pub fn is_restorable(&self) -> bool {
        self.after_snapshot.is_none()
            && self.before_snapshot.is_some()
            && self.reverted_at.is_none()
            && self.purged_at.is_none()
    }

    /// Eligible for the purge sweep: restorable and past its retention
    /// deadline.
    pub fn is_purgeable(&self, now: DateTime<Utc>) -> bool {
        self.is_restorable()
            && self
                .trash_expires_at
                .map(|deadline| deadline < now)
                .unwrap_or(false)
    }

    pub fn target_ids(&self) -> Vec<&str> {
        self.target_id
            .split(TARGET_ID_DELIMITER)
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn storage_cleanup_deferred(&self) -> bool {
        self.metadata_value(META_STORAGE_CLEANUP_DEFERRED)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// The name-per-id map carried in metadata, if present.
    pub fn target_names(&self) -> Option<&Value> {
        self.metadata_value(META_TARGET_NAMES)
    }

    fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.0.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn entry() -> ActivityLog {
        ActivityLog {
            id: "log-1".to_string(),
            action: ActionKind::ArtworkDeleted.as_str().to_string(),
            actor_id: None,
            target_type: TargetType::Artwork.as_str().to_string(),
            target_id: "art-1".to_string(),
            before_snapshot: Some(Json(json!({ "images": [] }))),
            after_snapshot: None,
            reversible: true,
            reverted_at: None,
            purged_at: None,
            trash_expires_at: Some(Utc::now() - Duration::days(1)),
            metadata: Some(Json(json!({ META_STORAGE_CLEANUP_DEFERRED: true }))),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn action_kind_round_trips() {
        for kind in [
            ActionKind::ArtworkDeleted,
            ActionKind::ArtistDeleted,
            ActionKind::ArtistArtworkDeleted,
            ActionKind::BatchArtworkDeleted,
            ActionKind::ArtworkRestored,
            ActionKind::ArtistRestored,
            ActionKind::TrashPurged,
        ] {
            assert_eq!(ActionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ActionKind::parse("unknown"), None);
    }

    #[test]
    fn expired_trashed_delete_is_purgeable() {
        let entry = entry();
        assert!(entry.is_restorable());
        assert!(entry.is_purgeable(Utc::now()));
    }

    #[test]
    fn purged_entry_is_not_restorable() {
        let mut entry = entry();
        entry.purged_at = Some(Utc::now());
        entry.before_snapshot = None;
        entry.reversible = false;
        assert!(!entry.is_restorable());
        assert!(!entry.is_purgeable(Utc::now()));
    }

    #[test]
    fn reverted_entry_is_not_purgeable() {
        let mut entry = entry();
        entry.reverted_at = Some(Utc::now());
        entry.before_snapshot = None;
        assert!(!entry.is_purgeable(Utc::now()));
    }

    #[test]
    fn unexpired_entry_is_not_purgeable() {
        let mut entry = entry();
        entry.trash_expires_at = Some(Utc::now() + Duration::days(10));
        assert!(entry.is_restorable());
        assert!(!entry.is_purgeable(Utc::now()));
    }

    #[test]
    fn target_ids_splits_batch_lists() {
        let mut entry = entry();
        entry.target_id = "a,b,c".to_string();
        assert_eq!(entry.target_ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn cleanup_deferred_defaults_to_false() {
        let mut entry = entry();
        entry.metadata = None;
        assert!(!entry.storage_cleanup_deferred());
        entry.metadata = Some(Json(json!({ "other": 1 })));
        assert!(!entry.storage_cleanup_deferred());
    }
}
