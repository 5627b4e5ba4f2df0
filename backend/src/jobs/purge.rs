//! Trash purge sweep: finds activity-log entries past their retention
//! window, reclaims their storage objects (whole variant families, never a
//! subset) and flips each entry to its permanently-purged state. Designed to
//! be invoked from cron; concurrent runs are safe because the conditional
//! `mark_purged` update is the only synchronization point, and a crashed run
//! simply leaves its remaining candidates for the next invocation.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashSet;
use uuid::Uuid;

use crate::images::variants::{family_base, variant_family, VariantResolver};
use crate::models::activity_log::{
    ActionKind, ActivityLog, TargetType, META_CLEANUP_RESULT, META_SOURCE_ENTRY_ID,
    META_TARGET_NAMES,
};
use crate::models::snapshot::TrashSnapshot;
use crate::repositories::TrashLogStore;
use crate::storage::ObjectStore;

pub const DEFAULT_PURGE_LIMIT: i64 = 200;
pub const MAX_PURGE_LIMIT: i64 = 1000;

/// Storage delete batch size, sized to the store API's request limits.
const REMOVE_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct PurgeOptions {
    pub limit: i64,
    pub dry_run: bool,
}

impl Default for PurgeOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PURGE_LIMIT,
            dry_run: false,
        }
    }
}

impl PurgeOptions {
    pub fn effective_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_PURGE_LIMIT)
    }
}

/// Aggregate counters emitted as `key=value` lines for the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub dry_run: bool,
    pub candidates: u64,
    pub purged: u64,
    pub skipped: u64,
    pub failed: u64,
    pub artwork_objects_removed: u64,
    pub artist_objects_removed: u64,
    pub objects_failed: u64,
}

impl PurgeSummary {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("dry_run={}", self.dry_run),
            format!("candidates={}", self.candidates),
            format!("purged={}", self.purged),
            format!("skipped={}", self.skipped),
            format!("failed={}", self.failed),
            format!("artwork_objects_removed={}", self.artwork_objects_removed),
            format!("artist_objects_removed={}", self.artist_objects_removed),
            format!("objects_failed={}", self.objects_failed),
        ]
    }

    pub fn emit(&self) {
        for line in self.lines() {
            println!("{line}");
        }
    }
}

/// Bucket-relative delete paths for one candidate, split by target category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupPaths {
    pub artwork: Vec<String>,
    pub artist: Vec<String>,
}

impl CleanupPaths {
    pub fn total(&self) -> usize {
        self.artwork.len() + self.artist.len()
    }
}

/// Expands a candidate's snapshot into the storage objects to delete.
///
/// Entries without the deferred-cleanup flag contribute nothing: their
/// storage was reclaimed synchronously at delete time and the log entry only
/// exists for the undo window. Artwork images expand into their full
/// five-variant family (deduplicated by family base); an artist contributes
/// its single profile-image path. Ill-formed snapshots degrade to an empty
/// set rather than failing the candidate.
pub fn cleanup_paths(resolver: &VariantResolver, entry: &ActivityLog) -> CleanupPaths {
    let mut paths = CleanupPaths::default();
    if !entry.storage_cleanup_deferred() {
        return paths;
    }
    let Some(snapshot_value) = entry.before_snapshot.as_ref() else {
        return paths;
    };
    let snapshot = TrashSnapshot::parse(&entry.target_type, &snapshot_value.0);

    match TargetType::parse(&entry.target_type) {
        Some(TargetType::Artwork) => {
            let mut seen = HashSet::new();
            for url in snapshot.image_urls() {
                let Some(path) = resolver.storage_path(&url) else {
                    continue;
                };
                let base = family_base(&path);
                if seen.insert(base.clone()) {
                    paths.artwork.extend(variant_family(&base));
                }
            }
        }
        Some(TargetType::Artist) => {
            if let Some(url) = snapshot.profile_image() {
                if let Some(path) = resolver.storage_path(url) {
                    paths.artist.push(path);
                }
            }
        }
        None => {}
    }
    paths
}

pub async fn run_trash_purge(
    log: &dyn TrashLogStore,
    store: &dyn ObjectStore,
    resolver: &VariantResolver,
    opts: &PurgeOptions,
) -> anyhow::Result<PurgeSummary> {
    let now = Utc::now();

    // A failure here is fatal: without the candidate set there is no run.
    let candidates = log.purge_candidates(opts.effective_limit(), now).await?;

    let mut summary = PurgeSummary {
        dry_run: opts.dry_run,
        candidates: candidates.len() as u64,
        ..PurgeSummary::default()
    };

    if opts.dry_run {
        for entry in &candidates {
            tracing::info!(
                entry_id = %entry.id,
                target_type = %entry.target_type,
                target_id = %entry.target_id,
                expires_at = ?entry.trash_expires_at,
                "purge candidate (dry run)"
            );
        }
        return Ok(summary);
    }

    for entry in &candidates {
        match purge_entry(log, store, resolver, entry, now).await {
            Ok(Some(counts)) => {
                summary.purged += 1;
                summary.artwork_objects_removed += counts.artwork_removed;
                summary.artist_objects_removed += counts.artist_removed;
                summary.objects_failed += counts.failed;
            }
            Ok(None) => {
                summary.skipped += 1;
                tracing::info!(
                    entry_id = %entry.id,
                    "purge skipped: entry restored or purged concurrently"
                );
            }
            Err(err) => {
                summary.failed += 1;
                tracing::warn!(entry_id = %entry.id, error = %err, "failed to purge trash entry");
            }
        }
    }

    tracing::info!(
        candidates = summary.candidates,
        purged = summary.purged,
        skipped = summary.skipped,
        failed = summary.failed,
        "trash purge completed"
    );
    Ok(summary)
}

#[derive(Debug, Default)]
struct CleanupCounts {
    artwork_removed: u64,
    artist_removed: u64,
    failed: u64,
}

/// Processes one candidate. Returns `None` when the conditional purge update
/// lost a race; that outcome writes no audit entry.
async fn purge_entry(
    log: &dyn TrashLogStore,
    store: &dyn ObjectStore,
    resolver: &VariantResolver,
    entry: &ActivityLog,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<CleanupCounts>> {
    let paths = cleanup_paths(resolver, entry);
    let mut counts = CleanupCounts::default();

    remove_in_chunks(
        store,
        &paths.artwork,
        &entry.id,
        &mut counts.artwork_removed,
        &mut counts.failed,
    )
    .await;
    remove_in_chunks(
        store,
        &paths.artist,
        &entry.id,
        &mut counts.artist_removed,
        &mut counts.failed,
    )
    .await;

    let cleanup_summary = json!({
        "artwork_objects_removed": counts.artwork_removed,
        "artist_objects_removed": counts.artist_removed,
        "objects_failed": counts.failed,
        "paths_attempted": paths.total(),
    });

    if !log.mark_purged(&entry.id, &cleanup_summary, now).await? {
        return Ok(None);
    }

    let names = match entry.target_names() {
        Some(names) => names.clone(),
        None => {
            let snapshot_names = entry
                .before_snapshot
                .as_ref()
                .map(|s| TrashSnapshot::parse(&entry.target_type, &s.0).display_names())
                .unwrap_or_default();
            serde_json::to_value(snapshot_names)?
        }
    };

    let audit = ActivityLog {
        id: Uuid::new_v4().to_string(),
        action: ActionKind::TrashPurged.as_str().to_string(),
        actor_id: None,
        target_type: entry.target_type.clone(),
        target_id: entry.target_id.clone(),
        before_snapshot: None,
        after_snapshot: None,
        reversible: false,
        reverted_at: None,
        purged_at: None,
        trash_expires_at: None,
        metadata: Some(sqlx::types::Json(json!({
            META_SOURCE_ENTRY_ID: entry.id,
            META_TARGET_NAMES: names,
            META_CLEANUP_RESULT: cleanup_summary,
        }))),
        created_at: now,
    };
    log.insert(&audit).await?;

    Ok(Some(counts))
}

async fn remove_in_chunks(
    store: &dyn ObjectStore,
    paths: &[String],
    entry_id: &str,
    removed: &mut u64,
    failed: &mut u64,
) {
    for chunk in paths.chunks(REMOVE_CHUNK_SIZE) {
        match store.remove(chunk).await {
            Ok(outcomes) => {
                for outcome in outcomes {
                    if outcome.removed {
                        *removed += 1;
                    } else {
                        *failed += 1;
                        tracing::warn!(
                            entry_id,
                            path = %outcome.path,
                            error = ?outcome.error,
                            "storage object delete failed"
                        );
                    }
                }
            }
            Err(err) => {
                // The rest of the chunks still get their attempt.
                *failed += chunk.len() as u64;
                tracing::warn!(entry_id, error = %err, "storage delete batch failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity_log::META_STORAGE_CLEANUP_DEFERRED;
    use sqlx::types::Json;

    const BASE: &str = "https://store.test/storage/v1/object/public/artworks/";

    fn resolver() -> VariantResolver {
        VariantResolver::new(BASE)
    }

    fn artwork_entry(images: &[&str], deferred: bool) -> ActivityLog {
        ActivityLog {
            id: "log-1".to_string(),
            action: ActionKind::ArtworkDeleted.as_str().to_string(),
            actor_id: None,
            target_type: "artwork".to_string(),
            target_id: "art-1".to_string(),
            before_snapshot: Some(Json(json!({ "id": "art-1", "images": images }))),
            after_snapshot: None,
            reversible: true,
            reverted_at: None,
            purged_at: None,
            trash_expires_at: Some(Utc::now() - chrono::Duration::days(1)),
            metadata: Some(Json(json!({ META_STORAGE_CLEANUP_DEFERRED: deferred }))),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn artwork_cleanup_expands_full_families() {
        let a = format!("{BASE}abc/x.jpg");
        let b = format!("{BASE}abc/y.jpg");
        let paths = cleanup_paths(&resolver(), &artwork_entry(&[&a, &b], true));
        assert_eq!(paths.artwork.len(), 10);
        let unique: HashSet<_> = paths.artwork.iter().collect();
        assert_eq!(unique.len(), 10);
        assert!(paths.artwork.contains(&"abc/x__thumb.webp".to_string()));
        assert!(paths.artwork.contains(&"abc/y__original.webp".to_string()));
    }

    #[test]
    fn duplicate_variants_of_one_image_collapse_to_one_family() {
        let a = format!("{BASE}abc/x__thumb.webp");
        let b = format!("{BASE}abc/x__hero.webp");
        let paths = cleanup_paths(&resolver(), &artwork_entry(&[&a, &b], true));
        assert_eq!(paths.artwork.len(), 5);
    }

    #[test]
    fn non_deferred_entries_contribute_no_paths() {
        let a = format!("{BASE}abc/x.jpg");
        let paths = cleanup_paths(&resolver(), &artwork_entry(&[&a], false));
        assert_eq!(paths.total(), 0);
    }

    #[test]
    fn foreign_urls_contribute_no_paths() {
        let paths = cleanup_paths(
            &resolver(),
            &artwork_entry(&["https://cdn.example.com/x.jpg", "/static/x.png"], true),
        );
        assert_eq!(paths.total(), 0);
    }

    #[test]
    fn malformed_snapshot_degrades_to_empty_set() {
        let mut entry = artwork_entry(&[], true);
        entry.before_snapshot = Some(Json(json!("not an object")));
        assert_eq!(cleanup_paths(&resolver(), &entry).total(), 0);
    }

    #[test]
    fn artist_entry_contributes_single_profile_path() {
        let entry = ActivityLog {
            target_type: "artist".to_string(),
            before_snapshot: Some(Json(json!({
                "id": "artist-1",
                "name": "Mina",
                "profile_image": format!("{BASE}profiles/p.jpg"),
            }))),
            ..artwork_entry(&[], true)
        };
        let paths = cleanup_paths(&resolver(), &entry);
        assert_eq!(paths.artist, vec!["profiles/p.jpg".to_string()]);
        assert!(paths.artwork.is_empty());
    }

    #[test]
    fn limit_is_clamped_to_hard_cap() {
        let opts = PurgeOptions {
            limit: 5000,
            dry_run: false,
        };
        assert_eq!(opts.effective_limit(), MAX_PURGE_LIMIT);
        let opts = PurgeOptions {
            limit: 0,
            dry_run: false,
        };
        assert_eq!(opts.effective_limit(), 1);
        assert_eq!(PurgeOptions::default().limit, DEFAULT_PURGE_LIMIT);
    }

    #[test]
    fn summary_lines_are_key_value_pairs() {
        let summary = PurgeSummary {
            candidates: 3,
            purged: 2,
            ..PurgeSummary::default()
        };
        let lines = summary.lines();
        assert!(lines.contains(&"candidates=3".to_string()));
        assert!(lines.contains(&"purged=2".to_string()));
        for line in lines {
            assert_eq!(line.matches('=').count(), 1);
        }
    }
}
