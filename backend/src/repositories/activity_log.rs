use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};

use crate::models::activity_log::ActivityLog;

const COLUMNS: &str = "id, action, actor_id, target_type, target_id, before_snapshot, \
     after_snapshot, reversible, reverted_at, purged_at, trash_expires_at, metadata, created_at";

pub async fn insert_activity_log<'e>(
    executor: impl PgExecutor<'e>,
    log: &ActivityLog,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO activity_logs \
         (id, action, actor_id, target_type, target_id, before_snapshot, after_snapshot, \
         reversible, reverted_at, purged_at, trash_expires_at, metadata, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(&log.id)
    .bind(&log.action)
    .bind(&log.actor_id)
    .bind(&log.target_type)
    .bind(&log.target_id)
    .bind(&log.before_snapshot)
    .bind(&log.after_snapshot)
    .bind(log.reversible)
    .bind(log.reverted_at)
    .bind(log.purged_at)
    .bind(log.trash_expires_at)
    .bind(&log.metadata)
    .bind(log.created_at)
    .execute(executor)
    .await
    .map(|_| ())
}

pub async fn fetch_activity_log(
    pool: &PgPool,
    id: &str,
) -> Result<Option<ActivityLog>, sqlx::Error> {
    sqlx::query_as::<_, ActivityLog>(&format!(
        "SELECT {COLUMNS} FROM activity_logs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Entries eligible for the purge sweep, soonest-expired first so the oldest
/// debt is cleared first when a limit applies.
pub async fn fetch_purge_candidates(
    pool: &PgPool,
    limit: i64,
    now: DateTime<Utc>,
) -> Result<Vec<ActivityLog>, sqlx::Error> {
    sqlx::query_as::<_, ActivityLog>(&format!(
        "SELECT {COLUMNS} FROM activity_logs \
         WHERE after_snapshot IS NULL \
           AND before_snapshot IS NOT NULL \
           AND reverted_at IS NULL \
           AND purged_at IS NULL \
           AND trash_expires_at < $1 \
         ORDER BY trash_expires_at ASC \
         LIMIT $2"
    ))
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Conditionally flips an entry to its permanently-purged state. The
/// precondition on `purged_at`/`reverted_at` is the only synchronization
/// point between concurrent purge runs and restores; a `false` return means
/// the race was lost and the caller must not write an audit entry.
pub async fn mark_purged<'e>(
    executor: impl PgExecutor<'e>,
    id: &str,
    cleanup_summary: &Value,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE activity_logs \
         SET purged_at = $2, \
             reversible = FALSE, \
             before_snapshot = NULL, \
             after_snapshot = NULL, \
             metadata = COALESCE(metadata, '{}'::jsonb) \
                 || jsonb_build_object('cleanup_result', $3::jsonb) \
         WHERE id = $1 AND purged_at IS NULL AND reverted_at IS NULL",
    )
    .bind(id)
    .bind(now)
    .bind(Json(cleanup_summary))
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Conditionally marks an entry restored. Fails (returns `false`) once the
/// entry has been purged or already reverted.
pub async fn mark_reverted<'e>(
    executor: impl PgExecutor<'e>,
    id: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE activity_logs \
         SET reverted_at = $2, \
             reversible = FALSE, \
             before_snapshot = NULL \
         WHERE id = $1 AND purged_at IS NULL AND reverted_at IS NULL",
    )
    .bind(id)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Restorable entries (the trash bin view), soonest-expiring first.
pub async fn list_trash(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<(Vec<ActivityLog>, i64), sqlx::Error> {
    const TRASH_PREDICATE: &str = "after_snapshot IS NULL \
         AND before_snapshot IS NOT NULL \
         AND reverted_at IS NULL \
         AND purged_at IS NULL";

    let items = sqlx::query_as::<_, ActivityLog>(&format!(
        "SELECT {COLUMNS} FROM activity_logs \
         WHERE {TRASH_PREDICATE} \
         ORDER BY trash_expires_at ASC NULLS LAST, created_at DESC, id DESC \
         LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM activity_logs WHERE {TRASH_PREDICATE}"
    ))
    .fetch_one(pool)
    .await?;

    Ok((items, total))
}
