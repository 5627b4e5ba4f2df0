use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};

use crate::models::artwork::Artwork;

const COLUMNS: &str =
    "id, artist_id, title, images, sort_order, sold, created_at, updated_at";

pub async fn fetch_artwork(pool: &PgPool, id: &str) -> Result<Option<Artwork>, sqlx::Error> {
    sqlx::query_as::<_, Artwork>(&format!("SELECT {COLUMNS} FROM artworks WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Stable page over all artworks for batch scans.
pub async fn fetch_artwork_page(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<Artwork>, sqlx::Error> {
    sqlx::query_as::<_, Artwork>(&format!(
        "SELECT {COLUMNS} FROM artworks ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Rewrites the image reference list, bumping `updated_at`.
pub async fn update_artwork_images<'e>(
    executor: impl PgExecutor<'e>,
    id: &str,
    images: &[String],
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE artworks SET images = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(Json(images))
        .bind(now)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes a row and hands back its before-image for snapshotting.
pub async fn delete_artwork_returning<'e>(
    executor: impl PgExecutor<'e>,
    id: &str,
) -> Result<Option<Artwork>, sqlx::Error> {
    sqlx::query_as::<_, Artwork>(&format!(
        "DELETE FROM artworks WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_artwork<'e>(
    executor: impl PgExecutor<'e>,
    artwork: &Artwork,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO artworks \
         (id, artist_id, title, images, sort_order, sold, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(&artwork.id)
    .bind(&artwork.artist_id)
    .bind(&artwork.title)
    .bind(&artwork.images)
    .bind(artwork.sort_order)
    .bind(artwork.sold)
    .bind(artwork.created_at)
    .bind(artwork.updated_at)
    .execute(executor)
    .await
    .map(|_| ())
}
