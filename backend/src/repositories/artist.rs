use sqlx::{PgExecutor, PgPool};

use crate::models::artist::Artist;

const COLUMNS: &str = "id, name, profile_image, bio, created_at, updated_at";

pub async fn fetch_artist(pool: &PgPool, id: &str) -> Result<Option<Artist>, sqlx::Error> {
    sqlx::query_as::<_, Artist>(&format!("SELECT {COLUMNS} FROM artists WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Deletes a row and hands back its before-image for snapshotting.
pub async fn delete_artist_returning<'e>(
    executor: impl PgExecutor<'e>,
    id: &str,
) -> Result<Option<Artist>, sqlx::Error> {
    sqlx::query_as::<_, Artist>(&format!(
        "DELETE FROM artists WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_artist<'e>(
    executor: impl PgExecutor<'e>,
    artist: &Artist,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO artists (id, name, profile_image, bio, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(&artist.id)
    .bind(&artist.name)
    .bind(&artist.profile_image)
    .bind(&artist.bio)
    .bind(artist.created_at)
    .bind(artist.updated_at)
    .execute(executor)
    .await
    .map(|_| ())
}
