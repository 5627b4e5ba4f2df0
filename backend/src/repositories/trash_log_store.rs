//! Dependency-injection seams for the batch jobs. The jobs run against these
//! traits so the test suite can drive them with in-memory implementations;
//! production wires up the Postgres-backed structs below, which hold their
//! pool explicitly instead of relying on an ambient client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::models::activity_log::ActivityLog;
use crate::models::artwork::Artwork;

use super::{activity_log, artwork};

/// Activity-log access needed by the trash purge job.
#[async_trait]
pub trait TrashLogStore: Send + Sync {
    async fn insert(&self, entry: &ActivityLog) -> anyhow::Result<()>;

    async fn purge_candidates(
        &self,
        limit: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ActivityLog>>;

    /// Compare-and-set purge transition; `false` means the race was lost.
    async fn mark_purged(
        &self,
        id: &str,
        cleanup_summary: &Value,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool>;
}

/// Artwork access needed by the variant backfill job.
#[async_trait]
pub trait ArtworkCatalog: Send + Sync {
    async fn page(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Artwork>>;

    async fn find(&self, id: &str) -> anyhow::Result<Option<Artwork>>;

    async fn update_images(
        &self,
        id: &str,
        images: &[String],
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone)]
pub struct PgTrashLog {
    pool: PgPool,
}

impl PgTrashLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrashLogStore for PgTrashLog {
    async fn insert(&self, entry: &ActivityLog) -> anyhow::Result<()> {
        activity_log::insert_activity_log(&self.pool, entry).await?;
        Ok(())
    }

    async fn purge_candidates(
        &self,
        limit: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ActivityLog>> {
        Ok(activity_log::fetch_purge_candidates(&self.pool, limit, now).await?)
    }

    async fn mark_purged(
        &self,
        id: &str,
        cleanup_summary: &Value,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        Ok(activity_log::mark_purged(&self.pool, id, cleanup_summary, now).await?)
    }
}

#[derive(Debug, Clone)]
pub struct PgArtworkCatalog {
    pool: PgPool,
}

impl PgArtworkCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtworkCatalog for PgArtworkCatalog {
    async fn page(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Artwork>> {
        Ok(artwork::fetch_artwork_page(&self.pool, limit, offset).await?)
    }

    async fn find(&self, id: &str) -> anyhow::Result<Option<Artwork>> {
        Ok(artwork::fetch_artwork(&self.pool, id).await?)
    }

    async fn update_images(
        &self,
        id: &str,
        images: &[String],
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        Ok(artwork::update_artwork_images(&self.pool, id, images, now).await?)
    }
}
