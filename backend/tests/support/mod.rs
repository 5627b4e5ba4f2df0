#![allow(dead_code)]
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use image::{ImageFormat, RgbaImage};
use serde_json::{json, Value};
use sqlx::types::Json;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use artfund_backend::{
    images::variants::VariantResolver,
    models::activity_log::{
        ActionKind, ActivityLog, TargetType, META_CLEANUP_RESULT, META_STORAGE_CLEANUP_DEFERRED,
        META_TARGET_NAMES,
    },
    models::artwork::Artwork,
    repositories::{ArtworkCatalog, TrashLogStore},
    storage::MemoryObjectStore,
};

/// Public prefix all fixtures share; must match the object store fake's.
pub const PUBLIC_BASE: &str = "https://store.test/storage/v1/object/public/artworks/";

pub fn resolver() -> VariantResolver {
    VariantResolver::new(PUBLIC_BASE)
}

pub fn object_store() -> MemoryObjectStore {
    MemoryObjectStore::new(PUBLIC_BASE)
}

pub fn public_url(path: &str) -> String {
    format!("{PUBLIC_BASE}{path}")
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, image::Rgba([80, 140, 30, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("encode png");
    out.into_inner()
}

pub fn artwork(id: &str, images: &[String]) -> Artwork {
    let now = Utc::now();
    Artwork {
        id: id.to_string(),
        artist_id: "artist-1".to_string(),
        title: format!("Untitled ({id})"),
        images: Json(images.to_vec()),
        sort_order: 0,
        sold: false,
        created_at: now,
        updated_at: now,
    }
}

/// An expired artwork trash entry with deferred storage cleanup, the normal
/// shape the purge job sees.
pub fn trashed_artwork_entry(id: &str, target_id: &str, images: &[String]) -> ActivityLog {
    let now = Utc::now();
    ActivityLog {
        id: id.to_string(),
        action: ActionKind::ArtworkDeleted.as_str().to_string(),
        actor_id: None,
        target_type: TargetType::Artwork.as_str().to_string(),
        target_id: target_id.to_string(),
        before_snapshot: Some(Json(json!({
            "id": target_id,
            "artist_id": "artist-1",
            "title": format!("Untitled ({target_id})"),
            "images": images,
            "sort_order": 0,
            "sold": false,
            "created_at": now,
            "updated_at": now,
        }))),
        after_snapshot: None,
        reversible: true,
        reverted_at: None,
        purged_at: None,
        trash_expires_at: Some(now - Duration::days(1)),
        metadata: Some(Json(json!({
            META_STORAGE_CLEANUP_DEFERRED: true,
            META_TARGET_NAMES: { target_id: format!("Untitled ({target_id})") },
        }))),
        created_at: now - Duration::days(31),
    }
}

pub fn trashed_artist_entry(id: &str, target_id: &str, profile_image: &str) -> ActivityLog {
    let now = Utc::now();
    ActivityLog {
        id: id.to_string(),
        action: ActionKind::ArtistDeleted.as_str().to_string(),
        actor_id: None,
        target_type: TargetType::Artist.as_str().to_string(),
        target_id: target_id.to_string(),
        before_snapshot: Some(Json(json!({
            "id": target_id,
            "name": "Mina",
            "profile_image": profile_image,
            "bio": null,
            "created_at": now,
            "updated_at": now,
        }))),
        after_snapshot: None,
        reversible: true,
        reverted_at: None,
        purged_at: None,
        trash_expires_at: Some(now - Duration::days(1)),
        metadata: Some(Json(json!({
            META_STORAGE_CLEANUP_DEFERRED: true,
            META_TARGET_NAMES: { target_id: "Mina" },
        }))),
        created_at: now - Duration::days(31),
    }
}

/// In-memory activity log with the same conditional-update semantics as the
/// Postgres repository.
#[derive(Default)]
pub struct MemoryTrashLog {
    entries: Mutex<Vec<ActivityLog>>,
}

impl MemoryTrashLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<ActivityLog>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn push(&self, entry: ActivityLog) {
        self.entries.lock().expect("lock entries").push(entry);
    }

    pub fn entries(&self) -> Vec<ActivityLog> {
        self.entries.lock().expect("lock entries").clone()
    }

    pub fn entry(&self, id: &str) -> Option<ActivityLog> {
        self.entries().into_iter().find(|e| e.id == id)
    }

    pub fn entries_with_action(&self, action: ActionKind) -> Vec<ActivityLog> {
        self.entries()
            .into_iter()
            .filter(|e| e.action == action.as_str())
            .collect()
    }
}

#[async_trait]
impl TrashLogStore for MemoryTrashLog {
    async fn insert(&self, entry: &ActivityLog) -> anyhow::Result<()> {
        self.push(entry.clone());
        Ok(())
    }

    async fn purge_candidates(
        &self,
        limit: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ActivityLog>> {
        let mut candidates: Vec<ActivityLog> = self
            .entries()
            .into_iter()
            .filter(|e| e.is_purgeable(now))
            .collect();
        candidates.sort_by_key(|e| e.trash_expires_at);
        candidates.truncate(limit.max(0) as usize);
        Ok(candidates)
    }

    async fn mark_purged(
        &self,
        id: &str,
        cleanup_summary: &Value,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut entries = self.entries.lock().expect("lock entries");
        let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
            return Ok(false);
        };
        if entry.purged_at.is_some() || entry.reverted_at.is_some() {
            return Ok(false);
        }
        entry.purged_at = Some(now);
        entry.reversible = false;
        entry.before_snapshot = None;
        entry.after_snapshot = None;
        let mut metadata = entry
            .metadata
            .take()
            .map(|m| m.0)
            .unwrap_or_else(|| json!({}));
        metadata[META_CLEANUP_RESULT] = cleanup_summary.clone();
        entry.metadata = Some(Json(metadata));
        Ok(true)
    }
}

/// In-memory artwork catalog; counts reference rewrites so dry-run purity
/// can be asserted.
#[derive(Default)]
pub struct MemoryArtworkCatalog {
    artworks: Mutex<Vec<Artwork>>,
    fail_updates: Mutex<Vec<String>>,
    update_calls: AtomicU64,
}

impl MemoryArtworkCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artworks(artworks: Vec<Artwork>) -> Self {
        Self {
            artworks: Mutex::new(artworks),
            ..Self::default()
        }
    }

    /// Any `update_images` for `id` will fail afterwards.
    pub fn fail_update_on(&self, id: &str) {
        self.fail_updates
            .lock()
            .expect("lock fail updates")
            .push(id.to_string());
    }

    pub fn images_of(&self, id: &str) -> Vec<String> {
        self.artworks
            .lock()
            .expect("lock artworks")
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.images.0.clone())
            .unwrap_or_default()
    }

    pub fn update_calls(&self) -> u64 {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtworkCatalog for MemoryArtworkCatalog {
    async fn page(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Artwork>> {
        let artworks = self.artworks.lock().expect("lock artworks");
        Ok(artworks
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn find(&self, id: &str) -> anyhow::Result<Option<Artwork>> {
        let artworks = self.artworks.lock().expect("lock artworks");
        Ok(artworks.iter().find(|a| a.id == id).cloned())
    }

    async fn update_images(
        &self,
        id: &str,
        images: &[String],
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_updates
            .lock()
            .expect("lock fail updates")
            .iter()
            .any(|failing| failing == id)
        {
            anyhow::bail!("injected update failure for {id}");
        }
        let mut artworks = self.artworks.lock().expect("lock artworks");
        let Some(artwork) = artworks.iter_mut().find(|a| a.id == id) else {
            return Ok(false);
        };
        artwork.images = Json(images.to_vec());
        artwork.updated_at = now;
        Ok(true)
    }
}

pub fn unique_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}
