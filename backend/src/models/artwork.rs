use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Artwork {
    pub id: String,
    pub artist_id: String,
    pub title: String,
    /// Ordered public URLs of the artwork's images.
    pub images: Json<Vec<String>>,
    pub sort_order: i32,
    pub sold: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artwork {
    /// JSON before-image stored in an activity-log entry.
    pub fn snapshot(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "artist_id": self.artist_id,
            "title": self.title,
            "images": self.images.0,
            "sort_order": self.sort_order,
            "sold": self.sold,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        })
    }
}
