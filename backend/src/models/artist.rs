use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artist {
    /// JSON before-image stored in an activity-log entry.
    pub fn snapshot(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "profile_image": self.profile_image,
            "bio": self.bio,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        })
    }
}
