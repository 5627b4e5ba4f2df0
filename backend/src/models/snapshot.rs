//! Lenient parser for `before_snapshot` payloads. Snapshots are untyped JSON
//! written at delete time; a shape mismatch degrades to "no cleanup paths"
//! instead of failing the candidate.

use serde_json::Value;
use std::collections::BTreeMap;

use super::activity_log::TargetType;

#[derive(Debug, Clone, PartialEq)]
pub struct ArtworkSnapshot {
    pub id: Option<String>,
    pub title: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistSnapshot {
    pub id: Option<String>,
    pub name: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrashSnapshot {
    /// One or more trashed artworks (batch deletes snapshot an array).
    Artworks(Vec<ArtworkSnapshot>),
    Artist(ArtistSnapshot),
}

impl TrashSnapshot {
    pub fn parse(target_type: &str, value: &Value) -> TrashSnapshot {
        match TargetType::parse(target_type) {
            Some(TargetType::Artwork) => {
                let items = match value {
                    Value::Array(items) => items.iter().map(parse_artwork).collect(),
                    Value::Object(_) => vec![parse_artwork(value)],
                    _ => Vec::new(),
                };
                TrashSnapshot::Artworks(items)
            }
            Some(TargetType::Artist) => TrashSnapshot::Artist(parse_artist(value)),
            None => TrashSnapshot::Artworks(Vec::new()),
        }
    }

    /// Every artwork image URL in the snapshot, in order. Artist snapshots
    /// contribute nothing here; their single profile image is handled
    /// separately.
    pub fn image_urls(&self) -> Vec<String> {
        match self {
            TrashSnapshot::Artworks(items) => {
                items.iter().flat_map(|a| a.images.iter().cloned()).collect()
            }
            TrashSnapshot::Artist(_) => Vec::new(),
        }
    }

    pub fn profile_image(&self) -> Option<&str> {
        match self {
            TrashSnapshot::Artist(artist) => artist.profile_image.as_deref(),
            TrashSnapshot::Artworks(_) => None,
        }
    }

    /// Name per target id, recovered from the snapshot itself.
    pub fn display_names(&self) -> BTreeMap<String, String> {
        let mut names = BTreeMap::new();
        match self {
            TrashSnapshot::Artworks(items) => {
                for item in items {
                    if let (Some(id), Some(title)) = (&item.id, &item.title) {
                        names.insert(id.clone(), title.clone());
                    }
                }
            }
            TrashSnapshot::Artist(artist) => {
                if let (Some(id), Some(name)) = (&artist.id, &artist.name) {
                    names.insert(id.clone(), name.clone());
                }
            }
        }
        names
    }
}

fn parse_artwork(value: &Value) -> ArtworkSnapshot {
    let images = value
        .get("images")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    ArtworkSnapshot {
        id: string_field(value, "id"),
        title: string_field(value, "title"),
        images,
    }
}

fn parse_artist(value: &Value) -> ArtistSnapshot {
    ArtistSnapshot {
        id: string_field(value, "id"),
        name: string_field(value, "name"),
        profile_image: string_field(value, "profile_image"),
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}
