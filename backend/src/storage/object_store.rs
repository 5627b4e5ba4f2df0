//! Object store abstraction consumed by the jobs and (indirectly) the upload
//! pipeline. Implementations: [`crate::storage::HttpObjectStore`] against the
//! hosted storage service, [`crate::storage::MemoryObjectStore`] for tests
//! and local development.

use async_trait::async_trait;
use bytes::Bytes;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage request for `{path}` failed: {message}")]
    Request { path: String, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Per-path result of a batched remove. Removing an object that is already
/// gone counts as removed; the store treats it as a no-op.
#[derive(Debug, Clone)]
pub struct RemoveOutcome {
    pub path: String,
    pub removed: bool,
    pub error: Option<String>,
}

impl RemoveOutcome {
    pub fn removed(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            removed: true,
            error: None,
        }
    }

    pub fn failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            removed: false,
            error: Some(error.into()),
        }
    }
}

/// Namespaced blob store; paths are bucket-relative
/// (`{owning_entity_id}/{name}__{variant}.webp`).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download(&self, path: &str) -> StorageResult<Bytes>;

    /// Upserts: an existing object at `path` is overwritten.
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Batched delete with per-path outcomes. A transport-level failure for
    /// the whole batch is the `Err` case; callers count it against every
    /// path in the batch.
    async fn remove(&self, paths: &[String]) -> StorageResult<Vec<RemoveOutcome>>;

    async fn exists(&self, path: &str) -> StorageResult<bool>;

    fn public_url(&self, path: &str) -> String;
}
