//! REST client for the hosted object-storage service (Supabase-style API:
//! bearer service key, upsert uploads, batched deletes by prefix list).

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde_json::json;

use crate::config::Config;

use super::object_store::{ObjectStore, RemoveOutcome, StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl HttpObjectStore {
    pub fn new(config: &Config) -> Self {
        Self::from_parts(
            &config.storage_url,
            &config.storage_bucket,
            &config.storage_service_key,
        )
    }

    pub fn from_parts(base_url: &str, bucket: &str, service_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    fn bucket_url(&self) -> String {
        format!("{}/storage/v1/object/{}", self.base_url, self.bucket)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn download(&self, path: &str) -> StorageResult<Bytes> {
        let response = self
            .client
            .get(self.object_url(path))
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(path.to_string())),
            status if status.is_success() => Ok(response.bytes().await?),
            status => Err(StorageError::Request {
                path: path.to_string(),
                message: format!("download returned {status}"),
            }),
        }
    }

    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(&self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StorageError::Request {
                path: path.to_string(),
                message: format!("upload returned {status}"),
            })
        }
    }

    async fn remove(&self, paths: &[String]) -> StorageResult<Vec<RemoveOutcome>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .delete(self.bucket_url())
            .bearer_auth(&self.service_key)
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            // The service deletes what exists and silently skips what does
            // not; both count as removed for reconciliation purposes.
            Ok(paths.iter().map(RemoveOutcome::removed).collect())
        } else {
            Err(StorageError::Request {
                path: paths.join(","),
                message: format!("batch remove returned {status}"),
            })
        }
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let response = self
            .client
            .head(self.object_url(path))
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(StorageError::Request {
                path: path.to_string(),
                message: format!("head returned {status}"),
            }),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}
