use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub storage_url: String,
    pub storage_bucket: String,
    pub storage_service_key: String,
    pub admin_api_key: String,
    pub trash_retention_days: i64,
    pub variant_transforms_enabled: bool,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/artfund".to_string());

        let storage_url =
            env::var("STORAGE_URL").unwrap_or_else(|_| "http://localhost:54321".to_string());

        let storage_bucket = env::var("STORAGE_BUCKET").unwrap_or_else(|_| "artworks".to_string());

        let storage_service_key = env::var("STORAGE_SERVICE_KEY").unwrap_or_default();

        let admin_api_key = env::var("ADMIN_API_KEY").unwrap_or_default();

        let trash_retention_days = env::var("TRASH_RETENTION_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let variant_transforms_enabled = env::var("VARIANT_TRANSFORMS_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Ok(Config {
            database_url,
            storage_url,
            storage_bucket,
            storage_service_key,
            admin_api_key,
            trash_retention_days,
            variant_transforms_enabled,
        })
    }

    /// The job binaries call this before doing any work; a missing service
    /// key is a setup error, not something to limp along without.
    pub fn require_storage_credentials(&self) -> anyhow::Result<()> {
        if self.storage_service_key.is_empty() {
            return Err(anyhow!("STORAGE_SERVICE_KEY is not set"));
        }
        Ok(())
    }

    /// Public URL prefix for objects in the managed bucket, with a trailing
    /// slash. Everything under this prefix is variant-managed.
    pub fn public_storage_base(&self) -> String {
        format!(
            "{}/storage/v1/object/public/{}/",
            self.storage_url.trim_end_matches('/'),
            self.storage_bucket
        )
    }
}
