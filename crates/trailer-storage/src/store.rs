//! Object store abstraction.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{StorageError, StorageResult};
use crate::local::LocalStore;
use crate::r2::R2Store;

/// Durable key/value storage for trailer artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key` and return its public URL.
    async fn save(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<String>;

    /// Read the object under `key`. Missing objects are `StorageError::NotFound`.
    async fn load(&self, key: &str) -> StorageResult<Vec<u8>>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Public URL of `key`, whether or not it exists yet.
    fn url(&self, key: &str) -> String;
}

/// Reject keys that could escape the store root or address nothing.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

pub(crate) fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

/// Build the configured object store.
pub async fn build_object_store(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config.backend {
        StorageBackend::Local => Ok(Arc::new(LocalStore::new(
            config.local_dir.clone(),
            config.public_base_url.clone(),
        ))),
        StorageBackend::R2 => {
            let r2 = config
                .r2
                .clone()
                .ok_or_else(|| StorageError::config_error("R2 backend selected but R2_* not set"))?;
            Ok(Arc::new(R2Store::new(r2).await?))
        }
    }
}
