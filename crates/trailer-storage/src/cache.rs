//! Result cache keyed by normalized (title, author).
//!
//! Only the cache layer is modelled here; expiry and eviction belong to the
//! underlying storage.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use trailer_models::VideoGenerationResult;

use crate::error::{StorageError, StorageResult};
use crate::store::ObjectStore;

/// Content type for gzip-compressed JSON.
const CONTENT_TYPE_GZIP: &str = "application/gzip";

/// Normalized cache key.
///
/// Both parts are trimmed and lower-cased, and runs of whitespace collapse to a
/// single space. A missing author equals an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    title: String,
    author: String,
}

impl CacheKey {
    pub fn new(title: &str, author: Option<&str>) -> Self {
        Self {
            title: normalize(title),
            author: author.map(normalize).unwrap_or_default(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Stable hex digest used for object keys and lock names.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.author.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Object key of the persisted entry.
    ///
    /// Format: `cache/{sha256}.json.gz`
    pub fn object_key(&self) -> String {
        format!("cache/{}.json.gz", self.digest())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.title, self.author)
    }
}

fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Idempotency cache of completed results.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> StorageResult<Option<VideoGenerationResult>>;

    async fn set(&self, key: &CacheKey, result: &VideoGenerationResult) -> StorageResult<()>;

    async fn has(&self, key: &CacheKey) -> StorageResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryResultCache {
    entries: RwLock<HashMap<CacheKey, VideoGenerationResult>>,
}

impl MemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn get(&self, key: &CacheKey) -> StorageResult<Option<VideoGenerationResult>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &CacheKey, result: &VideoGenerationResult) -> StorageResult<()> {
        self.entries.write().await.insert(key.clone(), result.clone());
        Ok(())
    }

    async fn has(&self, key: &CacheKey) -> StorageResult<bool> {
        Ok(self.entries.read().await.contains_key(key))
    }
}

/// Cache persisted in an object store as gzip-compressed JSON.
#[derive(Clone)]
pub struct ObjectResultCache {
    store: Arc<dyn ObjectStore>,
}

impl ObjectResultCache {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResultCache for ObjectResultCache {
    /// Corrupt entries read as a miss.
    async fn get(&self, key: &CacheKey) -> StorageResult<Option<VideoGenerationResult>> {
        let object_key = key.object_key();
        let data = match self.store.load(&object_key).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                debug!(key = %key, "Result cache miss");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        match decompress_result(&data) {
            Some(result) => {
                debug!(key = %key, "Result cache hit");
                Ok(Some(result))
            }
            None => {
                warn!(key = %key, object_key = %object_key, "Result cache entry is corrupt, treating as miss");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &CacheKey, result: &VideoGenerationResult) -> StorageResult<()> {
        let compressed = compress_result(result)?;
        let object_key = key.object_key();
        debug!(
            key = %key,
            object_key = %object_key,
            compressed_size = compressed.len(),
            "Storing result in cache"
        );
        self.store
            .save(&object_key, compressed, CONTENT_TYPE_GZIP)
            .await?;
        Ok(())
    }

    async fn has(&self, key: &CacheKey) -> StorageResult<bool> {
        self.store.exists(&key.object_key()).await
    }
}

/// Serialize a result to gzip-compressed JSON.
pub fn compress_result(result: &VideoGenerationResult) -> StorageResult<Vec<u8>> {
    let json = serde_json::to_vec(result)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| StorageError::Serialization(format!("Failed to gzip result: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| StorageError::Serialization(format!("Failed to finish gzip encoding: {}", e)))
}

/// Decode gzip-compressed JSON. Returns `None` on any corruption.
pub fn decompress_result(data: &[u8]) -> Option<VideoGenerationResult> {
    let mut decoder = GzDecoder::new(data);
    let mut json = Vec::new();
    if let Err(e) = decoder.read_to_end(&mut json) {
        warn!(error = %e, "Failed to decompress cached result");
        return None;
    }
    match serde_json::from_slice(&json) {
        Ok(result) => Some(result),
        Err(e) => {
            warn!(error = %e, "Failed to parse cached result");
            None
        }
    }
}
