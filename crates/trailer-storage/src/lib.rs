//! Durable storage for trailer artifacts.
//!
//! This crate provides:
//! - The `ObjectStore` abstraction with Cloudflare R2 and local filesystem backends
//! - Object keys for trailer videos and subtitles
//! - The result cache keyed by normalized (title, author), in memory or as
//!   gzip-compressed JSON objects

pub mod cache;
pub mod config;
pub mod error;
pub mod keys;
pub mod local;
pub mod r2;
pub mod store;

pub use cache::{CacheKey, MemoryResultCache, ObjectResultCache, ResultCache};
pub use config::{StorageBackend, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use keys::{trailer_subtitle_key, trailer_video_key};
pub use local::LocalStore;
pub use r2::{R2Config, R2Store};
pub use store::{build_object_store, ObjectStore};
