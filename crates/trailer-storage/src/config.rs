//! Storage configuration.

use std::path::PathBuf;

use crate::error::{StorageError, StorageResult};
use crate::r2::R2Config;

/// Which object store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    R2,
    Local,
}

impl std::str::FromStr for StorageBackend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "r2" | "s3" => Ok(StorageBackend::R2),
            "local" | "fs" => Ok(StorageBackend::Local),
            other => Err(StorageError::config_error(format!(
                "unknown STORAGE_BACKEND '{}'",
                other
            ))),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory of the local backend
    pub local_dir: PathBuf,
    /// Base URL objects are served from
    pub public_base_url: String,
    pub r2: Option<R2Config>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_dir: PathBuf::from("./storage"),
            public_base_url: "http://localhost:8080/media".to_string(),
            r2: None,
        }
    }
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let defaults = Self::default();
        let backend = match std::env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.backend,
        };

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .or_else(|_| std::env::var("R2_PUBLIC_URL"))
            .unwrap_or(defaults.public_base_url);

        let r2 = match backend {
            StorageBackend::R2 => Some(R2Config::from_env()?),
            StorageBackend::Local => None,
        };

        Ok(Self {
            backend,
            local_dir: std::env::var("LOCAL_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_dir),
            public_base_url,
            r2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("R2".parse::<StorageBackend>().unwrap(), StorageBackend::R2);
        assert_eq!("local".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
        assert!("gcs".parse::<StorageBackend>().is_err());
    }
}
