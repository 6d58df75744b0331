//! Client configuration.

use std::time::Duration;

use crate::error::{ClientError, ClientResult};

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Configuration for the books catalog client.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Catalog calls are short; a slow catalog means fallback, not waiting
    pub timeout: Duration,
    pub max_results: u32,
    /// Retries for transient errors
    pub max_retries: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/books/v1".to_string(),
            api_key: None,
            timeout: Duration::from_secs(5),
            max_results: 10,
            max_retries: 1,
        }
    }
}

impl CatalogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("CATALOG_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("CATALOG_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout: Duration::from_secs(env_parse("CATALOG_TIMEOUT_SECS", 5)),
            max_results: env_parse("CATALOG_MAX_RESULTS", defaults.max_results),
            max_retries: env_parse("CATALOG_MAX_RETRIES", defaults.max_retries),
        }
    }
}

/// Which video adapter is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoBackend {
    /// One synchronous request returns the video bytes
    Direct,
    /// Submit a long-running operation, poll it, then download
    Operation,
}

impl std::str::FromStr for VideoBackend {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(VideoBackend::Direct),
            "operation" | "longrunning" | "long_running" => Ok(VideoBackend::Operation),
            other => Err(ClientError::config(format!("unknown VIDEO_BACKEND '{}'", other))),
        }
    }
}

/// Configuration for image and video generation.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub image_api_url: String,
    pub video_api_url: String,
    pub video_backend: VideoBackend,
    pub api_key: Option<String>,
    /// Per-call timeout; generation takes minutes
    pub timeout: Duration,
    /// Interval between operation status polls
    pub poll_interval: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            image_api_url: "http://localhost:8010".to_string(),
            video_api_url: "http://localhost:8011".to_string(),
            video_backend: VideoBackend::Direct,
            api_key: None,
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(10),
        }
    }
}

impl GenerationConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let defaults = Self::default();
        let video_backend = match std::env::var("VIDEO_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.video_backend,
        };
        Ok(Self {
            image_api_url: std::env::var("IMAGE_API_URL").unwrap_or(defaults.image_api_url),
            video_api_url: std::env::var("VIDEO_API_URL").unwrap_or(defaults.video_api_url),
            video_backend,
            api_key: std::env::var("GENERATION_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout: Duration::from_secs(env_parse("GENERATION_TIMEOUT_SECS", 300)),
            poll_interval: Duration::from_secs(env_parse("VIDEO_POLL_INTERVAL_SECS", 10)),
        })
    }
}

/// Configuration for the LLM script writer.
#[derive(Debug, Clone)]
pub struct ScriptWriterConfig {
    /// Without a key the deterministic template writer is used
    pub api_key: Option<String>,
    pub model: String,
    /// Fallback models tried in order after `model`
    pub fallback_models: Vec<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ScriptWriterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            fallback_models: vec!["gemini-2.5-flash-lite".to_string()],
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ScriptWriterConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            fallback_models: defaults.fallback_models,
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(env_parse("GEMINI_TIMEOUT_SECS", 60)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}
