//! Clients for external AI and catalog services.
//!
//! This crate provides:
//! - `CatalogSearch` and an HTTP books-catalog client
//! - `GenerationProvider` for keyframe images and scene videos, with image,
//!   direct-video and long-running-operation video adapters
//! - `ScriptWriter` with a Gemini-backed adapter
//!
//! Every adapter validates what it returns; corrupt or empty payloads are errors.

pub mod catalog;
pub mod config;
pub mod error;
pub mod generation;
pub mod media_check;
pub mod script;

pub use catalog::{BooksCatalogClient, CatalogCandidate, CatalogSearch};
pub use config::{CatalogConfig, GenerationConfig, ScriptWriterConfig, VideoBackend};
pub use error::{ClientError, ClientResult};
pub use generation::{
    build_generation_provider, CompositeProvider, DirectVideoGenerator, GenerationProvider,
    HttpImageGenerator, ImageGenerator, OperationVideoGenerator, VideoGenerator,
};
pub use script::{GeminiScriptWriter, ScriptRequest, ScriptWriter};
