//! Book trailer worker.
//!
//! This crate provides:
//! - Book grounding, style bible derivation and scene planning
//! - The pipeline orchestrator driving scripts, QC and per-scene generation
//!   under the hierarchical retry coordinator
//! - Subtitle, assembly and upload of the final trailer, with cost reporting
//! - A job executor with a fixed pool of slots and graceful shutdown
//! - Completion callbacks, logging and metrics

pub mod callback;
pub mod config;
pub mod cost;
pub mod error;
pub mod executor;
pub mod grounding;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod planner;
pub mod retry;
pub mod single_flight;
pub mod style_bible;

pub use callback::{CompletionNotifier, LogNotifier, WebhookNotifier};
pub use config::{PipelineSettings, WorkerConfig};
pub use cost::CostModel;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use grounding::BookGrounder;
pub use logging::JobLogger;
pub use orchestrator::{PipelineComponents, PipelineOrchestrator};
pub use planner::TemplateScriptWriter;
