//! Shared data models for the book trailer pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Trailer jobs and completion events
//! - Grounded book facts and the per-job style bible
//! - Scene plans and scripts
//! - Hierarchical retry state (pure transitions)
//! - QC reports, cost reports and the terminal generation result

pub mod book;
pub mod job;
pub mod locale;
pub mod qc;
pub mod result;
pub mod retry;
pub mod scene;
pub mod style;
pub mod text;

// Re-export common types
pub use book::{BookFacts, Character, PlotBeat};
pub use job::{CompletionEvent, CompletionStatus, JobId, TrailerJob};
pub use locale::Locale;
pub use qc::{
    ConsistencyResult, GateStatus, QcGate, QcReport, SafetyResult, SceneTypographyChecks,
    ScoringResult, TypographyResult,
};
pub use result::{CostReport, GenerationStatus, SceneCost, VideoGenerationResult};
pub use retry::{
    HierarchicalRetryState, MediaBytes, SceneRetryState, SceneStatus, Stage, StageCounters,
    StageLimits, StageOutput, TransitionError,
};
pub use scene::{ScenePlan, SceneScript, SceneType, SCENE_COUNT};
pub use style::{StyleBible, SubtitleZone, TypographyPlan};
