//! Quality control for trailer scripts.
//!
//! Four gates run in order:
//! 1. Safety (forbidden terms and tone, binary score)
//! 2. Typography (subtitle legibility against the style bible's plan)
//! 3. Consistency (style anchoring, scene-to-scene drift)
//! 4. Scoring (aggregate score and the retry policy)
//!
//! A failed safety gate short-circuits the rest. Everything here is pure.

pub mod consistency;
pub mod pipeline;
pub mod rules;
pub mod safety;
pub mod scoring;
mod text;
pub mod typography;

pub use consistency::ConsistencyChecker;
pub use pipeline::QcPipeline;
pub use rules::{
    ConsistencyRules, LocaleTerms, LocaleTypography, QcRules, RulesError, SafetyRules,
    ScoringRules, TypographyRules,
};
pub use safety::SafetyGate;
pub use scoring::{QcDecision, Scorer};
pub use typography::{contrast_ratio, TypographyValidator};
