//! Aggregate scoring and the script-regeneration policy.

use trailer_models::{
    ConsistencyResult, GateStatus, QcReport, SafetyResult, ScoringResult, TypographyResult,
};

use crate::rules::ScoringRules;

/// What the orchestrator should do with a QC report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QcDecision {
    /// Use the scripts as they are
    Accept,
    /// Regenerate the scripts and evaluate again
    Retry,
    /// Give up on the job
    Abort,
}

#[derive(Debug, Clone)]
pub struct Scorer {
    rules: ScoringRules,
}

impl Scorer {
    pub fn new(rules: ScoringRules) -> Self {
        Self { rules }
    }

    /// Weighted overall score; passes only when every gate passed.
    ///
    /// Unsafe content scores 0.0 regardless of the other gates.
    pub fn score(
        &self,
        safety: &SafetyResult,
        typography: Option<&TypographyResult>,
        consistency: Option<&ConsistencyResult>,
    ) -> ScoringResult {
        let (Some(typography), Some(consistency)) = (typography, consistency) else {
            return ScoringResult {
                status: GateStatus::Fail,
                overall_score: 0.0,
            };
        };
        if !safety.status.is_pass() {
            return ScoringResult {
                status: GateStatus::Fail,
                overall_score: 0.0,
            };
        }

        let weights = self.rules.safety_weight
            + self.rules.typography_weight
            + self.rules.consistency_weight;
        let weighted = self.rules.safety_weight * safety.score
            + self.rules.typography_weight * typography.score
            + self.rules.consistency_weight * consistency.score;
        let overall_score = if weights > 0.0 {
            (weighted / weights).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let passed = typography.status.is_pass() && consistency.status.is_pass();
        ScoringResult {
            status: GateStatus::from_passed(passed),
            overall_score,
        }
    }

    /// Decide whether to accept, regenerate or abort after `retry_count`
    /// regeneration rounds.
    pub fn should_retry(&self, report: &QcReport, retry_count: u32) -> QcDecision {
        if report.is_unsafe() {
            return QcDecision::Abort;
        }
        if report.passed() {
            return QcDecision::Accept;
        }
        if retry_count < self.rules.max_retries {
            return QcDecision::Retry;
        }
        if report.scoring.overall_score >= self.rules.min_accept_score {
            QcDecision::Accept
        } else {
            QcDecision::Abort
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.rules.max_retries
    }
}
