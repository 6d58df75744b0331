//! Quality-control report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one QC gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
    Pass,
    Fail,
    /// Skipped because an earlier gate short-circuited the pipeline
    NotEvaluated,
}

impl GateStatus {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            GateStatus::Pass
        } else {
            GateStatus::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, GateStatus::Pass)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GateStatus::Pass => "pass",
            GateStatus::Fail => "fail",
            GateStatus::NotEvaluated => "not_evaluated",
        }
    }
}

/// QC gates, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QcGate {
    Safety,
    Typography,
    Consistency,
    Scoring,
}

impl QcGate {
    pub fn as_str(&self) -> &'static str {
        match self {
            QcGate::Safety => "safety",
            QcGate::Typography => "typography",
            QcGate::Consistency => "consistency",
            QcGate::Scoring => "scoring",
        }
    }
}

/// Safety gate result. The score is exactly 0.0 or 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyResult {
    pub status: GateStatus,
    pub score: f64,
    pub tone_score: f64,
    pub violations: Vec<String>,
}

/// Individual typography checks for one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneTypographyChecks {
    pub scene_number: u8,
    pub subtitle_length: bool,
    pub line_count: bool,
    pub safe_area: bool,
    pub font_size: bool,
    pub contrast: bool,
}

impl SceneTypographyChecks {
    pub fn results(&self) -> [bool; 5] {
        [
            self.subtitle_length,
            self.line_count,
            self.safe_area,
            self.font_size,
            self.contrast,
        ]
    }

    pub fn passed_count(&self) -> usize {
        self.results().iter().filter(|ok| **ok).count()
    }
}

/// Typography gate result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypographyResult {
    pub status: GateStatus,
    /// Fraction of individual checks passed across all scenes
    pub score: f64,
    pub scenes: Vec<SceneTypographyChecks>,
    pub violations: Vec<String>,
}

/// Consistency gate result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyResult {
    pub status: GateStatus,
    /// Average of anchor match, scene consistency and (1 - colour drift)
    pub score: f64,
    pub anchor_match: f64,
    pub scene_consistency: f64,
    pub color_drift: f64,
    pub style_signature_match: bool,
    pub violations: Vec<String>,
}

/// Aggregate scoring result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub status: GateStatus,
    pub overall_score: f64,
}

/// Per-attempt QC report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcReport {
    pub safety: SafetyResult,
    /// `None` when the safety gate short-circuited
    pub typography: Option<TypographyResult>,
    /// `None` when the safety gate short-circuited
    pub consistency: Option<ConsistencyResult>,
    pub scoring: ScoringResult,
    pub evaluated_at: DateTime<Utc>,
}

impl QcReport {
    pub fn gate_status(&self, gate: QcGate) -> GateStatus {
        match gate {
            QcGate::Safety => self.safety.status,
            QcGate::Typography => self
                .typography
                .as_ref()
                .map(|t| t.status)
                .unwrap_or(GateStatus::NotEvaluated),
            QcGate::Consistency => self
                .consistency
                .as_ref()
                .map(|c| c.status)
                .unwrap_or(GateStatus::NotEvaluated),
            QcGate::Scoring => self.scoring.status,
        }
    }

    pub fn passed(&self) -> bool {
        self.scoring.status.is_pass()
    }

    pub fn is_unsafe(&self) -> bool {
        !self.safety.status.is_pass()
    }

    /// Every violation, prefixed with the gate that raised it.
    pub fn violations(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .safety
            .violations
            .iter()
            .map(|v| format!("safety: {}", v))
            .collect();
        if let Some(t) = &self.typography {
            all.extend(t.violations.iter().map(|v| format!("typography: {}", v)));
        }
        if let Some(c) = &self.consistency {
            all.extend(c.violations.iter().map(|v| format!("consistency: {}", v)));
        }
        all
    }
}
