//! Terminal generation result and cost report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobId, QcReport};

/// Terminal status of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Completed,
    Failed,
}

/// Estimated cost of one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCost {
    pub scene_number: u8,
    pub retries: u32,
    pub cost_usd: f64,
}

/// Estimated spend of one job. Reporting only, never used for control flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub base_cost_usd: f64,
    pub scenes: Vec<SceneCost>,
    pub total_cost_usd: f64,
    pub total_retries: u32,
    pub elapsed_ms: u64,
}

/// Terminal artifact of a job. Written once, then cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoGenerationResult {
    pub job_id: JobId,
    pub status: GenerationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qc_report: Option<QcReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_report: Option<CostReport>,
    /// Scene numbers that made it into the video, ascending
    #[serde(default)]
    pub scenes_used: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_mode: Option<String>,
    #[serde(default)]
    pub cache_hit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl VideoGenerationResult {
    /// A failed result with an error message.
    pub fn failed(job_id: JobId, started_at: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            job_id,
            status: GenerationStatus::Failed,
            video_url: None,
            subtitle_url: None,
            qc_report: None,
            cost_report: None,
            scenes_used: Vec::new(),
            assembly_mode: None,
            cache_hit: false,
            error_message: Some(error.into()),
            started_at,
            completed_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == GenerationStatus::Completed
    }

    /// Whether fewer than all scenes made it into the video.
    pub fn is_partial(&self) -> bool {
        self.is_completed() && self.scenes_used.len() < crate::SCENE_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result() {
        let result = VideoGenerationResult::failed(JobId::new(), Utc::now(), "all scenes failed");
        assert!(!result.is_completed());
        assert!(!result.is_partial());
        assert_eq!(result.error_message.as_deref(), Some("all scenes failed"));
    }

    #[test]
    fn test_result_json_roundtrip() {
        let mut result = VideoGenerationResult::failed(JobId::new(), Utc::now(), "x");
        result.status = GenerationStatus::Completed;
        result.error_message = None;
        result.scenes_used = vec![1, 3];

        let json = serde_json::to_string(&result).unwrap();
        let parsed: VideoGenerationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
        assert!(parsed.is_partial());
    }
}
