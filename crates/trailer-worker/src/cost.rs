//! Estimated spend of a job.

use std::time::Duration;

use trailer_models::{CostReport, HierarchicalRetryState, SceneCost};

/// Unit costs in USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    /// Grounding and style bible
    pub base: f64,
    pub script: f64,
    pub keyframe: f64,
    pub video: f64,
    /// Extra share of the scene cost per retry
    pub retry_factor: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            base: 0.02,
            script: 0.01,
            keyframe: 0.04,
            video: 0.50,
            retry_factor: 0.33,
        }
    }
}

impl CostModel {
    pub fn scene_cost(&self) -> f64 {
        self.script + self.keyframe + self.video
    }

    /// Aggregate a cost report from the retry counters of a finished job.
    pub fn report(&self, state: &HierarchicalRetryState, elapsed: Duration) -> CostReport {
        let scenes: Vec<SceneCost> = state
            .scenes
            .iter()
            .map(|scene| {
                let retries = scene.retries.total();
                SceneCost {
                    scene_number: scene.scene_number,
                    retries,
                    cost_usd: round_cents(
                        self.scene_cost() * (1.0 + self.retry_factor * f64::from(retries)),
                    ),
                }
            })
            .collect();

        let total_retries = scenes.iter().map(|s| s.retries).sum();
        let total_cost_usd = round_cents(self.base + scenes.iter().map(|s| s.cost_usd).sum::<f64>());

        CostReport {
            base_cost_usd: self.base,
            scenes,
            total_cost_usd,
            total_retries,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Round to 1/10000 of a dollar to keep reports stable.
fn round_cents(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailer_models::{JobId, StageLimits};

    #[test]
    fn test_cost_without_retries() {
        let state = HierarchicalRetryState::new(JobId::from_string("j"), StageLimits::default(), 48);
        let report = CostModel::default().report(&state, Duration::from_millis(1500));

        assert_eq!(report.scenes.len(), 3);
        assert_eq!(report.total_retries, 0);
        assert!((report.total_cost_usd - (0.02 + 3.0 * 0.55)).abs() < 1e-9);
        assert_eq!(report.elapsed_ms, 1500);
    }

    #[test]
    fn test_retries_scale_scene_cost() {
        let state = HierarchicalRetryState::new(JobId::from_string("j"), StageLimits::default(), 48);
        let state = state.record_failure(2, "timeout").unwrap();
        let state = state.record_failure(2, "timeout").unwrap();

        let report = CostModel::default().report(&state, Duration::ZERO);
        let scene2 = report.scenes.iter().find(|s| s.scene_number == 2).unwrap();
        assert_eq!(scene2.retries, 2);
        assert!((scene2.cost_usd - round_cents(0.55 * 1.66)).abs() < 1e-9);
        assert_eq!(report.total_retries, 2);
    }
}
