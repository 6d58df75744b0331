//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use trailer_models::StageLimits;

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Tunables of one pipeline execution.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Per-stage retry limits
    pub retry_limits: StageLimits,
    /// Hard bound on generation attempts across all scenes of a job. Never
    /// below `retry_limits.max_attempts_per_job()`.
    pub max_total_attempts: u32,
    /// Delay before retry `n` is `n * backoff_base`
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Script regeneration rounds driven by QC
    pub qc_max_rounds: u32,
    pub scene_duration_secs: u32,
    /// Parent directory of per-job scratch directories
    pub work_dir: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let retry_limits = StageLimits::default();
        Self {
            retry_limits,
            max_total_attempts: retry_limits.max_attempts_per_job(),
            backoff_base: Duration::from_millis(1000),
            backoff_max: Duration::from_millis(30_000),
            qc_max_rounds: 2,
            scene_duration_secs: 8,
            work_dir: std::env::temp_dir().join("book-trailer"),
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Job timeout
    pub job_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Work directory for temporary files
    pub work_dir: String,
    /// Timeout of one ffmpeg invocation
    pub ffmpeg_timeout_secs: u64,
    pub pipeline: PipelineSettings,
    /// Completion webhook; events are only logged when unset
    pub callback_url: Option<String>,
    /// JSON override of the embedded QC rules
    pub qc_rules_path: Option<PathBuf>,
    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let pipeline = PipelineSettings::default();
        Self {
            max_concurrent_jobs: 2,
            job_timeout: Duration::from_secs(3600),
            shutdown_timeout: Duration::from_secs(30),
            work_dir: pipeline.work_dir.to_string_lossy().into_owned(),
            ffmpeg_timeout_secs: 300,
            pipeline,
            callback_url: None,
            qc_rules_path: None,
            metrics_port: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let work_dir = std::env::var("WORKER_WORK_DIR").unwrap_or(defaults.work_dir);
        let limits = defaults.pipeline.retry_limits;
        let retry_limits = StageLimits {
            script: env_parse("PIPELINE_RETRY_SCRIPT", limits.script),
            keyframe: env_parse("PIPELINE_RETRY_KEYFRAME", limits.keyframe),
            video: env_parse("PIPELINE_RETRY_VIDEO", limits.video),
        };
        let attempt_floor = retry_limits.max_attempts_per_job();

        let pipeline = PipelineSettings {
            retry_limits,
            max_total_attempts: env_parse("PIPELINE_MAX_TOTAL_ATTEMPTS", attempt_floor)
                .max(attempt_floor),
            backoff_base: Duration::from_millis(env_parse("PIPELINE_BACKOFF_BASE_MS", 1000)),
            backoff_max: Duration::from_millis(env_parse("PIPELINE_BACKOFF_MAX_MS", 30_000)),
            qc_max_rounds: env_parse("PIPELINE_QC_MAX_ROUNDS", defaults.pipeline.qc_max_rounds),
            scene_duration_secs: env_parse(
                "PIPELINE_SCENE_DURATION_SECS",
                defaults.pipeline.scene_duration_secs,
            ),
            work_dir: PathBuf::from(&work_dir),
        };

        Self {
            max_concurrent_jobs: env_parse("WORKER_MAX_JOBS", defaults.max_concurrent_jobs).max(1),
            job_timeout: Duration::from_secs(env_parse("WORKER_JOB_TIMEOUT", 3600)),
            shutdown_timeout: Duration::from_secs(env_parse("WORKER_SHUTDOWN_TIMEOUT", 30)),
            work_dir,
            ffmpeg_timeout_secs: env_parse("WORKER_FFMPEG_TIMEOUT", defaults.ffmpeg_timeout_secs),
            pipeline,
            callback_url: std::env::var("CALLBACK_URL").ok().filter(|u| !u.is_empty()),
            qc_rules_path: std::env::var("QC_RULES_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            metrics_port: std::env::var("METRICS_PORT").ok().and_then(|p| p.parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.pipeline.retry_limits, StageLimits { script: 3, keyframe: 3, video: 2 });
        assert_eq!(config.pipeline.max_total_attempts, 84);
        assert_eq!(config.pipeline.scene_duration_secs, 8);
        assert!(config.callback_url.is_none());
    }

    #[test]
    fn test_attempt_cap_follows_retry_limits() {
        let limits = StageLimits { script: 5, keyframe: 4, video: 3 };
        let settings = PipelineSettings {
            retry_limits: limits,
            max_total_attempts: limits.max_attempts_per_job(),
            ..PipelineSettings::default()
        };
        assert_eq!(settings.max_total_attempts, 3 * (3 * 12 + 4));
        assert!(PipelineSettings::default().max_total_attempts >= 3 * 19);
    }
}
