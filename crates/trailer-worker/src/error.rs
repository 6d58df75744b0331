//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Safety violation: {0}")]
    SafetyViolation(String),

    #[error("Rejected by quality control: {0}")]
    QcRejected(String),

    #[error("All scenes failed: {0}")]
    AllScenesFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Job timed out after {0} seconds")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    Storage(#[from] trailer_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] trailer_media::MediaError),

    #[error("Client error: {0}")]
    Client(#[from] trailer_ai_client::ClientError),

    #[error("QC rules error: {0}")]
    Rules(#[from] trailer_qc::RulesError),

    #[error("Retry state error: {0}")]
    Transition(#[from] trailer_models::TransitionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    pub fn safety_violation(msg: impl Into<String>) -> Self {
        Self::SafetyViolation(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::JobFailed(_) => "job_failed",
            WorkerError::InvalidJob(_) => "invalid_job",
            WorkerError::SafetyViolation(_) => "safety",
            WorkerError::QcRejected(_) => "qc_rejected",
            WorkerError::AllScenesFailed(_) => "all_scenes_failed",
            WorkerError::UploadFailed(_) => "upload",
            WorkerError::ConfigError(_) => "config",
            WorkerError::Timeout(_) => "timeout",
            WorkerError::Storage(_) => "storage",
            WorkerError::Media(_) => "media",
            WorkerError::Client(_) => "client",
            WorkerError::Rules(_) => "rules",
            WorkerError::Transition(_) => "transition",
            WorkerError::Io(_) => "io",
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::UploadFailed(_) | WorkerError::Storage(_) | WorkerError::Timeout(_) => true,
            WorkerError::Client(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if this is a permanent failure that should NOT be retried.
    ///
    /// Running the same job again would produce the same outcome.
    pub fn is_permanent_failure(&self) -> bool {
        matches!(
            self,
            WorkerError::InvalidJob(_)
                | WorkerError::SafetyViolation(_)
                | WorkerError::QcRejected(_)
                | WorkerError::AllScenesFailed(_)
                | WorkerError::ConfigError(_)
                | WorkerError::Rules(_)
        )
    }
}
