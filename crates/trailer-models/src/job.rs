//! Job definitions and completion events.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::Locale;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const MAX_TITLE_CHARS: usize = 300;

/// Title length is measured after trimming surrounding whitespace.
fn validate_title(value: &str) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(ValidationError::new("blank"));
    }
    if len > MAX_TITLE_CHARS {
        return Err(ValidationError::new("too_long"));
    }
    Ok(())
}

/// A trailer generation request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct TrailerJob {
    /// Unique job ID
    #[serde(default)]
    pub job_id: JobId,

    /// Book title as typed at the kiosk
    #[validate(custom(function = "validate_title"))]
    pub title: String,

    /// Optional author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub author: Option<String>,

    /// Catalog book ID of the owning system, echoed in the completion event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,

    /// Output locale
    #[serde(default)]
    pub language: Locale,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl TrailerJob {
    /// Create a new job for a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            title: title.into(),
            author: None,
            book_id: None,
            language: Locale::default(),
            created_at: Utc::now(),
        }
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the owning system's book ID.
    pub fn with_book_id(mut self, book_id: impl Into<String>) -> Self {
        self.book_id = Some(book_id.into());
        self
    }

    /// Set the output locale.
    pub fn with_language(mut self, language: Locale) -> Self {
        self.language = language;
        self
    }

    /// Author with blank values treated as absent.
    pub fn author(&self) -> Option<&str> {
        self.author
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

/// Terminal status reported to the owning system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStatus {
    Ready,
    Failed,
}

/// Completion callback payload, emitted exactly once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    pub job_id: JobId,
    pub status: CompletionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CompletionEvent {
    pub fn ready(
        job: &TrailerJob,
        video_url: Option<String>,
        subtitle_url: Option<String>,
    ) -> Self {
        Self {
            book_id: job.book_id.clone(),
            job_id: job.job_id.clone(),
            status: CompletionStatus::Ready,
            video_url,
            subtitle_url,
            error_message: None,
        }
    }

    pub fn failed(job: &TrailerJob, error: impl Into<String>) -> Self {
        Self {
            book_id: job.book_id.clone(),
            job_id: job.job_id.clone(),
            status: CompletionStatus::Failed,
            video_url: None,
            subtitle_url: None,
            error_message: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_validation() {
        assert!(TrailerJob::new("어린왕자").validate().is_ok());
        assert!(TrailerJob::new("").validate().is_err());
        assert!(TrailerJob::new("   ").validate().is_err());
        assert!(TrailerJob::new("x".repeat(301)).validate().is_err());
    }

    #[test]
    fn test_title_length_ignores_surrounding_whitespace() {
        let padded = format!("  {}  ", "x".repeat(300));
        assert!(TrailerJob::new(padded).validate().is_ok());

        let korean = "가".repeat(300);
        assert!(TrailerJob::new(korean).validate().is_ok());

        let padded_long = format!(" {} ", "x".repeat(301));
        assert!(TrailerJob::new(padded_long).validate().is_err());
    }

    #[test]
    fn test_blank_author_is_absent() {
        let job = TrailerJob::new("Peter Pan").with_author("  ");
        assert_eq!(job.author(), None);

        let job = TrailerJob::new("Peter Pan").with_author(" J. M. Barrie ");
        assert_eq!(job.author(), Some("J. M. Barrie"));
    }

    #[test]
    fn test_job_deserialize_defaults() {
        let job: TrailerJob = serde_json::from_str(r#"{"title": "피터 팬"}"#).unwrap();
        assert_eq!(job.language, Locale::Ko);
        assert!(job.author.is_none());
        assert!(!job.job_id.as_str().is_empty());
    }

    #[test]
    fn test_completion_event_wire_format() {
        let job = TrailerJob::new("Peter Pan").with_book_id("book-7");
        let event = CompletionEvent::ready(&job, Some("https://cdn/x.mp4".into()), None);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["bookId"], "book-7");
        assert_eq!(value["status"], "READY");
        assert_eq!(value["videoUrl"], "https://cdn/x.mp4");
        assert!(value.get("subtitleUrl").is_none());

        let failed = CompletionEvent::failed(&job, "boom");
        assert_eq!(serde_json::to_value(&failed).unwrap()["status"], "FAILED");
    }
}
