//! Completion callbacks to the owning system.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};
use trailer_models::CompletionEvent;

use crate::error::{WorkerError, WorkerResult};
use crate::retry::{retry_async, RetryConfig};

/// Receives exactly one terminal event per job.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    async fn notify(&self, event: &CompletionEvent) -> WorkerResult<()>;
}

/// Logs events instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl CompletionNotifier for LogNotifier {
    async fn notify(&self, event: &CompletionEvent) -> WorkerResult<()> {
        info!(
            job_id = %event.job_id,
            book_id = ?event.book_id,
            status = ?event.status,
            video_url = ?event.video_url,
            error = ?event.error_message,
            "Trailer job finished"
        );
        Ok(())
    }
}

/// POSTs events as JSON to a webhook, retrying transient failures.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: Client,
    url: String,
    retry: RetryConfig,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> WorkerResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WorkerError::config_error(format!("webhook client: {}", e)))?;
        Ok(Self {
            http,
            url: url.into(),
            retry: RetryConfig::new("completion_callback"),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn post(&self, event: &CompletionEvent) -> Result<(), String> {
        let response = self
            .http
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("callback returned HTTP {}", response.status()))
        }
    }
}

#[async_trait]
impl CompletionNotifier for WebhookNotifier {
    async fn notify(&self, event: &CompletionEvent) -> WorkerResult<()> {
        match retry_async(&self.retry, || self.post(event)).await {
            Ok(()) => {
                info!(job_id = %event.job_id, status = ?event.status, "Completion callback delivered");
                Ok(())
            }
            Err((e, attempts)) => {
                warn!(job_id = %event.job_id, attempts, error = %e, "Completion callback failed");
                Err(WorkerError::job_failed(format!(
                    "completion callback failed after {} attempts: {}",
                    attempts, e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};
    use trailer_models::TrailerJob;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(server: &MockServer) -> WebhookNotifier {
        WebhookNotifier::new(format!("{}/callbacks/trailer", server.uri()))
            .unwrap()
            .with_retry(
                RetryConfig::new("test")
                    .with_max_retries(2)
                    .with_base_delay(Duration::from_millis(1)),
            )
    }

    #[tokio::test]
    async fn test_webhook_posts_event() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/callbacks/trailer"))
            .and(body_partial_json(serde_json::json!({
                "bookId": "book-1",
                "status": "READY",
                "videoUrl": "https://cdn.test/t.mp4"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let job = TrailerJob::new("Peter Pan").with_book_id("book-1");
        let event = CompletionEvent::ready(&job, Some("https://cdn.test/t.mp4".into()), None);
        assert_ok!(notifier(&server).notify(&event).await);
    }

    #[tokio::test]
    async fn test_webhook_retries_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;

        let job = TrailerJob::new("Peter Pan");
        let event = CompletionEvent::failed(&job, "all scenes failed");
        assert_err!(notifier(&server).notify(&event).await);
    }
}
