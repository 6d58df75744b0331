//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{error, info, warn};
use trailer_models::{CompletionEvent, TrailerJob, VideoGenerationResult};

use crate::callback::CompletionNotifier;
use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::metrics;
use crate::orchestrator::PipelineOrchestrator;

/// Runs jobs from a channel on a fixed number of worker slots.
pub struct JobExecutor {
    config: WorkerConfig,
    orchestrator: Arc<PipelineOrchestrator>,
    notifier: Arc<dyn CompletionNotifier>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(
        config: WorkerConfig,
        orchestrator: Arc<PipelineOrchestrator>,
        notifier: Arc<dyn CompletionNotifier>,
    ) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            orchestrator,
            notifier,
            job_semaphore,
            shutdown,
        }
    }

    /// Consume jobs until the channel closes or shutdown is signalled, then
    /// wait for in-flight jobs.
    pub async fn run(&self, mut jobs: mpsc::Receiver<TrailerJob>) {
        info!(
            "Starting job executor with {} max concurrent jobs",
            self.config.max_concurrent_jobs
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow() {
                info!("Shutdown signal received, stopping executor");
                break;
            }

            // Take a slot before taking a job so queued jobs stay in the channel.
            let permit = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                permit = Arc::clone(&self.job_semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let job = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                job = jobs.recv() => match job {
                    Some(job) => job,
                    None => {
                        info!("Job channel closed");
                        break;
                    }
                },
            };

            let orchestrator = Arc::clone(&self.orchestrator);
            let notifier = Arc::clone(&self.notifier);
            let job_timeout = self.config.job_timeout;

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(orchestrator, notifier, job, job_timeout).await;
            });
        }

        info!("Waiting for in-flight jobs to complete...");
        if *shutdown_rx.borrow() {
            if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
                .await
                .is_err()
            {
                warn!(
                    "Shutdown timeout of {:?} elapsed with jobs still running",
                    self.config.shutdown_timeout
                );
            }
        } else {
            // Drained channel: every job is bounded by its own timeout.
            self.wait_for_jobs().await;
        }

        info!("Job executor stopped");
    }

    /// Run one job and send its single terminal event.
    async fn execute_job(
        orchestrator: Arc<PipelineOrchestrator>,
        notifier: Arc<dyn CompletionNotifier>,
        job: TrailerJob,
        job_timeout: Duration,
    ) {
        let job_id = job.job_id.clone();
        info!("Executing job {}", job_id);

        let result = match tokio::time::timeout(job_timeout, orchestrator.execute(&job)).await {
            Ok(result) => result,
            Err(_) => {
                let e = WorkerError::Timeout(job_timeout.as_secs());
                error!("Job {} timed out", job_id);
                metrics::record_job_failed(e.kind());
                VideoGenerationResult::failed(job_id.clone(), job.created_at, e.to_string())
            }
        };

        let event = if result.is_completed() {
            info!("Job {} completed successfully", job_id);
            CompletionEvent::ready(&job, result.video_url.clone(), result.subtitle_url.clone())
        } else {
            let message = result
                .error_message
                .clone()
                .unwrap_or_else(|| "trailer generation failed".to_string());
            error!("Job {} failed: {}", job_id, message);
            CompletionEvent::failed(&job, message)
        };

        if let Err(e) = notifier.notify(&event).await {
            metrics::record_callback_failed();
            error!("Failed to deliver completion event for job {}: {}", job_id, e);
        }
    }

    /// Wait until every slot is free again.
    async fn wait_for_jobs(&self) {
        loop {
            let available = self.job_semaphore.available_permits();
            if available == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
