//! Job executor behaviour.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use trailer_models::{CompletionStatus, Locale, TrailerJob};
use trailer_storage::{LocalStore, MemoryResultCache};
use trailer_qc::QcPipeline;
use trailer_worker::{
    BookGrounder, JobExecutor, PipelineComponents, PipelineOrchestrator, PipelineSettings,
    TemplateScriptWriter, WorkerConfig,
};

use super::fakes::{FakeAssembler, FakeProvider, Harness, RecordingNotifier};

fn config(max_jobs: usize) -> WorkerConfig {
    WorkerConfig {
        max_concurrent_jobs: max_jobs,
        job_timeout: Duration::from_secs(30),
        shutdown_timeout: Duration::from_secs(5),
        ..WorkerConfig::default()
    }
}

#[tokio::test]
async fn test_one_event_per_job() {
    let harness = Harness::builder().build();
    let notifier = Arc::new(RecordingNotifier::default());
    let executor = JobExecutor::new(config(2), Arc::new(harness.orchestrator), notifier.clone());

    let jobs = vec![
        TrailerJob::new("Peter Pan").with_book_id("book-1").with_language(Locale::En),
        TrailerJob::new("어린 왕자").with_book_id("book-2"),
        TrailerJob::new(" ").with_book_id("book-3"),
    ];
    let (tx, rx) = mpsc::channel(8);
    for job in &jobs {
        tx.send(job.clone()).await.unwrap();
    }
    drop(tx);

    executor.run(rx).await;

    let events = notifier.events();
    assert_eq!(events.len(), jobs.len());
    let ids: HashSet<_> = events.iter().map(|e| e.job_id.clone()).collect();
    assert_eq!(ids.len(), jobs.len());

    for event in &events {
        match event.book_id.as_deref() {
            Some("book-1") | Some("book-2") => {
                assert_eq!(event.status, CompletionStatus::Ready);
                assert!(event.video_url.is_some());
                assert!(event.subtitle_url.is_some());
            }
            Some("book-3") => {
                assert_eq!(event.status, CompletionStatus::Failed);
                assert!(event.error_message.as_deref().unwrap().contains("Invalid job"));
            }
            other => panic!("unexpected book id {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_job_timeout_reports_failure() {
    let storage_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider {
        delay: Duration::from_millis(500),
        ..FakeProvider::default()
    };

    let components = PipelineComponents {
        grounder: BookGrounder::offline_only(),
        script_writer: Arc::new(TemplateScriptWriter::new(8)),
        provider: Arc::new(provider),
        assembler: Arc::new(FakeAssembler::default()),
        store: Arc::new(LocalStore::new(storage_dir.path(), "https://cdn.test")),
        cache: Arc::new(MemoryResultCache::new()),
    };
    let settings = PipelineSettings {
        backoff_base: Duration::ZERO,
        work_dir: work_dir.path().to_path_buf(),
        ..PipelineSettings::default()
    };
    let orchestrator = PipelineOrchestrator::new(components, settings, QcPipeline::default());

    let notifier = Arc::new(RecordingNotifier::default());
    let config = WorkerConfig {
        job_timeout: Duration::from_millis(100),
        ..config(1)
    };
    let executor = JobExecutor::new(config, Arc::new(orchestrator), notifier.clone());

    let (tx, rx) = mpsc::channel(1);
    tx.send(TrailerJob::new("Peter Pan").with_book_id("slow")).await.unwrap();
    drop(tx);

    executor.run(rx).await;

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, CompletionStatus::Failed);
    assert!(events[0].error_message.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_shutdown_stops_intake() {
    let harness = Harness::builder().build();
    let notifier = Arc::new(RecordingNotifier::default());
    let executor = JobExecutor::new(config(1), Arc::new(harness.orchestrator), notifier.clone());

    let (tx, rx) = mpsc::channel::<TrailerJob>(1);
    executor.shutdown();

    tokio::time::timeout(Duration::from_secs(1), executor.run(rx))
        .await
        .unwrap();

    assert!(notifier.events().is_empty());
    drop(tx);
}
