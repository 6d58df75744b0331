//! Book trailer worker binary.
//!
//! Reads JSON-lines jobs from the file given as the first argument, or from
//! stdin, and runs them through the job executor.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use trailer_ai_client::{
    build_generation_provider, BooksCatalogClient, GeminiScriptWriter, GenerationConfig,
    ScriptWriter, ScriptWriterConfig,
};
use trailer_media::FfmpegAssembler;
use trailer_qc::{QcPipeline, QcRules};
use trailer_storage::{build_object_store, ObjectResultCache, StorageConfig};
use trailer_models::TrailerJob;
use trailer_worker::logging::init_tracing;
use trailer_worker::metrics::init_metrics;
use trailer_worker::{
    BookGrounder, CompletionNotifier, JobExecutor, LogNotifier, PipelineComponents,
    PipelineOrchestrator, TemplateScriptWriter, WebhookNotifier, WorkerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    let provider_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    dotenvy::dotenv().ok();
    init_tracing("trailer=info");

    if !provider_installed {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting trailer-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(port) = config.metrics_port {
        init_metrics(port)?;
        info!("Prometheus metrics on port {}", port);
    }

    let orchestrator = Arc::new(build_orchestrator(&config).await?);
    let notifier: Arc<dyn CompletionNotifier> = match &config.callback_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())?),
        None => Arc::new(LogNotifier),
    };

    let executor = Arc::new(JobExecutor::new(config.clone(), orchestrator, notifier));
    let (tx, rx) = mpsc::channel(config.max_concurrent_jobs * 4);

    let job_file = std::env::args().nth(1);
    let reader = tokio::spawn(async move {
        let result = match job_file {
            Some(path) => match tokio::fs::File::open(&path).await {
                Ok(file) => feed_jobs(BufReader::new(file), tx).await,
                Err(e) => Err(anyhow::anyhow!("cannot open job file {}: {}", path, e)),
            },
            None => feed_jobs(BufReader::new(tokio::io::stdin()), tx).await,
        };
        if let Err(e) = result {
            error!("Job reader stopped: {}", e);
        }
    });

    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_executor.shutdown();
        }
    });

    executor.run(rx).await;
    reader.abort();

    info!("Worker shutdown complete");
    Ok(())
}

async fn build_orchestrator(config: &WorkerConfig) -> anyhow::Result<PipelineOrchestrator> {
    let catalog_enabled = std::env::var("CATALOG_ENABLED")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);
    let grounder = if catalog_enabled {
        BookGrounder::new(Arc::new(
            BooksCatalogClient::from_env().context("failed to create catalog client")?,
        ))
    } else {
        BookGrounder::offline_only()
    };

    let writer_config = ScriptWriterConfig::from_env();
    let script_writer: Arc<dyn ScriptWriter> = if writer_config.is_enabled() {
        info!("Using Gemini script writer ({})", writer_config.model);
        Arc::new(GeminiScriptWriter::new(&writer_config)?)
    } else {
        info!("GEMINI_API_KEY not set, using template script writer");
        Arc::new(TemplateScriptWriter::new(config.pipeline.scene_duration_secs))
    };

    let provider = build_generation_provider(&GenerationConfig::from_env()?)?;

    let storage_config = StorageConfig::from_env()?;
    let store = build_object_store(&storage_config)
        .await
        .context("failed to create object store")?;
    let cache = Arc::new(ObjectResultCache::new(Arc::clone(&store)));

    let rules = QcRules::load(config.qc_rules_path.as_deref())?
        .with_max_retries(config.pipeline.qc_max_rounds);
    let qc = QcPipeline::new(rules);
    info!("QC rules version {}", qc.rules_version());

    let components = PipelineComponents {
        grounder,
        script_writer,
        provider,
        assembler: Arc::new(FfmpegAssembler::new(config.ffmpeg_timeout_secs)),
        store,
        cache,
    };

    Ok(PipelineOrchestrator::new(
        components,
        config.pipeline.clone(),
        qc,
    ))
}

/// Forward one job per non-empty line. Malformed lines are logged and skipped.
async fn feed_jobs<R>(reader: R, tx: mpsc::Sender<TrailerJob>) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<TrailerJob>(line) {
            Ok(job) => {
                if tx.send(job).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!("Skipping malformed job line: {}", e),
        }
    }
    Ok(())
}
