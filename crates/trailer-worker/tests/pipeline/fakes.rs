//! In-process stand-ins for every external collaborator.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use trailer_ai_client::{
    CatalogCandidate, CatalogSearch, ClientError, ClientResult, GenerationProvider, ScriptRequest,
    ScriptWriter,
};
use trailer_media::{AssemblyMode, MediaAssembler, MediaError, MediaResult};
use trailer_models::{CompletionEvent, SceneScript};
use trailer_qc::{QcPipeline, QcRules};
use trailer_storage::{LocalStore, MemoryResultCache, ObjectStore};
use trailer_worker::{
    BookGrounder, CompletionNotifier, PipelineComponents, PipelineOrchestrator, PipelineSettings,
    TemplateScriptWriter, WorkerResult,
};

/// Catalog with no matches; counts searches.
#[derive(Default)]
pub struct EmptyCatalog {
    pub calls: AtomicU32,
}

#[async_trait]
impl CatalogSearch for EmptyCatalog {
    async fn search(&self, _title: &str, _author: Option<&str>) -> ClientResult<Vec<CatalogCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Generation provider returning small fake payloads.
#[derive(Default)]
pub struct FakeProvider {
    pub keyframe_calls: AtomicU32,
    pub video_calls: AtomicU32,
    /// Keyframe prompts containing this text fail
    pub fail_keyframe_containing: Option<String>,
    pub fail_all_keyframes: bool,
    pub keyframe_prompts: Mutex<Vec<String>>,
    /// Video prompts containing the marker fail this many times, then succeed
    pub video_failures: Vec<(String, u32)>,
    pub video_prompts: Mutex<Vec<String>>,
    /// Simulated latency of each call
    pub delay: Duration,
}

impl FakeProvider {
    pub fn failing_keyframes_containing(marker: impl Into<String>) -> Self {
        Self {
            fail_keyframe_containing: Some(marker.into()),
            ..Self::default()
        }
    }

    pub fn failing_all_keyframes() -> Self {
        Self {
            fail_all_keyframes: true,
            ..Self::default()
        }
    }

    /// Videos for prompts containing each marker fail the given number of times.
    pub fn failing_videos(plan: &[(&str, u32)]) -> Self {
        Self {
            video_failures: plan
                .iter()
                .map(|(marker, failures)| (marker.to_string(), *failures))
                .collect(),
            ..Self::default()
        }
    }

    pub fn keyframes(&self) -> u32 {
        self.keyframe_calls.load(Ordering::SeqCst)
    }

    pub fn videos(&self) -> u32 {
        self.video_calls.load(Ordering::SeqCst)
    }

    pub fn prompts_containing(&self, text: &str) -> usize {
        self.keyframe_prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(text))
            .count()
    }

    pub fn videos_containing(&self, text: &str) -> usize {
        self.video_prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(text))
            .count()
    }
}

#[async_trait]
impl GenerationProvider for FakeProvider {
    async fn generate_keyframe(&self, prompt: &str) -> ClientResult<Vec<u8>> {
        self.keyframe_calls.fetch_add(1, Ordering::SeqCst);
        self.keyframe_prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let marked = self
            .fail_keyframe_containing
            .as_deref()
            .is_some_and(|marker| prompt.contains(marker));
        if self.fail_all_keyframes || marked {
            return Err(ClientError::Http {
                status: 503,
                body: "image service overloaded".to_string(),
            });
        }

        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        png.extend_from_slice(prompt.as_bytes());
        Ok(png)
    }

    async fn generate_video(
        &self,
        keyframe: &[u8],
        prompt: &str,
        duration_secs: u32,
    ) -> ClientResult<Vec<u8>> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        let seen: Vec<usize> = {
            let mut prompts = self.video_prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            self.video_failures
                .iter()
                .map(|(marker, _)| prompts.iter().filter(|p| p.contains(marker.as_str())).count())
                .collect()
        };
        if keyframe.is_empty() {
            return Err(ClientError::invalid_media("empty keyframe"));
        }

        let failing = self
            .video_failures
            .iter()
            .zip(seen)
            .any(|((marker, failures), calls)| {
                prompt.contains(marker.as_str()) && calls <= *failures as usize
            });
        if failing {
            return Err(ClientError::Http {
                status: 503,
                body: "video service overloaded".to_string(),
            });
        }
        Ok(format!("ftyp|{}s|{}", duration_secs, prompt).into_bytes())
    }
}

/// Joins scene files byte-wise and records the order it received them in.
#[derive(Default)]
pub struct FakeAssembler {
    pub fail: bool,
    pub received: Mutex<Vec<String>>,
}

impl FakeAssembler {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn scene_files(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaAssembler for FakeAssembler {
    async fn assemble(
        &self,
        scenes: &[PathBuf],
        subtitles: Option<&Path>,
        output: &Path,
    ) -> MediaResult<AssemblyMode> {
        *self.received.lock().unwrap() = scenes
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();

        if self.fail {
            return Err(MediaError::assembly_failed("every assembly strategy failed"));
        }

        let mut joined = Vec::new();
        for scene in scenes {
            joined.extend(tokio::fs::read(scene).await?);
        }
        tokio::fs::write(output, joined).await?;

        Ok(if subtitles.is_some() {
            AssemblyMode::BurnedSubtitles
        } else {
            AssemblyMode::ConcatOnly
        })
    }
}

/// Template writer that first returns an overlong narration, then behaves
/// once it receives QC feedback.
#[derive(Default)]
pub struct OverlongFirstWriter {
    pub feedback_seen: Mutex<Vec<String>>,
}

#[async_trait]
impl ScriptWriter for OverlongFirstWriter {
    async fn write_script(&self, request: &ScriptRequest<'_>) -> ClientResult<SceneScript> {
        let mut script = TemplateScriptWriter::new(8).write_script(request).await?;
        match request.feedback {
            Some(feedback) => self.feedback_seen.lock().unwrap().push(feedback.to_string()),
            None => script.narration = vec!["The story begins here"; 6].join(" "),
        }
        Ok(script)
    }
}

/// Template writer whose narration always contains a forbidden term.
pub struct UnsafeWriter;

#[async_trait]
impl ScriptWriter for UnsafeWriter {
    async fn write_script(&self, request: &ScriptRequest<'_>) -> ClientResult<SceneScript> {
        let mut script = TemplateScriptWriter::new(8).write_script(request).await?;
        script.narration = "A murder in the garden".to_string();
        Ok(script)
    }
}

/// Template writer whose rewrites, requested after a failure, contain a
/// forbidden term.
pub struct UnsafeRewriteWriter;

#[async_trait]
impl ScriptWriter for UnsafeRewriteWriter {
    async fn write_script(&self, request: &ScriptRequest<'_>) -> ClientResult<SceneScript> {
        let mut script = TemplateScriptWriter::new(8).write_script(request).await?;
        if request.feedback.is_some() {
            script.narration = "A murder in the garden".to_string();
        }
        Ok(script)
    }
}

/// Collects completion events.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<CompletionEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<CompletionEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionNotifier for RecordingNotifier {
    async fn notify(&self, event: &CompletionEvent) -> WorkerResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// A wired orchestrator plus handles on its fakes.
pub struct Harness {
    pub orchestrator: PipelineOrchestrator,
    pub catalog: Arc<EmptyCatalog>,
    pub provider: Arc<FakeProvider>,
    pub assembler: Arc<FakeAssembler>,
    pub store: Arc<LocalStore>,
    pub cache: Arc<MemoryResultCache>,
    _dirs: (TempDir, TempDir),
}

pub struct HarnessBuilder {
    provider: FakeProvider,
    assembler: FakeAssembler,
    writer: Arc<dyn ScriptWriter>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            provider: FakeProvider::default(),
            assembler: FakeAssembler::default(),
            writer: Arc::new(TemplateScriptWriter::new(8)),
        }
    }
}

impl HarnessBuilder {
    pub fn provider(mut self, provider: FakeProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn assembler(mut self, assembler: FakeAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn writer(mut self, writer: Arc<dyn ScriptWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn build(self) -> Harness {
        let storage_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();

        let catalog = Arc::new(EmptyCatalog::default());
        let provider = Arc::new(self.provider);
        let assembler = Arc::new(self.assembler);
        let store = Arc::new(LocalStore::new(storage_dir.path(), "https://cdn.test/media"));
        let cache = Arc::new(MemoryResultCache::new());

        let settings = PipelineSettings {
            backoff_base: Duration::ZERO,
            work_dir: work_dir.path().to_path_buf(),
            ..PipelineSettings::default()
        };

        let components = PipelineComponents {
            grounder: BookGrounder::new(catalog.clone()),
            script_writer: self.writer,
            provider: provider.clone(),
            assembler: assembler.clone(),
            store: store.clone() as Arc<dyn ObjectStore>,
            cache: cache.clone(),
        };
        let qc = QcPipeline::new(QcRules::default().with_max_retries(settings.qc_max_rounds));

        Harness {
            orchestrator: PipelineOrchestrator::new(components, settings, qc),
            catalog,
            provider,
            assembler,
            store,
            cache,
            _dirs: (storage_dir, work_dir),
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    pub fn catalog_calls(&self) -> u32 {
        self.catalog.calls.load(Ordering::SeqCst)
    }
}
