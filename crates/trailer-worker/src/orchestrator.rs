//! Pipeline orchestration for one trailer job.
//!
//! Sequence: validation → cache check → grounding → style bible → scene
//! scripts → QC → per-scene keyframe and video under the retry coordinator →
//! subtitles → assembly → upload → cost report → cache write.
//!
//! Scenes are generated one at a time in scene-number order. The retry state
//! is owned by the running job and only changes through its transition
//! functions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn, Instrument};
use validator::Validate;

use trailer_ai_client::{GenerationProvider, ScriptRequest, ScriptWriter};
use trailer_media::{MediaAssembler, WebVttBuilder};
use trailer_models::{
    BookFacts, GenerationStatus, HierarchicalRetryState, Locale, QcGate, QcReport, ScenePlan,
    SceneScript, Stage, StageOutput, StyleBible, TrailerJob, TransitionError,
    VideoGenerationResult,
};
use trailer_qc::{QcDecision, QcPipeline};
use trailer_storage::{
    trailer_subtitle_key, trailer_video_key, CacheKey, ObjectStore, ResultCache,
};

use crate::config::PipelineSettings;
use crate::cost::CostModel;
use crate::error::{WorkerError, WorkerResult};
use crate::grounding::BookGrounder;
use crate::logging::JobLogger;
use crate::metrics;
use crate::planner::plan_scenes;
use crate::retry::LinearBackoff;
use crate::single_flight::KeyedLocks;
use crate::style_bible::build_style_bible;

/// External collaborators of the pipeline, constructed once at startup.
#[derive(Clone)]
pub struct PipelineComponents {
    pub grounder: BookGrounder,
    pub script_writer: Arc<dyn ScriptWriter>,
    pub provider: Arc<dyn GenerationProvider>,
    pub assembler: Arc<dyn MediaAssembler>,
    pub store: Arc<dyn ObjectStore>,
    pub cache: Arc<dyn ResultCache>,
}

/// Inputs shared by every stage of one job.
struct JobContext<'a> {
    job: &'a TrailerJob,
    locale: Locale,
    facts: BookFacts,
    style: StyleBible,
    plans: Vec<ScenePlan>,
    max_chars_per_line: usize,
    max_lines: usize,
    logger: &'a JobLogger,
}

impl JobContext<'_> {
    fn plan(&self, scene_number: u8) -> WorkerResult<&ScenePlan> {
        self.plans
            .iter()
            .find(|p| p.scene_number == scene_number)
            .ok_or(WorkerError::Transition(TransitionError::UnknownScene(scene_number)))
    }
}

/// Runs trailer jobs end to end.
pub struct PipelineOrchestrator {
    components: PipelineComponents,
    settings: PipelineSettings,
    qc: QcPipeline,
    cost: CostModel,
    backoff: LinearBackoff,
    locks: KeyedLocks,
}

impl PipelineOrchestrator {
    pub fn new(components: PipelineComponents, settings: PipelineSettings, qc: QcPipeline) -> Self {
        let backoff = LinearBackoff::new(settings.backoff_base, settings.backoff_max);
        Self {
            components,
            settings,
            qc,
            cost: CostModel::default(),
            backoff,
            locks: KeyedLocks::new(),
        }
    }

    /// Run one job to a terminal result. Never returns an error; failures
    /// are reported as a failed result.
    pub async fn execute(&self, job: &TrailerJob) -> VideoGenerationResult {
        let started_at = Utc::now();
        let logger = JobLogger::new(&job.job_id, "trailer_generation");
        let span = logger.create_span();

        match self.run(job, started_at, &logger).instrument(span).await {
            Ok(result) => result,
            Err(e) => {
                logger.log_error(&e.to_string());
                metrics::record_job_failed(e.kind());
                VideoGenerationResult::failed(job.job_id.clone(), started_at, e.to_string())
            }
        }
    }

    async fn run(
        &self,
        job: &TrailerJob,
        started_at: DateTime<Utc>,
        logger: &JobLogger,
    ) -> WorkerResult<VideoGenerationResult> {
        let clock = Instant::now();
        job.validate()
            .map_err(|e| WorkerError::invalid_job(e.to_string()))?;

        logger.log_start(&format!("title={:?} language={}", job.title, job.language));

        let key = CacheKey::new(&job.title, job.author());
        let _build_guard = self.locks.lock(&key.digest()).await;

        if let Some(hit) = self.cached_result(&key, logger).await {
            return Ok(hit);
        }

        let facts = self
            .components
            .grounder
            .ground(&job.title, job.author(), job.language)
            .await;
        metrics::record_grounding_source(&facts.source);
        logger.log_progress(&format!(
            "grounded as {:?} from {} (confidence {:.2})",
            facts.canonical_title, facts.source, facts.confidence
        ));

        let style = build_style_bible(&facts, job.language);
        let plans = plan_scenes(&facts);
        let limits = self.qc.typography_limits(job.language);
        let ctx = JobContext {
            job,
            locale: job.language,
            facts,
            style,
            plans,
            max_chars_per_line: limits.max_chars_per_line,
            max_lines: limits.max_lines,
            logger,
        };

        let mut state = HierarchicalRetryState::new(
            job.job_id.clone(),
            self.settings.retry_limits,
            self.settings.max_total_attempts,
        );

        for scene_number in scene_numbers(&state) {
            state = self.script_until_settled(&ctx, state, scene_number, None).await?;
        }

        state = self.quality_gate(&ctx, state).await?;

        for scene_number in scene_numbers(&state) {
            state = self.generate_media(&ctx, state, scene_number).await?;
        }

        if state.completed_scenes().is_empty() {
            return Err(WorkerError::AllScenesFailed(state.failure_summary()));
        }
        if !state.is_complete() {
            logger.log_warning(&format!(
                "continuing with partial scenes: {}",
                state.failure_summary()
            ));
        }

        let result = self.finish(&ctx, &state, started_at, clock).await?;

        if let Err(e) = self.components.cache.set(&key, &result).await {
            logger.log_warning(&format!("failed to cache result: {}", e));
        }

        metrics::record_job_completed(result.is_partial(), clock.elapsed().as_secs_f64());
        logger.log_completion(&format!(
            "scenes {:?}, mode {}, cost ${:.4}",
            result.scenes_used,
            result.assembly_mode.as_deref().unwrap_or("unknown"),
            result
                .cost_report
                .as_ref()
                .map(|c| c.total_cost_usd)
                .unwrap_or_default()
        ));

        Ok(result)
    }

    /// Completed result for `key`, marked as a cache hit. Cache errors read as a miss.
    async fn cached_result(&self, key: &CacheKey, logger: &JobLogger) -> Option<VideoGenerationResult> {
        match self.components.cache.get(key).await {
            Ok(Some(cached)) if cached.is_completed() => {
                metrics::record_cache_hit();
                logger.log_completion(&format!("cache hit for {:?}", key.title()));
                Some(VideoGenerationResult {
                    cache_hit: true,
                    ..cached
                })
            }
            Ok(_) => None,
            Err(e) => {
                logger.log_warning(&format!("cache read failed, treating as miss: {}", e));
                None
            }
        }
    }

    /// Keep attempting the script stage of one scene until it produces a
    /// script or the scene fails.
    async fn script_until_settled(
        &self,
        ctx: &JobContext<'_>,
        mut state: HierarchicalRetryState,
        scene_number: u8,
        feedback: Option<&str>,
    ) -> WorkerResult<HierarchicalRetryState> {
        loop {
            let Some(scene) = state.scene(scene_number) else {
                return Err(TransitionError::UnknownScene(scene_number).into());
            };
            if scene.is_terminal() || scene.current_stage != Stage::Script {
                return Ok(state);
            }
            if state.attempts_exhausted() {
                return Ok(state.fail_remaining("total attempt budget exhausted"));
            }
            state = self.attempt_stage(ctx, state, scene_number, feedback).await?;
        }
    }

    /// Evaluate the first full set of scripts and regenerate them while the
    /// scoring policy asks for it.
    async fn quality_gate(
        &self,
        ctx: &JobContext<'_>,
        mut state: HierarchicalRetryState,
    ) -> WorkerResult<HierarchicalRetryState> {
        let mut round = 0;
        loop {
            let scripts = scripts_of(&state);
            if scripts.is_empty() {
                return Ok(state);
            }

            let report = self.qc.evaluate(&scripts, &ctx.style, ctx.locale);
            record_qc_report(&report);

            match self.qc.should_retry(&report, round) {
                QcDecision::Accept => {
                    ctx.logger.log_progress(&format!(
                        "scripts accepted by QC (score {:.2}, round {})",
                        report.scoring.overall_score, round
                    ));
                    return Ok(state);
                }
                QcDecision::Abort if report.is_unsafe() => {
                    return Err(WorkerError::safety_violation(report.violations().join("; ")));
                }
                QcDecision::Abort => {
                    return Err(WorkerError::QcRejected(format!(
                        "score {:.2} after {} rounds: {}",
                        report.scoring.overall_score,
                        round,
                        report.violations().join("; ")
                    )));
                }
                QcDecision::Retry => {
                    round += 1;
                    let feedback = report.violations().join("; ");
                    ctx.logger.log_warning(&format!(
                        "QC round {} requested new scripts: {}",
                        round, feedback
                    ));
                    for scene_number in scene_numbers(&state) {
                        state = state.request_script_regeneration(scene_number, feedback.as_str())?;
                        state = self
                            .script_until_settled(ctx, state, scene_number, Some(&feedback))
                            .await?;
                    }
                }
            }
        }
    }

    /// Drive one scene through keyframe and video, following fallbacks.
    async fn generate_media(
        &self,
        ctx: &JobContext<'_>,
        mut state: HierarchicalRetryState,
        scene_number: u8,
    ) -> WorkerResult<HierarchicalRetryState> {
        loop {
            let Some(scene) = state.scene(scene_number) else {
                return Err(TransitionError::UnknownScene(scene_number).into());
            };
            if scene.is_terminal() {
                return Ok(state);
            }
            if state.attempts_exhausted() {
                ctx.logger.log_warning("total attempt budget exhausted");
                return Ok(state.fail_remaining("total attempt budget exhausted"));
            }

            let regenerating = scene.current_stage == Stage::Script;
            let feedback = scene.last_error.clone();
            state = self
                .attempt_stage(ctx, state, scene_number, feedback.as_deref())
                .await?;

            if regenerating {
                self.check_regenerated_script(ctx, &state, scene_number)?;
            }
        }
    }

    /// Scripts produced after QC acceptance still pass the safety gate.
    fn check_regenerated_script(
        &self,
        ctx: &JobContext<'_>,
        state: &HierarchicalRetryState,
        scene_number: u8,
    ) -> WorkerResult<()> {
        let Some(script) = state.scene(scene_number).and_then(|s| s.script.clone()) else {
            return Ok(());
        };
        let safety = self.qc.check_safety(std::slice::from_ref(&script), ctx.locale);
        metrics::record_qc_gate(QcGate::Safety.as_str(), safety.status.as_str());
        if safety.status.is_pass() {
            Ok(())
        } else {
            Err(WorkerError::safety_violation(safety.violations.join("; ")))
        }
    }

    /// One attempt at the current stage of a scene, recorded in the state.
    async fn attempt_stage(
        &self,
        ctx: &JobContext<'_>,
        state: HierarchicalRetryState,
        scene_number: u8,
        feedback: Option<&str>,
    ) -> WorkerResult<HierarchicalRetryState> {
        let Some(scene) = state.scene(scene_number) else {
            return Err(TransitionError::UnknownScene(scene_number).into());
        };
        let stage = scene.current_stage;
        let attempt = scene.retries.get(stage) + 1;

        debug!(scene = scene_number, stage = %stage, attempt, "Attempting stage");

        let outcome: Result<StageOutput, String> = match stage {
            Stage::Script => {
                let plan = ctx.plan(scene_number)?;
                self.write_script(ctx, plan, feedback, attempt)
                    .await
                    .map(StageOutput::Script)
            }
            Stage::Keyframe => {
                let prompt = scene
                    .script
                    .as_ref()
                    .map(|s| s.keyframe_prompt.clone())
                    .ok_or_else(|| missing_output(scene_number, "script"))?;
                self.components
                    .provider
                    .generate_keyframe(&prompt)
                    .await
                    .map(|bytes| StageOutput::Keyframe(bytes.into()))
                    .map_err(|e| e.to_string())
            }
            Stage::Video => {
                let prompt = scene
                    .script
                    .as_ref()
                    .map(|s| s.video_prompt.clone())
                    .ok_or_else(|| missing_output(scene_number, "script"))?;
                let keyframe = scene
                    .keyframe
                    .clone()
                    .ok_or_else(|| missing_output(scene_number, "keyframe"))?;
                self.components
                    .provider
                    .generate_video(&keyframe, &prompt, self.settings.scene_duration_secs)
                    .await
                    .map(|bytes| StageOutput::Video(bytes.into()))
                    .map_err(|e| e.to_string())
            }
        };

        metrics::record_stage_attempt(stage.as_str(), outcome.is_ok());

        match outcome {
            Ok(output) => {
                debug!(scene = scene_number, stage = %stage, attempt, "Stage succeeded");
                Ok(state.record_success(scene_number, output)?)
            }
            Err(reason) => {
                warn!(
                    job_id = %ctx.job.job_id,
                    scene = scene_number,
                    stage = %stage,
                    attempt,
                    error = %reason,
                    "Stage attempt failed"
                );
                let next = state.record_failure(scene_number, format!("{}: {}", stage, reason))?;
                if let Some(scene) = next.scene(scene_number).filter(|s| !s.is_terminal()) {
                    if scene.current_stage != stage {
                        info!(
                            scene = scene_number,
                            from = %stage,
                            to = %scene.current_stage,
                            "Stage retries exhausted, falling back"
                        );
                    }
                    self.backoff
                        .wait(scene.retries.get(scene.current_stage))
                        .await;
                } else {
                    ctx.logger
                        .log_warning(&format!("scene {} failed terminally", scene_number));
                }
                Ok(next)
            }
        }
    }

    async fn write_script(
        &self,
        ctx: &JobContext<'_>,
        plan: &ScenePlan,
        feedback: Option<&str>,
        attempt: u32,
    ) -> Result<SceneScript, String> {
        let request = ScriptRequest {
            facts: &ctx.facts,
            style: &ctx.style,
            plan,
            locale: ctx.locale,
            max_chars_per_line: ctx.max_chars_per_line,
            max_lines: ctx.max_lines,
            feedback,
            attempt,
        };
        let mut script = self
            .components
            .script_writer
            .write_script(&request)
            .await
            .map_err(|e| e.to_string())?;
        if !script.is_usable() {
            return Err("script is missing narration or prompts".to_string());
        }
        script.scene_number = plan.scene_number;
        script.scene_type = plan.scene_type;
        Ok(script)
    }

    /// Subtitles, assembly, uploads and the cost report.
    async fn finish(
        &self,
        ctx: &JobContext<'_>,
        state: &HierarchicalRetryState,
        started_at: DateTime<Utc>,
        clock: Instant,
    ) -> WorkerResult<VideoGenerationResult> {
        let job_id = &ctx.job.job_id;
        let completed = state.completed_scenes();
        let scenes_used: Vec<u8> = completed.iter().map(|s| s.scene_number).collect();
        let scripts: Vec<SceneScript> = completed.iter().filter_map(|s| s.script.clone()).collect();

        let qc_report = self.qc.evaluate(&scripts, &ctx.style, ctx.locale);

        let vtt = WebVttBuilder::new(self.settings.scene_duration_secs)
            .with_line_limits(ctx.max_chars_per_line, ctx.max_lines)
            .build(&scripts);

        tokio::fs::create_dir_all(&self.settings.work_dir).await?;
        let work_dir = tempfile::Builder::new()
            .prefix(&format!("job-{}-", job_id))
            .tempdir_in(&self.settings.work_dir)?;

        let mut scene_paths: Vec<PathBuf> = Vec::with_capacity(completed.len());
        for scene in &completed {
            let bytes = scene
                .video
                .as_ref()
                .ok_or_else(|| missing_output(scene.scene_number, "video"))?;
            let path = work_dir.path().join(format!("scene_{}.mp4", scene.scene_number));
            tokio::fs::write(&path, bytes.as_ref()).await?;
            scene_paths.push(path);
        }

        let subtitle_path = work_dir.path().join("subtitles.vtt");
        tokio::fs::write(&subtitle_path, vtt.as_bytes()).await?;

        let subtitle_url = self
            .components
            .store
            .save(&trailer_subtitle_key(job_id), vtt.into_bytes(), "text/vtt")
            .await?;

        let output = work_dir.path().join("trailer.mp4");
        let mode = self
            .components
            .assembler
            .assemble(&scene_paths, Some(&subtitle_path), &output)
            .await?;
        metrics::record_assembly_mode(mode.as_str());

        let video = tokio::fs::read(&output).await?;
        let video_url = self
            .components
            .store
            .save(&trailer_video_key(job_id), video, "video/mp4")
            .await
            .map_err(|e| WorkerError::UploadFailed(e.to_string()))?;

        Ok(VideoGenerationResult {
            job_id: job_id.clone(),
            status: GenerationStatus::Completed,
            video_url: Some(video_url),
            subtitle_url: Some(subtitle_url),
            qc_report: Some(qc_report),
            cost_report: Some(self.cost.report(state, clock.elapsed())),
            scenes_used,
            assembly_mode: Some(mode.as_str().to_string()),
            cache_hit: false,
            error_message: None,
            started_at,
            completed_at: Utc::now(),
        })
    }
}

fn scene_numbers(state: &HierarchicalRetryState) -> Vec<u8> {
    let mut numbers: Vec<u8> = state.scenes.iter().map(|s| s.scene_number).collect();
    numbers.sort_unstable();
    numbers
}

/// Scripts of scenes that are still alive, in scene order.
fn scripts_of(state: &HierarchicalRetryState) -> Vec<SceneScript> {
    let mut scripts: Vec<SceneScript> = state
        .scenes
        .iter()
        .filter(|s| !s.is_failed())
        .filter_map(|s| s.script.clone())
        .collect();
    scripts.sort_by_key(|s| s.scene_number);
    scripts
}

fn missing_output(scene_number: u8, what: &str) -> WorkerError {
    WorkerError::job_failed(format!("scene {} has no {} output", scene_number, what))
}

fn record_qc_report(report: &QcReport) {
    for gate in [QcGate::Safety, QcGate::Typography, QcGate::Consistency, QcGate::Scoring] {
        let status = report.gate_status(gate);
        metrics::record_qc_gate(gate.as_str(), status.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts_of_skips_failed_scenes() {
        use trailer_models::{JobId, SceneType, StageLimits};

        let script = |n: u8| SceneScript {
            scene_number: n,
            scene_type: SceneType::for_scene(n),
            narration: "Hello".into(),
            dialogue: None,
            character_name: None,
            visual_description: "A field.".into(),
            keyframe_prompt: "field".into(),
            video_prompt: "field".into(),
        };

        let state = HierarchicalRetryState::new(JobId::from_string("j"), StageLimits::default(), 48)
            .record_success(3, StageOutput::Script(script(3)))
            .unwrap()
            .record_success(1, StageOutput::Script(script(1)))
            .unwrap()
            .record_success(2, StageOutput::Script(script(2)))
            .unwrap()
            .fail_scene(2, "gone")
            .unwrap();

        let numbers: Vec<u8> = scripts_of(&state).iter().map(|s| s.scene_number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }
}
