//! Hierarchical retry state.
//!
//! Each scene moves through `script -> keyframe -> video`. Transitions are
//! pure: they take the current state by reference and return a new value,
//! so the fallback rules can be tested without any I/O.
//!
//! Failure handling per scene:
//! - retry the same stage while it has budget left
//! - once exhausted, fall back to the nearest earlier stage with budget,
//!   charging that stage one retry and discarding everything downstream
//! - with no earlier budget the scene is terminally failed

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{JobId, SceneScript, SCENE_COUNT};

/// Immutable, cheaply clonable media payload.
pub type MediaBytes = Arc<[u8]>;

/// Generation stage within a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Script,
    Keyframe,
    Video,
}

impl Stage {
    /// Stage reached after a success. Video is terminal and maps to itself.
    pub fn next(self) -> Stage {
        match self {
            Stage::Script => Stage::Keyframe,
            Stage::Keyframe | Stage::Video => Stage::Video,
        }
    }

    /// The cheaper stage before this one.
    pub fn previous(self) -> Option<Stage> {
        match self {
            Stage::Script => None,
            Stage::Keyframe => Some(Stage::Script),
            Stage::Video => Some(Stage::Keyframe),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Script => "script",
            Stage::Keyframe => "keyframe",
            Stage::Video => "video",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-stage retry limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageLimits {
    pub script: u32,
    pub keyframe: u32,
    pub video: u32,
}

impl Default for StageLimits {
    fn default() -> Self {
        Self {
            script: 3,
            keyframe: 3,
            // Video is the most expensive stage
            video: 2,
        }
    }
}

impl StageLimits {
    pub fn limit(&self, stage: Stage) -> u32 {
        match stage {
            Stage::Script => self.script,
            Stage::Keyframe => self.keyframe,
            Stage::Video => self.video,
        }
    }

    /// Most attempts one scene can make before it completes or fails.
    ///
    /// Every non-terminal failure consumes at least one unit of budget and
    /// drops the scene back at most two stages, so with `b` total budget a
    /// scene makes at most `b + 1` failed and `3 + 2b` successful attempts.
    pub fn max_attempts_per_scene(&self) -> u32 {
        let budget = self.script + self.keyframe + self.video;
        3 * budget + 4
    }

    /// Attempt bound of a whole job that never cuts a scene short.
    pub fn max_attempts_per_job(&self) -> u32 {
        self.max_attempts_per_scene() * SCENE_COUNT as u32
    }
}

/// Per-stage retry counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageCounters {
    pub script: u32,
    pub keyframe: u32,
    pub video: u32,
}

impl StageCounters {
    pub fn get(&self, stage: Stage) -> u32 {
        match stage {
            Stage::Script => self.script,
            Stage::Keyframe => self.keyframe,
            Stage::Video => self.video,
        }
    }

    /// Counters with `stage` incremented, saturating at `cap`.
    fn incremented(self, stage: Stage, cap: u32) -> Self {
        let mut next = self;
        let slot = match stage {
            Stage::Script => &mut next.script,
            Stage::Keyframe => &mut next.keyframe,
            Stage::Video => &mut next.video,
        };
        *slot = (*slot + 1).min(cap);
        next
    }

    pub fn total(&self) -> u32 {
        self.script + self.keyframe + self.video
    }
}

/// Lifecycle status of one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    InProgress,
    /// Script, keyframe and video all produced
    Complete,
    /// Every usable stage budget exhausted
    Failed,
}

/// Output of a successful stage.
#[derive(Debug, Clone)]
pub enum StageOutput {
    Script(SceneScript),
    Keyframe(MediaBytes),
    Video(MediaBytes),
}

impl StageOutput {
    pub fn stage(&self) -> Stage {
        match self {
            StageOutput::Script(_) => Stage::Script,
            StageOutput::Keyframe(_) => Stage::Keyframe,
            StageOutput::Video(_) => Stage::Video,
        }
    }
}

/// Invalid transition requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Scene {0} does not exist")]
    UnknownScene(u8),

    #[error("Scene {scene} is at stage {current}, cannot record {given} output")]
    StageMismatch { scene: u8, current: Stage, given: Stage },

    #[error("Scene {0} is already terminal")]
    SceneTerminal(u8),
}

/// Retry state of a single scene.
#[derive(Debug, Clone)]
pub struct SceneRetryState {
    pub scene_number: u8,
    pub current_stage: Stage,
    pub status: SceneStatus,
    pub retries: StageCounters,
    pub last_error: Option<String>,
    pub script: Option<SceneScript>,
    pub keyframe: Option<MediaBytes>,
    pub video: Option<MediaBytes>,
}

impl SceneRetryState {
    pub fn new(scene_number: u8) -> Self {
        Self {
            scene_number,
            current_stage: Stage::Script,
            status: SceneStatus::InProgress,
            retries: StageCounters::default(),
            last_error: None,
            script: None,
            keyframe: None,
            video: None,
        }
    }

    /// Scene seeded with an already generated script.
    pub fn with_script(scene_number: u8, script: SceneScript) -> Self {
        Self {
            current_stage: Stage::Keyframe,
            script: Some(script),
            ..Self::new(scene_number)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == SceneStatus::Complete
    }

    pub fn is_failed(&self) -> bool {
        self.status == SceneStatus::Failed
    }

    pub fn is_terminal(&self) -> bool {
        self.status != SceneStatus::InProgress
    }

    /// Whether `stage` still has retry budget.
    pub fn has_budget(&self, stage: Stage, limits: &StageLimits) -> bool {
        self.retries.get(stage) < limits.limit(stage)
    }

    /// Record a successful stage and advance.
    pub fn record_success(&self, output: StageOutput) -> Result<Self, TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::SceneTerminal(self.scene_number));
        }
        if output.stage() != self.current_stage {
            return Err(TransitionError::StageMismatch {
                scene: self.scene_number,
                current: self.current_stage,
                given: output.stage(),
            });
        }

        let mut next = self.clone();
        next.last_error = None;
        match output {
            StageOutput::Script(script) => next.script = Some(script),
            StageOutput::Keyframe(bytes) => next.keyframe = Some(bytes),
            StageOutput::Video(bytes) => {
                next.video = Some(bytes);
                next.status = SceneStatus::Complete;
            }
        }
        next.current_stage = self.current_stage.next();
        Ok(next)
    }

    /// Record a failed attempt at the current stage.
    pub fn record_failure(
        &self,
        error: impl Into<String>,
        limits: &StageLimits,
    ) -> Result<Self, TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::SceneTerminal(self.scene_number));
        }

        let stage = self.current_stage;
        let mut next = self.clone();
        next.last_error = Some(error.into());
        next.retries = self.retries.incremented(stage, limits.limit(stage));

        if next.has_budget(stage, limits) {
            return Ok(next);
        }

        let mut candidate = stage.previous();
        while let Some(earlier) = candidate {
            if next.has_budget(earlier, limits) {
                next.retries = next.retries.incremented(earlier, limits.limit(earlier));
                next.current_stage = earlier;
                next.discard_from(earlier);
                return Ok(next);
            }
            candidate = earlier.previous();
        }

        next.status = SceneStatus::Failed;
        Ok(next)
    }

    /// Send the scene back to script generation (QC-driven).
    ///
    /// Charges one script retry. Returns the state unchanged when the
    /// script budget is exhausted or the scene is terminal.
    pub fn request_script_regeneration(
        &self,
        reason: impl Into<String>,
        limits: &StageLimits,
    ) -> Self {
        if self.is_terminal() || !self.has_budget(Stage::Script, limits) {
            return self.clone();
        }

        let mut next = self.clone();
        next.retries = self.retries.incremented(Stage::Script, limits.script);
        next.last_error = Some(reason.into());
        next.current_stage = Stage::Script;
        next.discard_from(Stage::Script);
        next
    }

    /// Terminally fail the scene regardless of remaining budget.
    pub fn mark_failed(&self, reason: impl Into<String>) -> Self {
        let mut next = self.clone();
        if !next.is_complete() {
            next.status = SceneStatus::Failed;
            next.last_error = Some(reason.into());
        }
        next
    }

    fn discard_from(&mut self, stage: Stage) {
        if stage <= Stage::Script {
            self.script = None;
        }
        if stage <= Stage::Keyframe {
            self.keyframe = None;
        }
        self.video = None;
    }
}

/// Retry state of a whole job, owned by the orchestrator for one execution.
#[derive(Debug, Clone)]
pub struct HierarchicalRetryState {
    pub job_id: JobId,
    pub scenes: Vec<SceneRetryState>,
    pub limits: StageLimits,
    pub total_attempts: u32,
    pub max_total_attempts: u32,
}

impl HierarchicalRetryState {
    pub fn new(job_id: JobId, limits: StageLimits, max_total_attempts: u32) -> Self {
        Self {
            job_id,
            scenes: (1..=SCENE_COUNT as u8).map(SceneRetryState::new).collect(),
            limits,
            total_attempts: 0,
            max_total_attempts,
        }
    }

    pub fn scene(&self, scene_number: u8) -> Option<&SceneRetryState> {
        self.scenes.iter().find(|s| s.scene_number == scene_number)
    }

    fn index_of(&self, scene_number: u8) -> Result<usize, TransitionError> {
        self.scenes
            .iter()
            .position(|s| s.scene_number == scene_number)
            .ok_or(TransitionError::UnknownScene(scene_number))
    }

    fn with_scene(&self, index: usize, scene: SceneRetryState, attempted: bool) -> Self {
        let mut next = self.clone();
        next.scenes[index] = scene;
        if attempted {
            next.total_attempts += 1;
        }
        next
    }

    /// Record a successful attempt for a scene.
    pub fn record_success(
        &self,
        scene_number: u8,
        output: StageOutput,
    ) -> Result<Self, TransitionError> {
        let index = self.index_of(scene_number)?;
        let scene = self.scenes[index].record_success(output)?;
        Ok(self.with_scene(index, scene, true))
    }

    /// Record a failed attempt for a scene.
    pub fn record_failure(
        &self,
        scene_number: u8,
        error: impl Into<String>,
    ) -> Result<Self, TransitionError> {
        let index = self.index_of(scene_number)?;
        let scene = self.scenes[index].record_failure(error, &self.limits)?;
        Ok(self.with_scene(index, scene, true))
    }

    /// Send a scene back to script generation.
    pub fn request_script_regeneration(
        &self,
        scene_number: u8,
        reason: impl Into<String>,
    ) -> Result<Self, TransitionError> {
        let index = self.index_of(scene_number)?;
        let scene = self.scenes[index].request_script_regeneration(reason, &self.limits);
        Ok(self.with_scene(index, scene, false))
    }

    /// Terminally fail one scene.
    pub fn fail_scene(
        &self,
        scene_number: u8,
        reason: impl Into<String>,
    ) -> Result<Self, TransitionError> {
        let index = self.index_of(scene_number)?;
        let scene = self.scenes[index].mark_failed(reason);
        Ok(self.with_scene(index, scene, false))
    }

    /// Fail every scene that is still in progress.
    pub fn fail_remaining(&self, reason: &str) -> Self {
        let mut next = self.clone();
        next.scenes = self
            .scenes
            .iter()
            .map(|s| if s.is_terminal() { s.clone() } else { s.mark_failed(reason) })
            .collect();
        next
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.total_attempts >= self.max_total_attempts
    }

    /// All scenes complete.
    pub fn is_complete(&self) -> bool {
        self.scenes.iter().all(SceneRetryState::is_complete)
    }

    /// All scenes terminally failed.
    pub fn is_failed(&self) -> bool {
        self.scenes.iter().all(SceneRetryState::is_failed)
    }

    pub fn is_terminal(&self) -> bool {
        self.scenes.iter().all(SceneRetryState::is_terminal)
    }

    /// Completed scenes in scene-number order.
    pub fn completed_scenes(&self) -> Vec<&SceneRetryState> {
        let mut done: Vec<_> = self.scenes.iter().filter(|s| s.is_complete()).collect();
        done.sort_by_key(|s| s.scene_number);
        done
    }

    /// `scene N: <last error>` for every failed scene.
    pub fn failure_summary(&self) -> String {
        self.scenes
            .iter()
            .filter(|s| s.is_failed())
            .map(|s| {
                format!(
                    "scene {}: {}",
                    s.scene_number,
                    s.last_error.as_deref().unwrap_or("unknown error")
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}
