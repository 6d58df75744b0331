//! Scene planning and the template script writer.

use async_trait::async_trait;
use trailer_ai_client::{ClientResult, ScriptRequest, ScriptWriter};
use trailer_models::text::fit_subtitle;
use trailer_models::{BookFacts, Locale, ScenePlan, SceneScript, SceneType, SCENE_COUNT};

/// Three scene plans (intro, body, outro), one per plot beat.
pub fn plan_scenes(facts: &BookFacts) -> Vec<ScenePlan> {
    let focus = facts.protagonist().map(|c| c.name.clone());

    (1..=SCENE_COUNT as u8)
        .map(|n| {
            let beat = facts.plot_beats.get(usize::from(n) - 1);
            ScenePlan {
                scene_number: n,
                scene_type: SceneType::for_scene(n),
                beat: beat
                    .map(|b| b.event.clone())
                    .unwrap_or_else(|| facts.logline.clone()),
                emotional_tone: beat
                    .map(|b| b.tone.clone())
                    .unwrap_or_else(|| "hopeful".to_string()),
                focus_character: focus.clone(),
            }
        })
        .collect()
}

fn motion(scene_type: SceneType) -> &'static str {
    match scene_type {
        SceneType::Intro => "steps into view and looks around",
        SceneType::Body => "moves forward as the story unfolds",
        SceneType::Outro => "turns toward the viewer with a smile",
    }
}

fn narration(request: &ScriptRequest<'_>) -> String {
    let title = &request.facts.canonical_title;
    match (request.locale, request.plan.scene_type) {
        (Locale::Ko, SceneType::Intro) => format!("《{}》의 세계로 함께 떠나 볼까요?", title),
        (Locale::Ko, SceneType::Body) => "꿈과 모험이 가득한 이야기가 펼쳐져요".to_string(),
        (Locale::Ko, SceneType::Outro) => format!("지금 도서관에서 만나 보세요! 《{}》", title),
        (Locale::En, SceneType::Outro) => format!("{}. Find {} at your library!", request.plan.beat, title),
        (Locale::En, _) => request.plan.beat.clone(),
    }
}

/// Deterministic writer used when no LLM is configured.
///
/// Every prompt repeats the style bible phrases verbatim so the scenes stay
/// consistent with each other.
#[derive(Debug, Clone, Default)]
pub struct TemplateScriptWriter {
    scene_duration_secs: u32,
}

impl TemplateScriptWriter {
    pub fn new(scene_duration_secs: u32) -> Self {
        Self {
            scene_duration_secs,
        }
    }
}

#[async_trait]
impl ScriptWriter for TemplateScriptWriter {
    async fn write_script(&self, request: &ScriptRequest<'_>) -> ClientResult<SceneScript> {
        let facts = request.facts;
        let style = request.style;
        let plan = request.plan;

        let hero = facts.protagonist();
        let name = plan
            .focus_character
            .clone()
            .or_else(|| hero.map(|c| c.name.clone()))
            .unwrap_or_else(|| "The hero".to_string());
        let appearance = hero.map(|c| c.appearance.as_str()).unwrap_or("young traveller");
        let palette = style.palette_phrase();
        let duration = if self.scene_duration_secs == 0 { 8 } else { self.scene_duration_secs };

        Ok(SceneScript {
            scene_number: plan.scene_number,
            scene_type: plan.scene_type,
            narration: fit_subtitle(&narration(request), request.max_chars_per_line, request.max_lines),
            dialogue: None,
            character_name: Some(name.clone()),
            visual_description: format!("{} in {}.", plan.beat, facts.setting),
            keyframe_prompt: format!(
                "{}, {} mood. {}, {}. {}. Setting: {}. Colour palette: {}.",
                style.visual_style, style.mood, name, appearance, plan.beat, facts.setting, palette
            ),
            video_prompt: format!(
                "{}. {} {}. {} in {}, {} mood, {} second shot.",
                style.camera_language,
                name,
                motion(plan.scene_type),
                style.visual_style,
                palette,
                style.mood,
                duration
            ),
        })
    }
}
