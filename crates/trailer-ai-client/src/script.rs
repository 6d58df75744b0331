//! Scene script writing.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use trailer_models::text::fit_subtitle;
use trailer_models::{BookFacts, Locale, ScenePlan, SceneScript, StyleBible};

use crate::config::ScriptWriterConfig;
use crate::error::{ClientError, ClientResult};

/// Everything a writer needs to script one scene.
#[derive(Debug, Clone, Copy)]
pub struct ScriptRequest<'a> {
    pub facts: &'a BookFacts,
    pub style: &'a StyleBible,
    pub plan: &'a ScenePlan,
    pub locale: Locale,
    pub max_chars_per_line: usize,
    pub max_lines: usize,
    /// QC feedback from a rejected earlier version of this script
    pub feedback: Option<&'a str>,
    /// 1-based attempt number for this scene's script
    pub attempt: u32,
}

/// Writes the script for one planned scene.
#[async_trait]
pub trait ScriptWriter: Send + Sync {
    async fn write_script(&self, request: &ScriptRequest<'_>) -> ClientResult<SceneScript>;
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Script fields as the model returns them.
#[derive(Debug, Deserialize)]
struct ScriptPayload {
    narration: String,
    #[serde(default)]
    dialogue: Option<String>,
    #[serde(default)]
    character_name: Option<String>,
    visual_description: String,
    keyframe_prompt: String,
    video_prompt: String,
}

/// Gemini-backed script writer (JSON response mode).
pub struct GeminiScriptWriter {
    http: Client,
    api_key: String,
    models: Vec<String>,
    base_url: String,
}

impl GeminiScriptWriter {
    pub fn new(config: &ScriptWriterConfig) -> ClientResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ClientError::config("GEMINI_API_KEY not set"))?;
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Network)?;

        let mut models = vec![config.model.clone()];
        models.extend(
            config
                .fallback_models
                .iter()
                .filter(|m| **m != config.model)
                .cloned(),
        );

        Ok(Self {
            http,
            api_key,
            models,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_prompt(request: &ScriptRequest<'_>) -> String {
        let facts = request.facts;
        let style = request.style;
        let plan = request.plan;

        let characters = facts
            .characters
            .iter()
            .map(|c| format!("- {} ({}): {}; {}", c.name, c.role, c.appearance, c.personality))
            .collect::<Vec<_>>()
            .join("\n");
        let language = match request.locale {
            Locale::Ko => "Korean",
            Locale::En => "English",
        };
        let feedback = request
            .feedback
            .map(|f| format!("\nA previous version was rejected by review:\n{}\nFix every issue listed.\n", f))
            .unwrap_or_default();

        format!(
            r#"You are writing one scene of an 24-second illustrated book trailer for a library kiosk.
The audience is {audience}. Keep everything gentle and family friendly.

BOOK: {title}{author}
LOGLINE: {logline}
SETTING: {setting}
CHARACTERS:
{characters}

STYLE BIBLE (use these words literally in both prompts):
- visual style: {visual_style}
- mood: {mood}
- palette: {palette}
- camera: {camera}
- character guidance: {guidance}

SCENE {number} ({scene_type}): {beat}
EMOTIONAL TONE: {tone}
{feedback}
Return ONLY a single JSON object with this schema:
{{
  "narration": "subtitle narration in {language}, at most {max_lines} lines of {max_chars} characters",
  "dialogue": "optional short line spoken by a character, or null",
  "character_name": "name of the speaking or focus character, or null",
  "visual_description": "what the viewer sees, in English",
  "keyframe_prompt": "English image prompt starting with the visual style and naming the palette colours",
  "video_prompt": "English motion prompt for an 8 second shot using the camera language"
}}"#,
            audience = facts.target_audience,
            title = facts.canonical_title,
            author = facts
                .author
                .as_deref()
                .map(|a| format!(" by {}", a))
                .unwrap_or_default(),
            logline = facts.logline,
            setting = facts.setting,
            characters = characters,
            visual_style = style.visual_style,
            mood = style.mood,
            palette = style.palette_phrase(),
            camera = style.camera_language,
            guidance = style.character_guidance,
            number = plan.scene_number,
            scene_type = plan.scene_type.as_str(),
            beat = plan.beat,
            tone = plan.emotional_tone,
            feedback = feedback,
            language = language,
            max_lines = request.max_lines,
            max_chars = request.max_chars_per_line,
        )
    }

    async fn call_model(&self, model: &str, prompt: &str) -> ClientResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.7,
            },
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::http(status, body));
        }

        let gemini: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("Gemini response: {}", e)))?;

        gemini
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ClientError::unusable("no content in Gemini response"))
    }
}

/// Parse the model's JSON (tolerating markdown fences) into a usable script.
fn parse_script(text: &str, request: &ScriptRequest<'_>) -> ClientResult<SceneScript> {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text).trim();

    let payload: ScriptPayload = serde_json::from_str(text)
        .map_err(|e| ClientError::unusable(format!("script is not valid JSON: {}", e)))?;

    let non_empty = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty() && v != "null");

    let script = SceneScript {
        scene_number: request.plan.scene_number,
        scene_type: request.plan.scene_type,
        narration: fit_subtitle(&payload.narration, request.max_chars_per_line, request.max_lines),
        dialogue: non_empty(payload.dialogue),
        character_name: non_empty(payload.character_name)
            .or_else(|| request.plan.focus_character.clone()),
        visual_description: payload.visual_description.trim().to_string(),
        keyframe_prompt: payload.keyframe_prompt.trim().to_string(),
        video_prompt: payload.video_prompt.trim().to_string(),
    };

    if !script.is_usable() {
        return Err(ClientError::unusable("script is missing narration or prompts"));
    }
    Ok(script)
}

#[async_trait]
impl ScriptWriter for GeminiScriptWriter {
    async fn write_script(&self, request: &ScriptRequest<'_>) -> ClientResult<SceneScript> {
        let prompt = Self::build_prompt(request);
        let mut last_error = None;

        for model in &self.models {
            match self.call_model(model, &prompt).await {
                Ok(text) => match parse_script(&text, request) {
                    Ok(script) => {
                        info!(
                            model = %model,
                            scene = request.plan.scene_number,
                            attempt = request.attempt,
                            "Scene script written"
                        );
                        return Ok(script);
                    }
                    Err(e) => {
                        warn!(model = %model, error = %e, "Unusable script from model");
                        last_error = Some(e);
                    }
                },
                Err(e) => {
                    warn!(model = %model, error = %e, "Script model call failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ClientError::config("no script models configured")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use trailer_models::{Character, PlotBeat, SceneType, SubtitleZone, TypographyPlan};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn facts() -> BookFacts {
        BookFacts {
            canonical_title: "Peter Pan".into(),
            author: Some("J. M. Barrie".into()),
            logline: "A boy who never grows up takes three children to Neverland.".into(),
            characters: vec![Character::new("Peter", "protagonist", "green tunic", "playful")],
            plot_beats: vec![PlotBeat::new("Peter flies into the nursery", "curious")],
            setting: "London and Neverland".into(),
            themes: vec!["childhood".into()],
            target_audience: "children".into(),
            confidence: 0.95,
            source: "offline:peter-pan".into(),
        }
    }

    fn style() -> StyleBible {
        StyleBible {
            visual_style: "storybook watercolor".into(),
            mood: "playful wonder".into(),
            color_palette: vec!["sky blue".into(), "leaf green".into()],
            camera_language: "gliding aerial shots".into(),
            character_guidance: "Peter: green tunic".into(),
            typography: TypographyPlan {
                zone: SubtitleZone::BottomCenter,
                safe_area_percent: 90.0,
                font_size_px: 40,
                min_contrast_ratio: 4.5,
                text_color: "#FFFFFF".into(),
                background_color: "#000000".into(),
            },
        }
    }

    fn plan() -> ScenePlan {
        ScenePlan {
            scene_number: 1,
            scene_type: SceneType::Intro,
            beat: "Peter flies into the nursery".into(),
            emotional_tone: "curious".into(),
            focus_character: Some("Peter".into()),
        }
    }

    fn writer(server: &MockServer) -> GeminiScriptWriter {
        GeminiScriptWriter::new(&ScriptWriterConfig {
            api_key: Some("k".into()),
            model: "primary".into(),
            fallback_models: vec!["backup".into()],
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn gemini_text(text: &str) -> serde_json::Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    #[tokio::test]
    async fn test_writes_and_fits_script() {
        let server = MockServer::start().await;
        let script = json!({
            "narration": "On a starry night a boy who never grows up flies through the nursery window to find his shadow",
            "dialogue": null,
            "character_name": null,
            "visual_description": "Peter gliding through an open window",
            "keyframe_prompt": "storybook watercolor, sky blue and leaf green, Peter at the window",
            "video_prompt": "gliding aerial shots over London rooftops"
        });
        Mock::given(method("POST"))
            .and(path("/models/primary:generateContent"))
            .and(query_param("key", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_text(&format!("```json\n{}\n```", script))))
            .expect(1)
            .mount(&server)
            .await;

        let (facts, style, plan) = (facts(), style(), plan());
        let request = ScriptRequest {
            facts: &facts,
            style: &style,
            plan: &plan,
            locale: Locale::En,
            max_chars_per_line: 40,
            max_lines: 2,
            feedback: None,
            attempt: 1,
        };
        let script = writer(&server).write_script(&request).await.unwrap();

        assert_eq!(script.scene_number, 1);
        assert_eq!(script.character_name.as_deref(), Some("Peter"));
        assert!(script.dialogue.is_none());
        let lines: Vec<&str> = script.narration.lines().collect();
        assert!(lines.len() <= 2);
        assert!(lines.iter().all(|l| l.chars().count() <= 40));
    }

    #[tokio::test]
    async fn test_falls_back_to_next_model_on_unusable_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/primary:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_text("I cannot help with that.")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/backup:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_text(
                r#"{"narration":"Hi","visual_description":"v","keyframe_prompt":"k","video_prompt":"p"}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let (facts, style, plan) = (facts(), style(), plan());
        let request = ScriptRequest {
            facts: &facts,
            style: &style,
            plan: &plan,
            locale: Locale::Ko,
            max_chars_per_line: 20,
            max_lines: 2,
            feedback: Some("typography: Scene 1: subtitle too long"),
            attempt: 2,
        };
        let script = writer(&server).write_script(&request).await.unwrap();
        assert_eq!(script.narration, "Hi");
    }

    #[tokio::test]
    async fn test_empty_candidates_are_unusable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let (facts, style, plan) = (facts(), style(), plan());
        let request = ScriptRequest {
            facts: &facts,
            style: &style,
            plan: &plan,
            locale: Locale::En,
            max_chars_per_line: 40,
            max_lines: 2,
            feedback: None,
            attempt: 1,
        };
        let err = writer(&server).write_script(&request).await.unwrap_err();
        assert!(matches!(err, ClientError::UnusableContent(_)));
    }

    #[test]
    fn test_prompt_carries_style_and_feedback() {
        let (facts, style, plan) = (facts(), style(), plan());
        let request = ScriptRequest {
            facts: &facts,
            style: &style,
            plan: &plan,
            locale: Locale::Ko,
            max_chars_per_line: 20,
            max_lines: 2,
            feedback: Some("Scene 1: subtitle line 1 has 30 characters"),
            attempt: 2,
        };
        let prompt = GeminiScriptWriter::build_prompt(&request);
        assert!(prompt.contains("storybook watercolor"));
        assert!(prompt.contains("sky blue, leaf green"));
        assert!(prompt.contains("Korean"));
        assert!(prompt.contains("30 characters"));
    }
}
