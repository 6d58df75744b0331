//! Scene plans and scripts.

use serde::{Deserialize, Serialize};

/// Number of scenes in every trailer.
pub const SCENE_COUNT: usize = 3;

/// Fixed role of a scene in the trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneType {
    Intro,
    Body,
    Outro,
}

impl SceneType {
    /// Scene type for a 1-based scene number.
    pub fn for_scene(scene_number: u8) -> Self {
        match scene_number {
            1 => SceneType::Intro,
            n if n as usize >= SCENE_COUNT => SceneType::Outro,
            _ => SceneType::Body,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SceneType::Intro => "intro",
            SceneType::Body => "body",
            SceneType::Outro => "outro",
        }
    }
}

/// What a scene should show, before any script is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePlan {
    pub scene_number: u8,
    pub scene_type: SceneType,
    /// Plot beat event this scene dramatizes
    pub beat: String,
    pub emotional_tone: String,
    /// Name of the character in focus
    pub focus_character: Option<String>,
}

/// Full script for one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneScript {
    /// 1..=3
    pub scene_number: u8,
    pub scene_type: SceneType,
    pub narration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_name: Option<String>,
    pub visual_description: String,
    pub keyframe_prompt: String,
    pub video_prompt: String,
}

impl SceneScript {
    /// All text that is shown, spoken or sent to a generator.
    pub fn all_text(&self) -> Vec<&str> {
        let mut parts = vec![
            self.narration.as_str(),
            self.visual_description.as_str(),
            self.keyframe_prompt.as_str(),
            self.video_prompt.as_str(),
        ];
        if let Some(dialogue) = &self.dialogue {
            parts.push(dialogue);
        }
        parts
    }

    /// Text describing the visuals (description and both prompts).
    pub fn visual_text(&self) -> String {
        format!(
            "{} {} {}",
            self.visual_description, self.keyframe_prompt, self.video_prompt
        )
    }

    /// Whether the script has the fields every later stage needs.
    pub fn is_usable(&self) -> bool {
        !self.narration.trim().is_empty()
            && !self.keyframe_prompt.trim().is_empty()
            && !self.video_prompt.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_type_for_number() {
        assert_eq!(SceneType::for_scene(1), SceneType::Intro);
        assert_eq!(SceneType::for_scene(2), SceneType::Body);
        assert_eq!(SceneType::for_scene(3), SceneType::Outro);
    }

    #[test]
    fn test_usable_requires_prompts() {
        let mut script = SceneScript {
            scene_number: 1,
            scene_type: SceneType::Intro,
            narration: "Once upon a time".into(),
            dialogue: None,
            character_name: None,
            visual_description: "a desert".into(),
            keyframe_prompt: "desert at dawn".into(),
            video_prompt: "slow push-in".into(),
        };
        assert!(script.is_usable());
        assert_eq!(script.all_text().len(), 4);

        script.video_prompt = "  ".into();
        assert!(!script.is_usable());
    }
}
