//! Style bible derivation.
//!
//! A pure function of the grounded facts and the output locale. Presets are
//! chosen from audience and themes so that equal facts always yield an equal
//! style bible.

use trailer_models::{BookFacts, Locale, StyleBible, SubtitleZone, TypographyPlan};

struct StylePreset {
    visual_style: &'static str,
    mood: &'static str,
    palette: [&'static str; 3],
    camera_language: &'static str,
}

const STORYBOOK: StylePreset = StylePreset {
    visual_style: "soft watercolor storybook illustration",
    mood: "playful wonder",
    palette: ["sky blue", "sand gold", "rose pink"],
    camera_language: "slow dolly, wide framing",
};

const ADVENTURE: StylePreset = StylePreset {
    visual_style: "vibrant painterly illustration",
    mood: "bright adventure",
    palette: ["teal", "amber", "cream"],
    camera_language: "gliding tracking shots",
};

const CLASSIC: StylePreset = StylePreset {
    visual_style: "cinematic gouache illustration",
    mood: "warm discovery",
    palette: ["navy", "ochre", "ivory"],
    camera_language: "slow dolly, steady framing",
};

fn preset_for(facts: &BookFacts) -> &'static StylePreset {
    if facts.is_for_children() {
        &STORYBOOK
    } else if facts.has_theme(&["adventure", "fantasy", "quest", "magic"]) {
        &ADVENTURE
    } else {
        &CLASSIC
    }
}

/// Subtitle plan. White on a black backing box is 21:1.
fn typography_plan(locale: Locale) -> TypographyPlan {
    TypographyPlan {
        zone: SubtitleZone::BottomCenter,
        safe_area_percent: 90.0,
        font_size_px: match locale {
            Locale::Ko => 44,
            Locale::En => 40,
        },
        min_contrast_ratio: 4.5,
        text_color: "#FFFFFF".to_string(),
        background_color: "#000000".to_string(),
    }
}

fn character_guidance(facts: &BookFacts) -> String {
    let described = facts
        .characters
        .iter()
        .map(|c| format!("{}: {}", c.name, c.appearance))
        .collect::<Vec<_>>()
        .join("; ");
    if described.is_empty() {
        "Keep every character identical in face, outfit and proportions across scenes".to_string()
    } else {
        format!(
            "{}. Keep every character identical in face, outfit and proportions across scenes",
            described
        )
    }
}

/// Derive the style bible for a job.
pub fn build_style_bible(facts: &BookFacts, locale: Locale) -> StyleBible {
    let preset = preset_for(facts);
    StyleBible {
        visual_style: preset.visual_style.to_string(),
        mood: preset.mood.to_string(),
        color_palette: preset.palette.iter().map(|c| c.to_string()).collect(),
        camera_language: preset.camera_language.to_string(),
        character_guidance: character_guidance(facts),
        typography: typography_plan(locale),
    }
}
