//! Style bible: the single source of visual-style truth for one job.

use serde::{Deserialize, Serialize};

/// Screen region reserved for subtitles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleZone {
    #[default]
    BottomCenter,
    TopCenter,
    Center,
}

impl SubtitleZone {
    /// Whether the zone sits inside the title-safe band used for subtitles.
    pub fn is_subtitle_safe(&self) -> bool {
        matches!(self, SubtitleZone::BottomCenter | SubtitleZone::TopCenter)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitleZone::BottomCenter => "bottom_center",
            SubtitleZone::TopCenter => "top_center",
            SubtitleZone::Center => "center",
        }
    }
}

/// Subtitle placement and legibility plan checked by typography QC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypographyPlan {
    pub zone: SubtitleZone,
    /// Percentage of the frame inside which subtitles must stay (>= 90)
    pub safe_area_percent: f64,
    pub font_size_px: u32,
    /// Minimum contrast ratio between text and its backing (>= 4.5)
    pub min_contrast_ratio: f64,
    /// Text colour as `#RRGGBB`
    pub text_color: String,
    /// Backing box colour as `#RRGGBB`
    pub background_color: String,
}

/// Visual style shared by all scenes of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleBible {
    pub visual_style: String,
    pub mood: String,
    /// Ordered colour palette (names, most dominant first)
    pub color_palette: Vec<String>,
    pub camera_language: String,
    pub character_guidance: String,
    pub typography: TypographyPlan,
}

impl StyleBible {
    /// Palette as a single comma-separated phrase for prompts.
    pub fn palette_phrase(&self) -> String {
        self.color_palette.join(", ")
    }
}
