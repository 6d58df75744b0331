//! Versioned QC rule tables.
//!
//! The defaults are embedded; a JSON file can override any subset of them at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trailer_models::Locale;

/// Rule loading errors.
#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse rules file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid rules: {0}")]
    Invalid(String),
}

/// A word list per locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LocaleTerms {
    pub ko: Vec<String>,
    pub en: Vec<String>,
}

impl LocaleTerms {
    fn from_slices(ko: &[&str], en: &[&str]) -> Self {
        Self {
            ko: ko.iter().map(|s| s.to_string()).collect(),
            en: en.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn for_locale(&self, locale: Locale) -> &[String] {
        match locale {
            Locale::Ko => &self.ko,
            Locale::En => &self.en,
        }
    }

    /// Terms to scan for a job in `locale`.
    ///
    /// Generation prompts are written in English regardless of the output locale,
    /// so English terms always apply.
    pub fn scan_terms(&self, locale: Locale) -> impl Iterator<Item = &str> {
        let extra: &[String] = match locale {
            Locale::Ko => &self.ko,
            Locale::En => &[],
        };
        self.en.iter().chain(extra.iter()).map(String::as_str)
    }
}

/// Safety gate rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyRules {
    pub forbidden_terms: LocaleTerms,
    pub positive_terms: LocaleTerms,
    pub negative_terms: LocaleTerms,
    /// Minimum tone score for a pass
    pub min_tone_score: f64,
    /// Pseudo-count of neutral weight added to the tone ratio
    pub neutral_weight: f64,
}

impl Default for SafetyRules {
    fn default() -> Self {
        Self {
            forbidden_terms: LocaleTerms::from_slices(
                &[
                    "살인", "살해", "피투성이", "유혈", "자살", "자해", "마약", "총기", "나체",
                    "성인물", "시체", "고문", "학대", "잔혹",
                ],
                &[
                    "murder", "suicide", "self-harm", "gore", "bloody", "blood", "drugs",
                    "cocaine", "heroin", "nude", "naked", "sexual", "corpse", "torture",
                    "firearm", "gunfire", "decapitat", "massacre",
                ],
            ),
            positive_terms: LocaleTerms::from_slices(
                &[
                    "희망", "우정", "사랑", "기쁨", "마법", "따뜻", "모험", "꿈", "용기", "미소",
                    "행복", "친구",
                ],
                &[
                    "hope", "wonder", "friend", "love", "joy", "magic", "bright", "gentle",
                    "warm", "adventure", "dream", "kind", "smile", "discover", "brave",
                    "curious", "playful",
                ],
            ),
            negative_terms: LocaleTerms::from_slices(
                &["두려움", "어둠", "슬픔", "외로", "위험", "분노", "눈물", "공포", "절망"],
                &[
                    "fear", "sad", "lonely", "danger", "angry", "cry", "grief", "scary",
                    "despair", "hatred", "cruel",
                ],
            ),
            min_tone_score: 0.7,
            neutral_weight: 3.0,
        }
    }
}

/// Typography limits for one locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleTypography {
    pub max_chars_per_line: usize,
    pub max_lines: usize,
    pub min_font_size_px: u32,
}

/// Typography validator rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypographyRules {
    pub ko: LocaleTypography,
    pub en: LocaleTypography,
    pub min_safe_area_percent: f64,
    /// WCAG AA floor applied even when the plan asks for less
    pub min_contrast_ratio: f64,
}

impl Default for TypographyRules {
    fn default() -> Self {
        Self {
            ko: LocaleTypography {
                max_chars_per_line: 20,
                max_lines: 2,
                min_font_size_px: 40,
            },
            en: LocaleTypography {
                max_chars_per_line: 40,
                max_lines: 2,
                min_font_size_px: 36,
            },
            min_safe_area_percent: 90.0,
            min_contrast_ratio: 4.5,
        }
    }
}

impl TypographyRules {
    pub fn for_locale(&self, locale: Locale) -> &LocaleTypography {
        match locale {
            Locale::Ko => &self.ko,
            Locale::En => &self.en,
        }
    }
}

/// Consistency checker rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyRules {
    pub min_anchor_match: f64,
    pub min_scene_consistency: f64,
    pub max_color_drift: f64,
    /// Colour vocabulary used for drift detection
    pub color_terms: Vec<String>,
    /// Style descriptors compared between consecutive scenes
    pub style_descriptors: Vec<String>,
    /// Words ignored when extracting style keywords
    pub stopwords: Vec<String>,
}

impl Default for ConsistencyRules {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            min_anchor_match: 0.75,
            min_scene_consistency: 0.80,
            max_color_drift: 0.20,
            color_terms: owned(&[
                "red", "crimson", "scarlet", "orange", "amber", "yellow", "gold", "green",
                "emerald", "teal", "turquoise", "blue", "navy", "azure", "indigo", "purple",
                "violet", "lavender", "pink", "rose", "magenta", "brown", "sienna", "ochre",
                "beige", "cream", "ivory", "white", "black", "gray", "grey", "silver",
                "sand", "peach", "coral", "mint", "olive",
            ]),
            style_descriptors: owned(&[
                "watercolor", "painterly", "illustration", "illustrated", "storybook",
                "cinematic", "soft", "pastel", "vibrant", "muted", "dreamy", "whimsical",
                "ink", "gouache", "textured", "glow", "glowing", "misty", "luminous",
                "hand-drawn", "lighting", "warm", "cool", "gentle", "wide", "close-up",
                "tracking", "dolly", "handheld", "static", "slow",
            ]),
            stopwords: owned(&[
                "and", "the", "with", "for", "from", "into", "onto", "that", "this", "of",
                "in", "on", "at", "to", "by", "an", "a", "style", "tones", "tone", "color",
                "colors", "palette", "shot", "shots", "camera",
            ]),
        }
    }
}

/// Aggregate scoring rules and the retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRules {
    pub safety_weight: f64,
    pub typography_weight: f64,
    pub consistency_weight: f64,
    /// Script regeneration rounds allowed after a failed report
    pub max_retries: u32,
    /// Overall score at or above which an imperfect report is accepted once retries run out
    pub min_accept_score: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            safety_weight: 0.3,
            typography_weight: 0.35,
            consistency_weight: 0.35,
            max_retries: 2,
            min_accept_score: 0.6,
        }
    }
}

/// All QC rule tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcRules {
    pub version: String,
    pub safety: SafetyRules,
    pub typography: TypographyRules,
    pub consistency: ConsistencyRules,
    pub scoring: ScoringRules,
}

impl Default for QcRules {
    fn default() -> Self {
        Self {
            version: "2024.1".to_string(),
            safety: SafetyRules::default(),
            typography: TypographyRules::default(),
            consistency: ConsistencyRules::default(),
            scoring: ScoringRules::default(),
        }
    }
}

impl QcRules {
    /// Load rules from a JSON file. Missing sections keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let rules: QcRules = serde_json::from_str(&raw)?;
        rules.validate()?;
        tracing::info!(
            path = %path.as_ref().display(),
            version = %rules.version,
            "Loaded QC rules override"
        );
        Ok(rules)
    }

    /// Embedded defaults, or the file at `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self, RulesError> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.scoring.max_retries = max_retries;
        self
    }

    fn validate(&self) -> Result<(), RulesError> {
        let unit = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(RulesError::Invalid(format!("{} must be within [0, 1], got {}", name, value)))
            }
        };
        unit("safety.min_tone_score", self.safety.min_tone_score)?;
        unit("consistency.min_anchor_match", self.consistency.min_anchor_match)?;
        unit("consistency.min_scene_consistency", self.consistency.min_scene_consistency)?;
        unit("consistency.max_color_drift", self.consistency.max_color_drift)?;
        unit("scoring.min_accept_score", self.scoring.min_accept_score)?;

        if self.safety.neutral_weight < 0.0 {
            return Err(RulesError::Invalid("safety.neutral_weight must not be negative".into()));
        }
        if self.typography.ko.max_chars_per_line == 0 || self.typography.en.max_chars_per_line == 0
        {
            return Err(RulesError::Invalid("typography line limits must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_locale_limits() {
        let rules = QcRules::default();
        assert_eq!(rules.typography.for_locale(Locale::Ko).max_chars_per_line, 20);
        assert_eq!(rules.typography.for_locale(Locale::En).max_chars_per_line, 40);
        assert_eq!(rules.typography.for_locale(Locale::En).max_lines, 2);
    }

    #[test]
    fn test_korean_scan_includes_english_terms() {
        let rules = SafetyRules::default();
        let ko: Vec<&str> = rules.forbidden_terms.scan_terms(Locale::Ko).collect();
        assert!(ko.contains(&"murder"));
        assert!(ko.contains(&"살인"));

        let en: Vec<&str> = rules.forbidden_terms.scan_terms(Locale::En).collect();
        assert!(!en.contains(&"살인"));
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version": "test-1", "typography": {{"en": {{"max_chars_per_line": 32, "max_lines": 2, "min_font_size_px": 30}}}}}}"#
        )
        .unwrap();

        let rules = QcRules::from_json_file(file.path()).unwrap();
        assert_eq!(rules.version, "test-1");
        assert_eq!(rules.typography.en.max_chars_per_line, 32);
        assert_eq!(rules.typography.ko.max_chars_per_line, 20);
        assert_eq!(rules.safety, SafetyRules::default());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"consistency": {{"max_color_drift": 1.5}}}}"#).unwrap();

        let err = QcRules::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, RulesError::Invalid(_)));
    }
}
