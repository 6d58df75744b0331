//! Typography validator.

use trailer_models::{
    GateStatus, Locale, SceneScript, SceneTypographyChecks, TypographyPlan, TypographyResult,
};

use crate::rules::{LocaleTypography, TypographyRules};

/// Checks subtitle legibility of every scene against the typography plan.
#[derive(Debug, Clone)]
pub struct TypographyValidator {
    rules: TypographyRules,
}

impl TypographyValidator {
    pub fn new(rules: TypographyRules) -> Self {
        Self { rules }
    }

    pub fn limits(&self, locale: Locale) -> &LocaleTypography {
        self.rules.for_locale(locale)
    }

    pub fn validate(
        &self,
        scripts: &[SceneScript],
        plan: &TypographyPlan,
        locale: Locale,
    ) -> TypographyResult {
        let limits = self.rules.for_locale(locale);
        let mut violations = Vec::new();
        let mut scenes = Vec::with_capacity(scripts.len());

        // Plan-level checks are shared by every scene.
        let safe_area = plan.zone.is_subtitle_safe()
            && plan.safe_area_percent >= self.rules.min_safe_area_percent;
        let font_size = plan.font_size_px >= limits.min_font_size_px;
        let required_contrast = plan.min_contrast_ratio.max(self.rules.min_contrast_ratio);
        let measured_contrast = contrast_ratio(&plan.text_color, &plan.background_color);
        let contrast = measured_contrast.is_some_and(|ratio| ratio >= required_contrast);

        for script in scripts {
            let n = script.scene_number;
            let lines: Vec<&str> = script
                .narration
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();

            let mut subtitle_length = true;
            for (i, line) in lines.iter().enumerate() {
                let len = line.chars().count();
                if len > limits.max_chars_per_line {
                    subtitle_length = false;
                    violations.push(format!(
                        "Scene {}: subtitle line {} has {} characters, exceeds limit of {}",
                        n,
                        i + 1,
                        len,
                        limits.max_chars_per_line
                    ));
                }
            }

            let line_count = lines.len() <= limits.max_lines;
            if !line_count {
                violations.push(format!(
                    "Scene {}: subtitle has {} lines, exceeds limit of {}",
                    n,
                    lines.len(),
                    limits.max_lines
                ));
            }
            if !safe_area {
                violations.push(format!(
                    "Scene {}: subtitle zone {} with safe area {:.0}% is outside the {:.0}% safe area",
                    n,
                    plan.zone.as_str(),
                    plan.safe_area_percent,
                    self.rules.min_safe_area_percent
                ));
            }
            if !font_size {
                violations.push(format!(
                    "Scene {}: font size {}px below minimum {}px",
                    n, plan.font_size_px, limits.min_font_size_px
                ));
            }
            if !contrast {
                let measured = measured_contrast
                    .map(|r| format!("{:.2}:1", r))
                    .unwrap_or_else(|| "unreadable colours".to_string());
                violations.push(format!(
                    "Scene {}: contrast {} below minimum {:.1}:1",
                    n, measured, required_contrast
                ));
            }

            scenes.push(SceneTypographyChecks {
                scene_number: n,
                subtitle_length,
                line_count,
                safe_area,
                font_size,
                contrast,
            });
        }

        let total: usize = scenes.len() * 5;
        let passed: usize = scenes.iter().map(SceneTypographyChecks::passed_count).sum();
        let score = if total == 0 {
            1.0
        } else {
            passed as f64 / total as f64
        };

        TypographyResult {
            status: GateStatus::from_passed(passed == total),
            score,
            scenes,
            violations,
        }
    }
}

/// WCAG contrast ratio between two `#RRGGBB` colours.
pub fn contrast_ratio(foreground: &str, background: &str) -> Option<f64> {
    let l1 = relative_luminance(parse_hex(foreground)?);
    let l2 = relative_luminance(parse_hex(background)?);
    let (lighter, darker) = if l1 >= l2 { (l1, l2) } else { (l2, l1) };
    Some((lighter + 0.05) / (darker + 0.05))
}

fn parse_hex(color: &str) -> Option<[u8; 3]> {
    let hex = color.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

fn relative_luminance([r, g, b]: [u8; 3]) -> f64 {
    let linear = |c: u8| {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}
