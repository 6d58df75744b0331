//! Safety gate.
//!
//! Matching is plain case-insensitive substring search over every piece of text a
//! script shows, speaks or sends to a generator. This misses paraphrases and flags
//! words that merely contain a forbidden term; both are known limitations.

use tracing::debug;
use trailer_models::{GateStatus, Locale, SafetyResult, SceneScript};

use crate::rules::SafetyRules;
use crate::text::{contains_term, count_term};

/// Zero-tolerance safety gate with a coarse tone score.
#[derive(Debug, Clone)]
pub struct SafetyGate {
    rules: SafetyRules,
}

impl SafetyGate {
    pub fn new(rules: SafetyRules) -> Self {
        Self { rules }
    }

    /// Check a set of scene scripts.
    ///
    /// Score is 1.0 only with no forbidden term and tone at or above the minimum.
    pub fn check(&self, scripts: &[SceneScript], locale: Locale) -> SafetyResult {
        let mut violations = Vec::new();
        let mut positive = 0usize;
        let mut negative = 0usize;

        for script in scripts {
            let fields = [
                ("narration", Some(script.narration.as_str())),
                ("dialogue", script.dialogue.as_deref()),
                ("visual description", Some(script.visual_description.as_str())),
                ("keyframe prompt", Some(script.keyframe_prompt.as_str())),
                ("video prompt", Some(script.video_prompt.as_str())),
            ];

            for (field, text) in fields {
                let Some(text) = text else { continue };
                let lower = text.to_lowercase();

                for term in self.rules.forbidden_terms.scan_terms(locale) {
                    if contains_term(&lower, term) {
                        violations.push(format!(
                            "Scene {}: {} contains forbidden term '{}'",
                            script.scene_number, field, term
                        ));
                    }
                }

                positive += self
                    .rules
                    .positive_terms
                    .scan_terms(locale)
                    .map(|t| count_term(&lower, t))
                    .sum::<usize>();
                negative += self
                    .rules
                    .negative_terms
                    .scan_terms(locale)
                    .map(|t| count_term(&lower, t))
                    .sum::<usize>();
            }
        }

        let tone_score = self.tone_score(positive, negative);
        let passed = violations.is_empty() && tone_score >= self.rules.min_tone_score;

        if tone_score < self.rules.min_tone_score {
            violations.push(format!(
                "tone score {:.2} below minimum {:.2}",
                tone_score, self.rules.min_tone_score
            ));
        }

        debug!(
            positive,
            negative,
            tone_score,
            violations = violations.len(),
            "Safety gate evaluated"
        );

        SafetyResult {
            status: GateStatus::from_passed(passed),
            score: if passed { 1.0 } else { 0.0 },
            tone_score,
            violations,
        }
    }

    /// Share of positive signal, with neutral pseudo-counts so text without
    /// any tone keyword scores 1.0.
    fn tone_score(&self, positive: usize, negative: usize) -> f64 {
        let neutral = self.rules.neutral_weight;
        let denominator = positive as f64 + negative as f64 + neutral;
        if denominator <= 0.0 {
            return 1.0;
        }
        ((positive as f64 + neutral) / denominator).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailer_models::SceneType;

    fn script(n: u8, narration: &str) -> SceneScript {
        SceneScript {
            scene_number: n,
            scene_type: SceneType::for_scene(n),
            narration: narration.to_string(),
            dialogue: None,
            character_name: None,
            visual_description: "a small planet under a wide sky".into(),
            keyframe_prompt: "watercolor storybook illustration of a small planet".into(),
            video_prompt: "slow push-in across the planet".into(),
        }
    }

    fn gate() -> SafetyGate {
        SafetyGate::new(SafetyRules::default())
    }

    #[test]
    fn test_clean_scripts_pass() {
        let scripts = vec![
            script(1, "A curious boy tends a rose."),
            script(2, "He sets out on an adventure."),
            script(3, "Friendship is found in the stars."),
        ];
        let result = gate().check(&scripts, Locale::En);
        assert_eq!(result.status, GateStatus::Pass);
        assert_eq!(result.score, 1.0);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_forbidden_term_fails_with_zero_score() {
        let scripts = vec![script(1, "A calm night."), script(2, "There was a murder.")];
        let result = gate().check(&scripts, Locale::En);
        assert_eq!(result.status, GateStatus::Fail);
        assert_eq!(result.score, 0.0);
        assert!(result.violations[0].starts_with("Scene 2: narration"));
        assert!(result.violations[0].contains("murder"));
    }

    #[test]
    fn test_korean_forbidden_term() {
        let result = gate().check(&[script(1, "마을에 살인 사건이 일어났다")], Locale::Ko);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_low_tone_fails_without_forbidden_terms() {
        let scripts = vec![script(1, "Fear, grief and despair. Sad, lonely, scary.")];
        let result = gate().check(&scripts, Locale::En);
        assert!(result.tone_score < 0.7);
        assert_eq!(result.score, 0.0);
        assert!(result.violations.iter().any(|v| v.contains("tone score")));
    }

    #[test]
    fn test_neutral_text_has_full_tone() {
        let result = gate().check(&[script(1, "A boy stands on a planet.")], Locale::En);
        assert_eq!(result.tone_score, 1.0);
    }

    #[test]
    fn test_score_is_binary() {
        let samples = [
            "Hope and joy.",
            "A sad day.",
            "Sad, lonely, scary, fear.",
            "A naked tree.",
            "",
        ];
        for sample in samples {
            let score = gate().check(&[script(1, sample)], Locale::En).score;
            assert!(score == 0.0 || score == 1.0, "score {} for {:?}", score, sample);
        }
    }
}
