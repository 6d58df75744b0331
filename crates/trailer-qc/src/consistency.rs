//! Style consistency checker.
//!
//! Compares the visual text of every scene (description plus both prompts) against
//! the style bible and against neighbouring scenes.

use std::collections::BTreeSet;

use trailer_models::{ConsistencyResult, GateStatus, SceneScript, StyleBible};

use crate::rules::ConsistencyRules;
use crate::text::{contains_term, keywords, tokens};

#[derive(Debug, Clone)]
pub struct ConsistencyChecker {
    rules: ConsistencyRules,
}

impl ConsistencyChecker {
    pub fn new(rules: ConsistencyRules) -> Self {
        Self { rules }
    }

    pub fn check(&self, scripts: &[SceneScript], style: &StyleBible) -> ConsistencyResult {
        let scene_texts: Vec<(u8, String)> = scripts
            .iter()
            .map(|s| (s.scene_number, s.visual_text().to_lowercase()))
            .collect();
        let combined = scene_texts
            .iter()
            .map(|(_, t)| t.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let anchor_keywords = self.style_keywords(style);
        let anchor_match = self.anchor_match(&anchor_keywords, &combined);
        let scene_consistency = self.scene_consistency(&anchor_keywords, &scene_texts);
        let color_drift = self.color_drift(style, &combined);
        let (style_signature_match, unsigned_scenes) = self.style_signature(style, &scene_texts);

        let mut violations = Vec::new();
        if anchor_match < self.rules.min_anchor_match {
            let missing: Vec<&str> = anchor_keywords
                .iter()
                .filter(|k| !combined.contains(k.as_str()))
                .map(String::as_str)
                .collect();
            violations.push(format!(
                "anchor match {:.2} below {:.2} (missing: {})",
                anchor_match,
                self.rules.min_anchor_match,
                missing.join(", ")
            ));
        }
        if scene_consistency < self.rules.min_scene_consistency {
            violations.push(format!(
                "scene-to-scene consistency {:.2} below {:.2}",
                scene_consistency, self.rules.min_scene_consistency
            ));
        }
        if color_drift > self.rules.max_color_drift {
            violations.push(format!(
                "colour drift {:.2} exceeds {:.2}",
                color_drift, self.rules.max_color_drift
            ));
        }
        for n in unsigned_scenes {
            violations.push(format!(
                "Scene {}: missing visual style signature '{}'",
                n, style.visual_style
            ));
        }

        let score = ((anchor_match + scene_consistency + (1.0 - color_drift)) / 3.0).clamp(0.0, 1.0);

        ConsistencyResult {
            status: GateStatus::from_passed(violations.is_empty()),
            score,
            anchor_match,
            scene_consistency,
            color_drift,
            style_signature_match,
            violations,
        }
    }

    /// Keywords of the visual style, mood, camera language and palette.
    fn style_keywords(&self, style: &StyleBible) -> BTreeSet<String> {
        let mut source = format!("{} {} {}", style.visual_style, style.mood, style.camera_language);
        for color in &style.color_palette {
            source.push(' ');
            source.push_str(color);
        }
        keywords(&source, &self.rules.stopwords)
    }

    fn anchor_match(&self, anchor: &BTreeSet<String>, combined: &str) -> f64 {
        if anchor.is_empty() {
            return 1.0;
        }
        let found = anchor.iter().filter(|k| contains_term(combined, k)).count();
        found as f64 / anchor.len() as f64
    }

    /// Mean Jaccard similarity of style-descriptor sets of consecutive scenes.
    fn scene_consistency(&self, anchor: &BTreeSet<String>, scene_texts: &[(u8, String)]) -> f64 {
        if scene_texts.len() < 2 {
            return 1.0;
        }

        let vocabulary: BTreeSet<String> = anchor
            .iter()
            .cloned()
            .chain(self.rules.style_descriptors.iter().map(|d| d.to_lowercase()))
            .chain(self.rules.color_terms.iter().map(|c| c.to_lowercase()))
            .collect();

        let descriptor_sets: Vec<BTreeSet<String>> = scene_texts
            .iter()
            .map(|(_, text)| {
                tokens(text)
                    .into_iter()
                    .filter(|t| vocabulary.contains(t))
                    .collect()
            })
            .collect();

        let similarities: Vec<f64> = descriptor_sets
            .windows(2)
            .map(|pair| jaccard(&pair[0], &pair[1]))
            .collect();
        similarities.iter().sum::<f64>() / similarities.len() as f64
    }

    /// Share of colour-word mentions that are not part of the palette.
    fn color_drift(&self, style: &StyleBible, combined: &str) -> f64 {
        let palette_tokens: BTreeSet<String> = style
            .color_palette
            .iter()
            .flat_map(|c| tokens(c))
            .collect();
        let color_terms: BTreeSet<String> =
            self.rules.color_terms.iter().map(|c| c.to_lowercase()).collect();

        let mut total = 0usize;
        let mut foreign = 0usize;
        for token in tokens(combined) {
            if color_terms.contains(&token) {
                total += 1;
                if !palette_tokens.contains(&token) {
                    foreign += 1;
                }
            }
        }

        if total == 0 {
            0.0
        } else {
            foreign as f64 / total as f64
        }
    }

    /// Whether every scene mentions at least one token of the visual style.
    fn style_signature(&self, style: &StyleBible, scene_texts: &[(u8, String)]) -> (bool, Vec<u8>) {
        let signature = keywords(&style.visual_style, &self.rules.stopwords);
        if signature.is_empty() {
            return (true, Vec::new());
        }
        let unsigned: Vec<u8> = scene_texts
            .iter()
            .filter(|(_, text)| !signature.iter().any(|token| contains_term(text, token)))
            .map(|(n, _)| *n)
            .collect();
        (unsigned.is_empty(), unsigned)
    }
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}
