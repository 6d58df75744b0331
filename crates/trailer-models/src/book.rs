//! Grounded book facts.

use serde::{Deserialize, Serialize};

/// A main character of the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    /// Narrative role (protagonist, companion, antagonist, ...)
    pub role: String,
    /// Visual appearance, reused verbatim in every image prompt
    pub appearance: String,
    pub personality: String,
}

impl Character {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        appearance: impl Into<String>,
        personality: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            appearance: appearance.into(),
            personality: personality.into(),
        }
    }
}

/// One of the three ordered plot beats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotBeat {
    pub event: String,
    /// Emotional tone of the beat (curious, tense, hopeful, ...)
    pub tone: String,
}

impl PlotBeat {
    pub fn new(event: impl Into<String>, tone: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            tone: tone.into(),
        }
    }
}

/// Canonical, structured description of a book.
///
/// Created once per job by grounding and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookFacts {
    pub canonical_title: String,
    pub author: Option<String>,
    /// One-paragraph logline
    pub logline: String,
    /// 1-3 main characters
    pub characters: Vec<Character>,
    /// Exactly 3 ordered beats
    pub plot_beats: Vec<PlotBeat>,
    pub setting: String,
    pub themes: Vec<String>,
    pub target_audience: String,
    /// Confidence in the grounding source, in [0, 1]
    pub confidence: f64,
    /// Where the facts came from (`catalog:<id>`, `offline:<id>`, `minimal`)
    pub source: String,
}

impl BookFacts {
    /// The character every scene is anchored on.
    pub fn protagonist(&self) -> Option<&Character> {
        self.characters
            .iter()
            .find(|c| c.role.eq_ignore_ascii_case("protagonist"))
            .or_else(|| self.characters.first())
    }

    /// Whether the book is aimed at children.
    pub fn is_for_children(&self) -> bool {
        let audience = self.target_audience.to_lowercase();
        audience.contains("child") || audience.contains("kid") || audience.contains("어린이")
    }

    /// Whether any theme contains one of the given keywords.
    pub fn has_theme(&self, keywords: &[&str]) -> bool {
        self.themes.iter().any(|theme| {
            let theme = theme.to_lowercase();
            keywords.iter().any(|k| theme.contains(k))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> BookFacts {
        BookFacts {
            canonical_title: "Peter Pan".into(),
            author: Some("J. M. Barrie".into()),
            logline: "A boy who never grows up.".into(),
            characters: vec![
                Character::new("Wendy", "companion", "blue nightgown", "caring"),
                Character::new("Peter", "protagonist", "green tunic", "playful"),
            ],
            plot_beats: vec![],
            setting: "Neverland".into(),
            themes: vec!["Adventure".into(), "Childhood".into()],
            target_audience: "children".into(),
            confidence: 0.9,
            source: "offline:peter-pan".into(),
        }
    }

    #[test]
    fn test_protagonist_prefers_role() {
        assert_eq!(facts().protagonist().unwrap().name, "Peter");
    }

    #[test]
    fn test_theme_and_audience() {
        let facts = facts();
        assert!(facts.is_for_children());
        assert!(facts.has_theme(&["adventure"]));
        assert!(!facts.has_theme(&["mystery"]));
    }
}
