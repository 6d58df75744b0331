//! WebVTT subtitle generation.
//!
//! One cue per scene, each exactly one scene long, laid out back to back in
//! scene order.

use std::time::Duration;

use trailer_models::text::fit_subtitle;
use trailer_models::SceneScript;

/// One subtitle cue.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    /// Voice tag, when a character speaks
    pub speaker: Option<String>,
    /// Cue text, already wrapped
    pub text: String,
}

/// Builds WebVTT documents from scene scripts.
#[derive(Debug, Clone)]
pub struct WebVttBuilder {
    scene_duration: Duration,
    max_chars_per_line: usize,
    max_lines: usize,
}

impl Default for WebVttBuilder {
    fn default() -> Self {
        Self::new(8)
    }
}

impl WebVttBuilder {
    pub fn new(scene_duration_secs: u32) -> Self {
        Self {
            scene_duration: Duration::from_secs(u64::from(scene_duration_secs)),
            max_chars_per_line: 40,
            max_lines: 2,
        }
    }

    pub fn with_line_limits(mut self, max_chars_per_line: usize, max_lines: usize) -> Self {
        self.max_chars_per_line = max_chars_per_line;
        self.max_lines = max_lines;
        self
    }

    /// Cues for the given scenes, ordered by scene number.
    pub fn cues(&self, scripts: &[SceneScript]) -> Vec<SubtitleCue> {
        let mut ordered: Vec<&SceneScript> = scripts.iter().collect();
        ordered.sort_by_key(|s| s.scene_number);

        ordered
            .into_iter()
            .enumerate()
            .map(|(i, script)| SubtitleCue {
                index: i + 1,
                start: self.scene_duration * i as u32,
                end: self.scene_duration * (i as u32 + 1),
                speaker: script
                    .character_name
                    .as_ref()
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty()),
                text: fit_subtitle(&script.narration, self.max_chars_per_line, self.max_lines),
            })
            .collect()
    }

    /// Render a complete WebVTT document.
    pub fn build(&self, scripts: &[SceneScript]) -> String {
        let mut out = String::from("WEBVTT\n");
        for cue in self.cues(scripts) {
            out.push('\n');
            out.push_str(&cue.index.to_string());
            out.push('\n');
            out.push_str(&format!(
                "{} --> {}\n",
                format_timestamp(cue.start),
                format_timestamp(cue.end)
            ));
            if let Some(speaker) = &cue.speaker {
                out.push_str(&format!("<v {}>", escape_cue_text(speaker)));
            }
            out.push_str(&escape_cue_text(&cue.text));
            out.push('\n');
        }
        out
    }
}

/// Format a duration as `HH:MM:SS.mmm`.
pub fn format_timestamp(d: Duration) -> String {
    let total_ms = d.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

fn escape_cue_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailer_models::SceneType;

    fn script(n: u8, narration: &str, speaker: Option<&str>) -> SceneScript {
        SceneScript {
            scene_number: n,
            scene_type: SceneType::for_scene(n),
            narration: narration.to_string(),
            dialogue: None,
            character_name: speaker.map(str::to_string),
            visual_description: String::new(),
            keyframe_prompt: "k".into(),
            video_prompt: "v".into(),
        }
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_timestamp(Duration::from_secs(0)), "00:00:00.000");
        assert_eq!(format_timestamp(Duration::from_secs(24)), "00:00:24.000");
        assert_eq!(format_timestamp(Duration::from_millis(3_723_450)), "01:02:03.450");
    }

    #[test]
    fn test_three_scenes_span_24_seconds() {
        let scripts = vec![
            script(3, "Third", None),
            script(1, "First", Some("Little Prince")),
            script(2, "Second", None),
        ];
        let vtt = WebVttBuilder::new(8).build(&scripts);

        assert!(vtt.starts_with("WEBVTT\n"));
        assert_eq!(vtt.matches(" --> ").count(), 3);
        assert!(vtt.contains("00:00:00.000 --> 00:00:08.000\n<v Little Prince>First"));
        assert!(vtt.contains("00:00:08.000 --> 00:00:16.000\nSecond"));
        assert!(vtt.contains("00:00:16.000 --> 00:00:24.000\nThird"));
    }

    #[test]
    fn test_partial_scenes_are_packed_back_to_back() {
        let cues = WebVttBuilder::new(8).cues(&[script(1, "a", None), script(3, "c", None)]);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[1].start, Duration::from_secs(8));
        assert_eq!(cues[1].end, Duration::from_secs(16));
        assert_eq!(cues[1].text, "c");
    }

    #[test]
    fn test_long_narration_is_wrapped() {
        let narration = "A pilot stranded in the desert meets a small prince who fell from a distant star";
        let cues = WebVttBuilder::new(8)
            .with_line_limits(40, 2)
            .cues(&[script(1, narration, None)]);
        let lines: Vec<&str> = cues[0].text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.chars().count() <= 40));
    }

    #[test]
    fn test_markup_is_escaped() {
        let vtt = WebVttBuilder::default().build(&[script(1, "Tom & <Jerry>", None)]);
        assert!(vtt.contains("Tom &amp; &lt;Jerry&gt;"));
    }
}
