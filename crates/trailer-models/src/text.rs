//! Subtitle text wrapping.

/// Wrap text into lines of at most `max_chars` characters.
///
/// Breaks on whitespace; words longer than a line are split by character.
/// Character counts are Unicode scalar values, so Hangul counts one per syllable.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(max_chars) {
                if chunk.len() == max_chars {
                    lines.push(chunk.iter().collect());
                } else {
                    current = chunk.iter().collect();
                    current_len = chunk.len();
                }
            }
            continue;
        }

        let needed = if current_len == 0 { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            if current_len > 0 {
                current.push(' ');
            }
            current.push_str(word);
            current_len = needed;
        }
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Wrap text to at most `max_lines` lines joined by `\n`.
///
/// Overflowing text is cut and the last line ends with an ellipsis.
pub fn fit_subtitle(text: &str, max_chars: usize, max_lines: usize) -> String {
    let mut lines = wrap_text(text, max_chars);
    let max_lines = max_lines.max(1);

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            let keep = max_chars.saturating_sub(1);
            let mut truncated: String = last.chars().take(keep).collect();
            truncated = truncated.trim_end().to_string();
            truncated.push('…');
            *last = truncated;
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_on_words() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 15);
        assert_eq!(lines, vec!["the quick brown", "fox jumps over", "the lazy dog"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 15));
    }

    #[test]
    fn test_wrap_hangul_by_scalar_count() {
        let lines = wrap_text("사막에 불시착한 비행사는 작은 왕자를 만난다", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "사막에 불시착한 비행사는 작은 왕자를 만난다");
    }

    #[test]
    fn test_overlong_word_is_split() {
        let lines = wrap_text("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_fit_truncates_with_ellipsis() {
        let fitted = fit_subtitle(&"word ".repeat(40), 12, 2);
        let lines: Vec<&str> = fitted.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with('…'));
        assert!(lines.iter().all(|l| l.chars().count() <= 12));
    }
}
