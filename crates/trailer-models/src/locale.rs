//! Supported output locales.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output locale of a trailer (narration, subtitles, typography rules).
///
/// Only two locales are handled; anything else is rejected at parse time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Korean (default kiosk locale)
    #[default]
    Ko,
    /// English
    En,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Ko => "ko",
            Locale::En => "en",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase();

        match primary.as_str() {
            "ko" | "kor" | "korean" => Ok(Locale::Ko),
            "en" | "eng" | "english" => Ok(Locale::En),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_parsing() {
        assert_eq!("ko".parse::<Locale>().unwrap(), Locale::Ko);
        assert_eq!("ko-KR".parse::<Locale>().unwrap(), Locale::Ko);
        assert_eq!("en_US".parse::<Locale>().unwrap(), Locale::En);
        assert_eq!("ENG".parse::<Locale>().unwrap(), Locale::En);
        assert!("ja".parse::<Locale>().is_err());
    }

    #[test]
    fn test_locale_serde() {
        let json = serde_json::to_string(&Locale::En).unwrap();
        assert_eq!(json, "\"en\"");
        let parsed: Locale = serde_json::from_str("\"ko\"").unwrap();
        assert_eq!(parsed, Locale::Ko);
    }
}
