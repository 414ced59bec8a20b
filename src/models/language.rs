//! Display language used for seeded reference data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported display languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English.
    #[default]
    En,
    /// Spanish.
    Es,
    /// French.
    Fr,
    /// German.
    De,
}

impl Language {
    /// Returns all supported languages.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::En, Self::Es, Self::Fr, Self::De]
    }

    /// Returns the ISO 639-1 code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
        }
    }

    /// Parses a language code or tag (`es`, `es-MX`, `Spanish`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        let code = lower.split(['-', '_']).next().unwrap_or_default();
        match code {
            "en" | "english" => Some(Self::En),
            "es" | "spanish" | "español" => Some(Self::Es),
            "fr" | "french" | "français" => Some(Self::Fr),
            "de" | "german" | "deutsch" => Some(Self::De),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(Language::parse("es-MX"), Some(Language::Es));
        assert_eq!(Language::parse("FR"), Some(Language::Fr));
        assert_eq!(Language::parse("de_DE"), Some(Language::De));
        assert_eq!(Language::parse("English"), Some(Language::En));
        assert_eq!(Language::parse("xx"), None);
    }
}
