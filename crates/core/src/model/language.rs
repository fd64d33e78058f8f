use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LanguageError {
    /// Carries the normalized (lower-cased) code that was rejected.
    #[error("Invalid target language: {0}")]
    Unsupported(String),
}

//
// ─── LANGUAGE ──────────────────────────────────────────────────────────────────
//

/// A target language records can be localized into.
///
/// The variant set is the allow-list: anything that does not parse into a
/// `Language` is rejected before a listing reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Fr,
    Es,
    De,
    Zh,
    Ar,
    Hi,
    En,
}

impl Language {
    /// Every supported language, in allow-list order.
    pub const ALL: [Language; 7] = [
        Language::Fr,
        Language::Es,
        Language::De,
        Language::Zh,
        Language::Ar,
        Language::Hi,
        Language::En,
    ];

    /// Language records are written in; listing in it needs no translation.
    pub const SOURCE: Language = Language::En;

    /// ISO 639-1 code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::Es => "es",
            Language::De => "de",
            Language::Zh => "zh",
            Language::Ar => "ar",
            Language::Hi => "hi",
            Language::En => "en",
        }
    }

    #[must_use]
    pub fn is_source(self) -> bool {
        self == Self::SOURCE
    }

    /// Languages that need a stored translation.
    pub fn translated() -> impl Iterator<Item = Language> {
        Self::ALL.into_iter().filter(|l| !l.is_source())
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::SOURCE
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = LanguageError;

    /// Parses a code case-insensitively (`"FR"` and `"fr"` are the same).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == normalized)
            .ok_or(LanguageError::Unsupported(normalized))
    }
}
