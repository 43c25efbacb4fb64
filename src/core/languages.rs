//! Language registry
//!
//! Static table of the languages offered for source and target selection.

use crate::shared::types::{Language, AUTO_DETECT};

const AUTO: Language = Language { code: AUTO_DETECT, name: "Detect language" };

const LANGUAGES: &[Language] = &[
    Language { code: "en", name: "English" },
    Language { code: "es", name: "Spanish" },
    Language { code: "fr", name: "French" },
    Language { code: "de", name: "German" },
    Language { code: "it", name: "Italian" },
    Language { code: "pt", name: "Portuguese" },
    Language { code: "nl", name: "Dutch" },
    Language { code: "ru", name: "Russian" },
    Language { code: "zh", name: "Chinese" },
    Language { code: "ja", name: "Japanese" },
    Language { code: "ko", name: "Korean" },
    Language { code: "ar", name: "Arabic" },
    Language { code: "hi", name: "Hindi" },
    Language { code: "bn", name: "Bengali" },
    Language { code: "tr", name: "Turkish" },
    Language { code: "pl", name: "Polish" },
    Language { code: "uk", name: "Ukrainian" },
    Language { code: "vi", name: "Vietnamese" },
    Language { code: "th", name: "Thai" },
    Language { code: "id", name: "Indonesian" },
    Language { code: "sv", name: "Swedish" },
    Language { code: "el", name: "Greek" },
    Language { code: "he", name: "Hebrew" },
    Language { code: "fa", name: "Persian" },
];

/// Languages valid as a translation source, auto-detect first
pub fn source_languages() -> Vec<Language> {
    std::iter::once(AUTO).chain(LANGUAGES.iter().copied()).collect()
}

pub fn target_languages() -> &'static [Language] {
    LANGUAGES
}

/// Exact registry lookup, including the auto-detect sentinel
pub fn find(code: &str) -> Option<Language> {
    if code == AUTO_DETECT {
        return Some(AUTO);
    }
    LANGUAGES.iter().copied().find(|lang| lang.code == code)
}

/// Display name for a code, falling back to the code itself
pub fn display_name(code: &str) -> &str {
    match find(code) {
        Some(lang) => lang.name,
        None => code,
    }
}

/// Lenient lookup for user-typed values.
///
/// Accepts registry codes, ISO 639-3 codes ("spa") and English names
/// ("spanish"), case-insensitively.
pub fn resolve(input: &str) -> Option<Language> {
    let needle = input.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return None;
    }
    if let Some(lang) = find(&needle) {
        return Some(lang);
    }
    if let Some(code) = isolang::Language::from_639_3(&needle).and_then(|lang| lang.to_639_1()) {
        if let Some(lang) = find(code) {
            return Some(lang);
        }
    }
    source_languages()
        .into_iter()
        .find(|lang| lang.name.eq_ignore_ascii_case(&needle))
}
