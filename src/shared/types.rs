use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Source-language value asking the model to identify the language itself
pub const AUTO_DETECT: &str = "auto";

/// A selectable language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

/// Parameters of one translation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, source_lang: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }

    pub fn is_auto_detect(&self) -> bool {
        self.source_lang == AUTO_DETECT
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub translated_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
    pub source_language: String,
    pub target_language: String,
}

/// A completed translation kept in the local history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source_text: String,
    #[serde(flatten)]
    pub result: TranslationResult,
}

impl HistoryItem {
    /// Create a new entry stamped with a fresh id and the current time
    pub fn new(source_text: String, result: TranslationResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            // Stored with millisecond precision
            timestamp: Utc::now().trunc_subsecs(3),
            source_text,
            result,
        }
    }

    pub fn translated_text(&self) -> &str {
        &self.result.translated_text
    }
}

/// Everything the front-end renders for the live translation panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatorState {
    pub input: String,
    pub output: String,
    pub is_translating: bool,
    pub error: Option<String>,
    pub source_lang: String,
    pub target_lang: String,
    pub detected_language: Option<String>,
}

impl TranslatorState {
    pub fn new(source_lang: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            input: String::new(),
            output: String::new(),
            is_translating: false,
            error: None,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            detected_language: None,
        }
    }

    /// Swapping needs a concrete source language
    pub fn can_swap(&self) -> bool {
        self.source_lang != AUTO_DETECT
    }
}
