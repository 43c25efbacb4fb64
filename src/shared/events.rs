use serde::Serialize;

use super::types::{HistoryItem, TranslatorState};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload")] // Tagged enum for easier front-end parsing
pub enum AppEvent {
    #[serde(rename = "translation://updated")]
    TranslationUpdated(TranslatorState),

    #[serde(rename = "history://updated")]
    HistoryUpdated(Vec<HistoryItem>),
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::TranslationUpdated(_) => "translation://updated",
            AppEvent::HistoryUpdated(_) => "history://updated",
        }
    }
}
