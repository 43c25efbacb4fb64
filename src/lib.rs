pub mod api;
pub mod core;
pub mod shared;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::console::Console;
use crate::core::features::speech::{default_output, GeminiSpeech, SpeechService};
use crate::core::features::translator::{GeminiTranslator, Orchestrator};
use crate::core::gemini::GeminiHttp;
use crate::core::history::storage::{KeyValueStore, MemoryStore, RedbStore};
use crate::core::history::HistoryCache;
use crate::core::languages;
use crate::shared::emit::ChannelSink;
use crate::shared::settings::{self, AppSettings, UserPreferences};
use crate::shared::types::{TranslatorState, AUTO_DETECT};
use crate::shared::AppResult;

/// Start the translator console and block until it exits
pub async fn run() -> AppResult<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = AppSettings::load().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load settings, using defaults");
        AppSettings::default()
    });
    let api_key = settings::api_key()?;

    let history = Arc::new(HistoryCache::load(open_store()));
    tracing::info!(entries = history.len(), "History loaded");

    let http = GeminiHttp::new(api_key, &settings.api)?;
    let translator = GeminiTranslator::new(
        http.clone(),
        settings.api.translation_model.clone(),
        settings.api.temperature,
    );
    let speech = SpeechService::new(
        Arc::new(GeminiSpeech::new(http, settings.api.speech_model.clone(), settings.api.voice.clone())),
        default_output(),
    );

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let orchestrator = Orchestrator::new(
        Arc::new(translator),
        history,
        Arc::new(ChannelSink::new(tx)),
        initial_state(&settings.preferences),
        settings.preferences.debounce(),
    );

    Console::new(orchestrator, Arc::new(speech)).run(rx).await
}

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "live_translator_lib=info".into()),
        )
        .try_init();
}

/// History database in the data directory, or an in-memory store when it
/// cannot be opened
fn open_store() -> Arc<dyn KeyValueStore> {
    let opened = settings::project_dirs()
        .and_then(|dirs| RedbStore::open(&dirs.data_dir().join("local_storage.redb")));

    match opened {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "History will not be persisted");
            Arc::new(MemoryStore::new())
        }
    }
}

fn initial_state(preferences: &UserPreferences) -> TranslatorState {
    let source = languages::find(&preferences.default_source_lang)
        .map(|lang| lang.code)
        .unwrap_or_else(|| {
            tracing::warn!(code = %preferences.default_source_lang, "Unknown default source language");
            AUTO_DETECT
        });
    let target = languages::find(&preferences.default_target_lang)
        .filter(|lang| languages::target_languages().contains(lang))
        .map(|lang| lang.code)
        .unwrap_or_else(|| {
            tracing::warn!(code = %preferences.default_target_lang, "Unknown default target language");
            "es"
        });
    TranslatorState::new(source, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_follows_preferences() {
        let preferences = UserPreferences {
            default_source_lang: "de".into(),
            default_target_lang: "fr".into(),
            ..UserPreferences::default()
        };
        let state = initial_state(&preferences);
        assert_eq!((state.source_lang.as_str(), state.target_lang.as_str()), ("de", "fr"));
    }

    #[test]
    fn invalid_preferences_fall_back() {
        let preferences = UserPreferences {
            default_source_lang: "klingon".into(),
            default_target_lang: "auto".into(),
            ..UserPreferences::default()
        };
        let state = initial_state(&preferences);
        assert_eq!((state.source_lang.as_str(), state.target_lang.as_str()), ("auto", "es"));
    }
}
