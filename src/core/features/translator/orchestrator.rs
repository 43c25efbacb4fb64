use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::client::TranslationClient;
use super::debounce::Debouncer;
use super::request::{RequestToken, RequestTracker};
use crate::core::history::HistoryCache;
use crate::core::languages;
use crate::shared::emit::EventSink;
use crate::shared::error::{AppError, AppResult};
use crate::shared::events::AppEvent;
use crate::shared::types::{TranslationRequest, TranslatorState, AUTO_DETECT};

/// Which side of the language pair a selection applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSlot {
    Source,
    Target,
}

/// Drives the live translation panel: debounces edits, streams the
/// translation into the state and files finished results in the history.
///
/// Cheap to clone; clones share the same state. Methods that schedule work
/// must be called from within a tokio runtime.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct StartedStream {
    token: RequestToken,
    request: TranslationRequest,
    snapshot: TranslatorState,
}

struct Inner {
    state: Mutex<TranslatorState>,
    debounce: Mutex<Debouncer>,
    requests: RequestTracker,
    client: Arc<dyn TranslationClient>,
    history: Arc<HistoryCache>,
    sink: Arc<dyn EventSink>,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn TranslationClient>,
        history: Arc<HistoryCache>,
        sink: Arc<dyn EventSink>,
        initial: TranslatorState,
        quiet_period: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(initial),
                debounce: Mutex::new(Debouncer::new(quiet_period)),
                requests: RequestTracker::new(),
                client,
                history,
                sink,
            }),
        }
    }

    pub fn state(&self) -> TranslatorState {
        self.lock_state().clone()
    }

    pub fn history(&self) -> &Arc<HistoryCache> {
        &self.inner.history
    }

    /// The user edited the input text
    pub fn on_input_change(&self, text: impl Into<String>) {
        let text = text.into();
        self.transition(move |state| {
            state.input = text;
            true
        });
    }

    /// The user picked a different source or target language
    pub fn on_language_change(&self, slot: LanguageSlot, code: &str) -> AppResult<()> {
        let lang = languages::find(code)
            .ok_or_else(|| AppError::Validation(format!("Unsupported language: {}", code)))?;
        if slot == LanguageSlot::Target && lang.code == AUTO_DETECT {
            return Err(AppError::Validation("Auto-detect is only valid as a source".to_string()));
        }

        self.transition(|state| {
            match slot {
                LanguageSlot::Source => state.source_lang = lang.code.to_string(),
                LanguageSlot::Target => state.target_lang = lang.code.to_string(),
            }
            state.detected_language = None;
            true
        });
        Ok(())
    }

    /// Exchange the language pair together with input and output.
    /// No-op while the source is auto-detect; returns whether it swapped.
    pub fn swap_languages(&self) -> bool {
        let swapped = self.transition(|state| {
            if !state.can_swap() {
                return false;
            }
            std::mem::swap(&mut state.source_lang, &mut state.target_lang);
            std::mem::swap(&mut state.input, &mut state.output);
            state.detected_language = None;
            true
        });
        if !swapped {
            tracing::debug!("Swap ignored while the source language is auto-detect");
        }
        swapped
    }

    /// Load a history entry back into the panel without re-translating it
    pub fn restore(&self, id: &str) -> bool {
        let Some(item) = self.inner.history.get(id) else {
            return false;
        };

        let mut debounce = self.lock_debounce();
        debounce.cancel();
        let snapshot = {
            let mut state = self.lock_state();
            self.inner.requests.invalidate();
            state.input = item.source_text;
            state.output = item.result.translated_text;
            state.source_lang = item.result.source_language;
            state.target_lang = item.result.target_language;
            state.detected_language = item.result.detected_language;
            state.is_translating = false;
            state.error = None;
            state.clone()
        };
        drop(debounce);

        self.publish(snapshot);
        true
    }

    pub fn clear_history(&self) {
        self.inner.history.clear();
        self.inner.sink.emit(AppEvent::HistoryUpdated(Vec::new()));
    }

    /// Apply a qualifying change, then restart the quiet period against the
    /// resulting input. `change` returns false to abort without side effects.
    fn transition(&self, change: impl FnOnce(&mut TranslatorState) -> bool) -> bool {
        // Debounce lock first: a timer that already woke must observe the cancel
        let mut debounce = self.lock_debounce();
        let snapshot = {
            let mut state = self.lock_state();
            if !change(&mut state) {
                return false;
            }
            debounce.cancel();
            self.inner.requests.invalidate();
            state.is_translating = false;
            if state.input.trim().is_empty() {
                state.output.clear();
                state.error = None;
                state.detected_language = None;
            }
            state.clone()
        };

        if !snapshot.input.trim().is_empty() {
            let this = self.clone();
            debounce.schedule(move |id| async move {
                // Same lock order as edits, so none can slip in before the request starts
                let started = {
                    let mut timer = this.lock_debounce();
                    if !timer.complete(id) {
                        return;
                    }
                    let mut state = this.lock_state();
                    if state.input.trim().is_empty() {
                        return;
                    }
                    let text = state.input.clone();
                    this.begin_stream(&mut state, text)
                };
                this.stream(started).await;
            });
            tracing::debug!(quiet_ms = debounce.period().as_millis() as u64, "Translation scheduled");
        }
        drop(debounce);

        self.publish(snapshot);
        true
    }

    /// Stream a translation of `text` with the current language pair.
    ///
    /// Supersedes any earlier request: from here on only this call may
    /// update the output, error and in-flight flag.
    pub async fn run_translation(&self, text: &str) {
        let started = {
            let mut state = self.lock_state();
            self.begin_stream(&mut state, text.to_string())
        };
        self.stream(started).await;
    }

    /// Mark the locked `state` in flight for `text` and issue its token
    fn begin_stream(&self, state: &mut TranslatorState, text: String) -> StartedStream {
        let token = self.inner.requests.begin();
        state.is_translating = true;
        state.output.clear();
        state.error = None;
        state.detected_language = None;
        let request = TranslationRequest::new(text, state.source_lang.clone(), state.target_lang.clone());
        StartedStream {
            token,
            request,
            snapshot: state.clone(),
        }
    }

    async fn stream(&self, started: StartedStream) {
        let StartedStream { token, request, snapshot } = started;
        self.publish(snapshot);
        tracing::info!(
            request = token.id(),
            source = %request.source_lang,
            target = %request.target_lang,
            "Translating"
        );

        let mut on_chunk = |chunk: &str| {
            self.update_if_current(&token, |state| state.output.push_str(chunk));
        };
        let outcome = self
            .inner
            .client
            .translate_stream(&request, &token, &mut on_chunk)
            .await;

        match outcome {
            Ok(translated) => {
                if self.finish(&token, None) {
                    self.record(&request, &translated);
                }
            }
            Err(e) => {
                self.finish(&token, Some(e));
            }
        }
    }

    /// Translate the current input right away through the structured call,
    /// which also reports the detected source language.
    pub async fn translate_once(&self) {
        let pending = {
            let mut debounce = self.lock_debounce();
            debounce.cancel();
            let mut state = self.lock_state();
            if state.input.trim().is_empty() {
                None
            } else {
                let token = self.inner.requests.begin();
                state.is_translating = true;
                state.error = None;
                let request =
                    TranslationRequest::new(state.input.clone(), state.source_lang.clone(), state.target_lang.clone());
                Some((token, request, state.clone()))
            }
        };
        let Some((token, request, snapshot)) = pending else {
            return;
        };
        self.publish(snapshot);

        match self.inner.client.translate(&request).await {
            Ok(result) => {
                let current = self.update_if_current(&token, |state| {
                    state.output = result.translated_text.clone();
                    state.detected_language = result.detected_language.clone();
                    state.is_translating = false;
                });
                if current && self.inner.history.record_result(&request.text, result) {
                    self.publish_history();
                }
            }
            Err(e) => {
                self.finish(&token, Some(e));
            }
        }
    }

    /// Settle a request: clear the in-flight flag and surface the error,
    /// unless it is a cancellation. Returns false for a superseded request.
    fn finish(&self, token: &RequestToken, error: Option<AppError>) -> bool {
        let current = self.update_if_current(token, |state| {
            state.is_translating = false;
            if let Some(e) = &error {
                if !e.is_cancelled() {
                    state.error = Some(user_message(e));
                }
            }
        });

        match &error {
            Some(e) if e.is_cancelled() => tracing::debug!(request = token.id(), "Translation cancelled"),
            Some(e) => tracing::warn!(request = token.id(), error = %e, "Translation failed"),
            None if !current => tracing::debug!(request = token.id(), "Discarding superseded translation"),
            None => {}
        }
        current
    }

    fn record(&self, request: &TranslationRequest, translated: &str) {
        if self
            .inner
            .history
            .record(&request.text, translated, &request.source_lang, &request.target_lang)
        {
            self.publish_history();
        }
    }

    /// Mutate the state only if `token` is still the latest request.
    /// The check and the write happen under the same lock as invalidation.
    fn update_if_current(&self, token: &RequestToken, update: impl FnOnce(&mut TranslatorState)) -> bool {
        let snapshot = {
            let mut state = self.lock_state();
            if !token.is_current() {
                return false;
            }
            update(&mut state);
            state.clone()
        };
        self.publish(snapshot);
        true
    }

    fn publish(&self, snapshot: TranslatorState) {
        self.inner.sink.emit(AppEvent::TranslationUpdated(snapshot));
    }

    fn publish_history(&self) {
        self.inner.sink.emit(AppEvent::HistoryUpdated(self.inner.history.items()));
    }

    fn lock_state(&self) -> MutexGuard<'_, TranslatorState> {
        self.inner.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_debounce(&self) -> MutexGuard<'_, Debouncer> {
        self.inner.debounce.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn user_message(error: &AppError) -> String {
    match error {
        AppError::Api { status: 401 | 403, .. } => "Translation failed: the API key was rejected.".to_string(),
        AppError::Network(_) => "Translation failed: could not reach the translation service.".to_string(),
        other => format!("Translation failed: {}", other),
    }
}
