//! Translation history
//!
//! Keeps the last few completed translations, most recent first, and mirrors
//! them into local key-value storage under a single key.
//!
//! - `bounded`: capacity-capped list with prepend-then-truncate semantics
//! - `storage`: the key-value persistence collaborator (redb or in-memory)

pub mod bounded;
pub mod storage;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::shared::error::AppError;
use crate::shared::types::{HistoryItem, TranslationResult};
use bounded::BoundedList;
use storage::KeyValueStore;

/// Maximum number of translations kept
pub const MAX_HISTORY_SIZE: usize = 10;

/// Key of the persisted JSON array
pub const HISTORY_KEY: &str = "translation_history";

/// History cache; sole owner of the persisted copy
pub struct HistoryCache {
    items: Mutex<BoundedList<HistoryItem>>,
    store: Arc<dyn KeyValueStore>,
}

impl HistoryCache {
    /// Read the persisted list. Missing or unreadable data yields an empty history.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let items = match store.get(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryItem>>(&raw) {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(error = %e, "Stored history is corrupted; starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored history; starting empty");
                Vec::new()
            }
        };
        tracing::debug!(count = items.len(), "History loaded");

        Self {
            items: Mutex::new(BoundedList::from_vec(items, MAX_HISTORY_SIZE)),
            store,
        }
    }

    /// Record a completed translation.
    ///
    /// Skipped when either text is blank, or when the translation matches the
    /// current head entry (only the head is compared). Returns whether an
    /// entry was added.
    pub fn record(&self, source_text: &str, translated_text: &str, source_lang: &str, target_lang: &str) -> bool {
        self.record_result(
            source_text,
            TranslationResult {
                translated_text: translated_text.to_string(),
                detected_language: None,
                source_language: source_lang.to_string(),
                target_language: target_lang.to_string(),
            },
        )
    }

    /// Same as [`record`](Self::record) for a result that may carry a detected language
    pub fn record_result(&self, source_text: &str, result: TranslationResult) -> bool {
        if source_text.trim().is_empty() || result.translated_text.trim().is_empty() {
            return false;
        }

        let mut items = self.lock();
        if items
            .head()
            .is_some_and(|head| head.translated_text() == result.translated_text)
        {
            tracing::debug!("Skipping duplicate of the latest history entry");
            return false;
        }

        let item = HistoryItem::new(source_text.to_string(), result);
        tracing::debug!(id = %item.id, "Recording history entry");
        items.prepend(item);
        self.persist(&items);
        true
    }

    /// Drop every entry and the persisted copy
    pub fn clear(&self) {
        let mut items = self.lock();
        items.clear();
        if let Err(e) = self.store.remove(HISTORY_KEY) {
            tracing::warn!(error = %e, "Failed to remove stored history");
        }
    }

    pub fn items(&self) -> Vec<HistoryItem> {
        self.lock().as_slice().to_vec()
    }

    pub fn get(&self, id: &str) -> Option<HistoryItem> {
        self.lock().iter().find(|item| item.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn persist(&self, items: &BoundedList<HistoryItem>) {
        let result = serde_json::to_string(items)
            .map_err(AppError::from)
            .and_then(|json| self.store.set(HISTORY_KEY, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist history");
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoundedList<HistoryItem>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::storage::MemoryStore;
    use super::*;

    fn empty_cache() -> (HistoryCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (HistoryCache::load(store.clone()), store)
    }

    fn stored(store: &MemoryStore) -> Vec<HistoryItem> {
        store
            .get(HISTORY_KEY)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
            .unwrap_or_default()
    }

    #[test]
    fn records_most_recent_first_and_persists() {
        let (history, store) = empty_cache();

        assert!(history.record("Hello", "Hola", "auto", "es"));
        assert!(history.record("Cat", "Gato", "en", "es"));

        let items = history.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].translated_text(), "Gato");
        assert_eq!(items[1].translated_text(), "Hola");
        assert_eq!(items[1].result.source_language, "auto");
        assert_eq!(items[1].result.target_language, "es");
        assert_ne!(items[0].id, items[1].id);
        assert_eq!(stored(&store), items);
    }

    #[test]
    fn never_exceeds_capacity_and_evicts_oldest() {
        let (history, store) = empty_cache();

        for i in 0..25 {
            history.record(&format!("source {}", i), &format!("target {}", i), "en", "fr");
        }

        let items = history.items();
        assert_eq!(items.len(), MAX_HISTORY_SIZE);
        assert_eq!(items[0].translated_text(), "target 24");
        assert_eq!(items[MAX_HISTORY_SIZE - 1].translated_text(), "target 15");
        assert_eq!(stored(&store).len(), MAX_HISTORY_SIZE);
    }

    #[test]
    fn blank_input_or_output_is_ignored() {
        let (history, store) = empty_cache();

        assert!(!history.record("", "Hola", "auto", "es"));
        assert!(!history.record("Hello", "   ", "auto", "es"));
        assert!(!history.record(" \n", "", "auto", "es"));

        assert!(history.is_empty());
        assert_eq!(store.get(HISTORY_KEY).unwrap(), None);
    }

    #[test]
    fn only_the_head_is_deduplicated() {
        let (history, _store) = empty_cache();

        assert!(history.record("Hello", "Hola", "en", "es"));
        assert!(!history.record("Hello!", "Hola", "en", "es"));
        assert_eq!(history.len(), 1);

        assert!(history.record("Bye", "Adios", "en", "es"));
        assert!(history.record("Hello", "Hola", "en", "es"));

        let texts: Vec<_> = history.items().iter().map(|i| i.translated_text().to_string()).collect();
        assert_eq!(texts, vec!["Hola", "Adios", "Hola"]);
    }

    #[test]
    fn clear_removes_the_persisted_copy() {
        let (history, store) = empty_cache();
        history.record("Hello", "Hola", "en", "es");

        history.clear();

        assert!(history.is_empty());
        assert_eq!(store.get(HISTORY_KEY).unwrap(), None);
    }

    #[test]
    fn load_restores_stored_entries_in_order() {
        let store = Arc::new(MemoryStore::new());
        let raw = r#"[
            {"id":"3","timestamp":1700000003000,"translatedText":"tres","sourceLanguage":"en","targetLanguage":"es","sourceText":"three"},
            {"id":"2","timestamp":1700000002000,"translatedText":"deux","detectedLanguage":"en","sourceLanguage":"auto","targetLanguage":"fr"},
            {"id":"1","timestamp":1700000001000,"translatedText":"eins","sourceLanguage":"en","targetLanguage":"de"}
        ]"#;
        store.set(HISTORY_KEY, raw).unwrap();

        let history = HistoryCache::load(store);

        let ids: Vec<_> = history.items().iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
        assert_eq!(history.get("2").unwrap().result.detected_language.as_deref(), Some("en"));
        assert_eq!(history.get("3").unwrap().source_text, "three");
    }

    #[test]
    fn reload_reproduces_the_session_list() {
        let (history, store) = empty_cache();
        history.record("Hello", "Hola", "auto", "es");
        history.record("Good night", "Buenas noches", "en", "es");

        let reloaded = HistoryCache::load(store);
        assert_eq!(reloaded.items(), history.items());
    }

    #[test]
    fn corrupted_store_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(HISTORY_KEY, "{not json").unwrap();

        let history = HistoryCache::load(store.clone());
        assert!(history.is_empty());

        // A later record overwrites the corrupted value
        history.record("Hello", "Hola", "en", "es");
        assert_eq!(stored(&store).len(), 1);
    }
}
