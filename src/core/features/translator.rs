//! Live translator feature
//!
//! Edits are debounced into streaming translation calls; each call carries a
//! request token so that a superseded stream can never write to the panel.

pub mod client;
pub mod debounce;
pub mod orchestrator;
pub mod request;

pub use client::{GeminiTranslator, TranslationClient};
pub use orchestrator::{LanguageSlot, Orchestrator};
