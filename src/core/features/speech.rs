//! Read-aloud of the input or the translation.
//!
//! Speech is best effort: every failure is logged and swallowed, and a
//! started playback always runs to completion.

pub mod client;
pub mod pcm;
pub mod player;

use std::sync::Arc;

use crate::core::languages;
use crate::shared::error::AppResult;
use crate::shared::types::AUTO_DETECT;

pub use client::{GeminiSpeech, SpeechSynthesizer};
pub use pcm::PcmBuffer;
pub use player::{default_output, AudioOutput};

/// Told to the voice when the language of the text is unknown
pub const OWN_LANGUAGE: &str = "the language the text is written in";

pub struct SpeechService {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    output: Arc<dyn AudioOutput>,
}

impl SpeechService {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, output: Arc<dyn AudioOutput>) -> Self {
        Self { synthesizer, output }
    }

    /// Speak `text` in the language called `language_name`. Never fails.
    pub async fn speak(&self, text: &str, language_name: &str) {
        if text.trim().is_empty() {
            tracing::debug!("Nothing to speak");
            return;
        }
        if let Err(e) = self.try_speak(text, language_name).await {
            tracing::warn!(error = %e, language = language_name, "Speech failed");
        }
    }

    async fn try_speak(&self, text: &str, language_name: &str) -> AppResult<()> {
        let payload = self.synthesizer.synthesize(text, language_name).await?;
        let buffer = pcm::decode(&payload)?;
        tracing::info!(
            language = language_name,
            millis = buffer.duration().as_millis() as u64,
            "Playing speech"
        );
        self.output.play(buffer).await
    }
}

/// Language name to speak a text in, given its language code. For the
/// auto-detect sentinel the detected language is used when there is one.
pub fn spoken_language(code: &str, detected: Option<&str>) -> &'static str {
    let resolved = if code == AUTO_DETECT {
        detected.and_then(languages::resolve)
    } else {
        languages::resolve(code)
    };
    resolved
        .filter(|lang| lang.code != AUTO_DETECT)
        .map(|lang| lang.name)
        .unwrap_or(OWN_LANGUAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::AppError;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::sync::Mutex;

    struct FixedSynthesizer {
        reply: AppResult<String>,
        requests: Mutex<Vec<(String, String)>>,
    }

    impl FixedSynthesizer {
        fn new(reply: AppResult<String>) -> Arc<Self> {
            Arc::new(Self { reply, requests: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for FixedSynthesizer {
        async fn synthesize(&self, text: &str, language_name: &str) -> AppResult<String> {
            self.requests
                .lock()
                .unwrap()
                .push((text.to_string(), language_name.to_string()));
            self.reply.clone()
        }
    }

    #[derive(Default)]
    struct CapturingOutput {
        played: Mutex<Vec<PcmBuffer>>,
        fail: bool,
    }

    #[async_trait]
    impl AudioOutput for CapturingOutput {
        async fn play(&self, buffer: PcmBuffer) -> AppResult<()> {
            self.played.lock().unwrap().push(buffer);
            if self.fail {
                return Err(AppError::Audio("device unplugged".into()));
            }
            Ok(())
        }
    }

    fn payload(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        STANDARD.encode(bytes)
    }

    #[tokio::test]
    async fn speaks_decoded_audio() {
        let synth = FixedSynthesizer::new(Ok(payload(&[0, 16384])));
        let output = Arc::new(CapturingOutput::default());
        let service = SpeechService::new(synth.clone(), output.clone());

        service.speak("Hola", "Spanish").await;

        assert_eq!(
            synth.requests.lock().unwrap().as_slice(),
            &[("Hola".to_string(), "Spanish".to_string())]
        );
        let played = output.played.lock().unwrap();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].samples, vec![0.0, 0.5]);
        assert_eq!(played[0].sample_rate, 24_000);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let output = Arc::new(CapturingOutput::default());

        let failing = SpeechService::new(
            FixedSynthesizer::new(Err(AppError::Network("offline".into()))),
            output.clone(),
        );
        failing.speak("Hola", "Spanish").await;

        let garbled = SpeechService::new(FixedSynthesizer::new(Ok("%%%".into())), output.clone());
        garbled.speak("Hola", "Spanish").await;

        assert!(output.played.lock().unwrap().is_empty());

        let broken_device = Arc::new(CapturingOutput { fail: true, ..CapturingOutput::default() });
        let service = SpeechService::new(FixedSynthesizer::new(Ok(payload(&[1]))), broken_device.clone());
        service.speak("Hola", "Spanish").await;
        assert_eq!(broken_device.played.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_text_is_not_sent() {
        let synth = FixedSynthesizer::new(Ok(payload(&[1])));
        let service = SpeechService::new(synth.clone(), Arc::new(CapturingOutput::default()));
        service.speak("  \n", "Spanish").await;
        assert!(synth.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn spoken_language_prefers_detection_for_auto() {
        assert_eq!(spoken_language("es", None), "Spanish");
        assert_eq!(spoken_language("auto", Some("fr")), "French");
        assert_eq!(spoken_language("auto", None), OWN_LANGUAGE);
        assert_eq!(spoken_language("auto", Some("??")), OWN_LANGUAGE);
    }
}
