use async_trait::async_trait;

use crate::core::gemini::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, SpeechConfig};
use crate::core::gemini::GeminiHttp;
use crate::shared::error::{AppError, AppResult};

/// Remote text-to-speech service
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns the base64 encoded PCM payload for `text` spoken in `language_name`
    async fn synthesize(&self, text: &str, language_name: &str) -> AppResult<String>;
}

/// Speech through a Gemini TTS model with a prebuilt voice
pub struct GeminiSpeech {
    http: GeminiHttp,
    model: String,
    voice: String,
}

impl GeminiSpeech {
    pub fn new(http: GeminiHttp, model: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            http,
            model: model.into(),
            voice: voice.into(),
        }
    }

    fn speech_request(&self, text: &str, language_name: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user_text(format!("Say in {}: {}", language_name, text))],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig::prebuilt(self.voice.clone())),
                ..GenerationConfig::default()
            }),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiSpeech {
    async fn synthesize(&self, text: &str, language_name: &str) -> AppResult<String> {
        let body = self.speech_request(text, language_name);
        let response = self.http.generate(&self.model, &body).await?;
        audio_payload(&response)
    }
}

fn audio_payload(response: &GenerateContentResponse) -> AppResult<String> {
    response
        .inline_data()
        .map(|inline| inline.data.clone())
        .filter(|data| !data.is_empty())
        .ok_or_else(|| AppError::Audio("No audio returned".to_string()))
}
