use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;

use super::request::RequestToken;
use crate::core::gemini::sse::SseDecoder;
use crate::core::gemini::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use crate::core::gemini::GeminiHttp;
use crate::core::languages;
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::{TranslationRequest, TranslationResult};

/// Remote translation service
#[async_trait]
pub trait TranslationClient: Send + Sync {
    /// Stream a translation, calling `on_chunk` for every fragment as it
    /// arrives. Returns the full text once the stream ends, or
    /// [`AppError::Cancelled`] when `cancel` is superseded first.
    async fn translate_stream(
        &self,
        request: &TranslationRequest,
        cancel: &RequestToken,
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
    ) -> AppResult<String>;

    /// One-shot translation returning a structured result
    async fn translate(&self, request: &TranslationRequest) -> AppResult<TranslationResult>;
}

/// Translation through a Gemini text model
pub struct GeminiTranslator {
    http: GeminiHttp,
    model: String,
    temperature: f32,
}

impl GeminiTranslator {
    pub fn new(http: GeminiHttp, model: impl Into<String>, temperature: f32) -> Self {
        Self { http, model: model.into(), temperature }
    }

    fn stream_request(&self, request: &TranslationRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user_text(request.text.clone())],
            system_instruction: Some(Content::system_text(translation_instruction(request))),
            generation_config: Some(GenerationConfig {
                temperature: Some(self.temperature),
                ..GenerationConfig::default()
            }),
        }
    }

    fn structured_request(&self, request: &TranslationRequest) -> GenerateContentRequest {
        let mut instruction = translation_instruction(request);
        instruction.push_str(
            " Put the translation in the translatedText field.",
        );
        if request.is_auto_detect() {
            instruction.push_str(
                " Put the ISO 639-1 code of the detected source language in the detectedLanguage field.",
            );
        }

        GenerateContentRequest {
            contents: vec![Content::user_text(request.text.clone())],
            system_instruction: Some(Content::system_text(instruction)),
            generation_config: Some(GenerationConfig {
                temperature: Some(self.temperature),
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(response_schema()),
                ..GenerationConfig::default()
            }),
        }
    }
}

#[async_trait]
impl TranslationClient for GeminiTranslator {
    async fn translate_stream(
        &self,
        request: &TranslationRequest,
        cancel: &RequestToken,
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
    ) -> AppResult<String> {
        let body = self.stream_request(request);
        let idle = self.http.timeout();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            response = tokio::time::timeout(idle, self.http.open_stream(&self.model, &body)) => {
                response.map_err(|_| stalled(idle))??
            }
        };

        let full_text = read_stream(response.bytes_stream(), cancel, idle, on_chunk).await?;
        tracing::debug!(chars = full_text.chars().count(), "Translation stream finished");
        Ok(full_text)
    }

    async fn translate(&self, request: &TranslationRequest) -> AppResult<TranslationResult> {
        let body = self.structured_request(request);
        let response = self.http.generate(&self.model, &body).await?;
        parse_structured(request, &response)
    }
}

/// Instructions sent alongside the text
pub fn translation_instruction(request: &TranslationRequest) -> String {
    let target = languages::display_name(&request.target_lang);
    let task = if request.is_auto_detect() {
        format!("Detect the language of the user's text and translate it into {}.", target)
    } else {
        format!(
            "Translate the user's text from {} into {}.",
            languages::display_name(&request.source_lang),
            target
        )
    };

    format!(
        "You are a professional translator. {} \
         Preserve all line breaks, paragraph spacing and formatting exactly. \
         Keep the original tone and nuance. \
         Respond with the translated text only, without explanations, notes or quotation marks.",
        task
    )
}

fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "translatedText": { "type": "STRING" },
            "detectedLanguage": { "type": "STRING" }
        },
        "required": ["translatedText"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredTranslation {
    translated_text: String,
    #[serde(default)]
    detected_language: Option<String>,
}

/// Decode an SSE body into text, giving up when `cancel` is superseded or
/// when no bytes arrive for `idle`.
async fn read_stream<S, B, E>(
    stream: S,
    cancel: &RequestToken,
    idle: Duration,
    on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
) -> AppResult<String>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<AppError>,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = SseDecoder::new();
    let mut full_text = String::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            next = tokio::time::timeout(idle, stream.next()) => next.map_err(|_| stalled(idle))?,
        };
        match next {
            Some(Ok(bytes)) => {
                for payload in decoder.push(bytes.as_ref()) {
                    append_payload(&payload, &mut full_text, on_chunk)?;
                }
            }
            Some(Err(e)) => return Err(e.into()),
            None => break,
        }
    }
    if let Some(payload) = decoder.finish() {
        append_payload(&payload, &mut full_text, on_chunk)?;
    }
    Ok(full_text)
}

fn stalled(idle: Duration) -> AppError {
    AppError::Network(format!("No response from the translation service for {}s", idle.as_secs()))
}

fn append_payload(
    payload: &str,
    full_text: &mut String,
    on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
) -> AppResult<()> {
    let chunk: GenerateContentResponse = serde_json::from_str(payload)
        .map_err(|e| AppError::Parse(format!("Invalid stream chunk: {}", e)))?;
    let text = chunk.text();
    if !text.is_empty() {
        full_text.push_str(&text);
        on_chunk(&text);
    }
    Ok(())
}

fn parse_structured(request: &TranslationRequest, response: &GenerateContentResponse) -> AppResult<TranslationResult> {
    let raw = response.text();
    let parsed: StructuredTranslation = serde_json::from_str(raw.trim())
        .map_err(|e| AppError::Parse(format!("Response does not match the translation schema: {}", e)))?;

    // Only meaningful when the model was asked to detect the language
    let detected_language = parsed
        .detected_language
        .filter(|code| request.is_auto_detect() && !code.trim().is_empty());

    Ok(TranslationResult {
        translated_text: parsed.translated_text,
        detected_language,
        source_language: request.source_lang.clone(),
        target_language: request.target_lang.clone(),
    })
}
