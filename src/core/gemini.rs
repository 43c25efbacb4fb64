//! Gemini `generativelanguage` REST plumbing shared by the translation and
//! speech clients.

pub mod sse;
pub mod types;

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use crate::shared::error::{AppError, AppResult};
use crate::shared::settings::ApiSettings;
use types::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticated HTTP access to the model service
#[derive(Clone)]
pub struct GeminiHttp {
    http: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiHttp {
    pub fn new(api_key: impl Into<String>, settings: &ApiSettings) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent("live-translator/gemini")
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AppError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: settings.request_timeout(),
        })
    }

    /// Per-request limit; also the longest silence tolerated on a stream
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    /// One-shot `generateContent` call
    pub async fn generate(&self, model: &str, request: &GenerateContentRequest) -> AppResult<GenerateContentResponse> {
        let url = self.endpoint(model, "generateContent");
        tracing::debug!(model, "POST generateContent");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| AppError::Parse(format!("Invalid generateContent response: {}", e)))
    }

    /// Open a server-sent-events `streamGenerateContent` call.
    ///
    /// The returned response body is consumed with [`sse::SseDecoder`]. No
    /// overall timeout applies since the body arrives incrementally; callers
    /// bound the gaps between chunks instead.
    pub async fn open_stream(&self, model: &str, request: &GenerateContentRequest) -> AppResult<Response> {
        let url = format!("{}?alt=sse", self.endpoint(model, "streamGenerateContent"));
        tracing::debug!(model, "POST streamGenerateContent");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

fn api_error(status: StatusCode, body: &str) -> AppError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return AppError::Api {
            status: status.as_u16(),
            message: "Invalid API key".to_string(),
        };
    }

    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string()
        });

    AppError::Api { status: status.as_u16(), message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_report_invalid_key() {
        let err = api_error(StatusCode::FORBIDDEN, r#"{"error":{"message":"denied"}}"#);
        assert_eq!(err, AppError::Api { status: 403, message: "Invalid API key".to_string() });
    }

    #[test]
    fn service_message_is_surfaced() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = api_error(StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(
            err,
            AppError::Api { status: 429, message: "Resource has been exhausted".to_string() }
        );
    }

    #[test]
    fn unparsable_body_falls_back_to_reason() {
        let err = api_error(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(err, AppError::Api { status: 502, message: "Bad Gateway".to_string() });
    }

    #[test]
    fn endpoints_are_built_from_base_url() {
        let settings = ApiSettings {
            base_url: "https://example.test/v1beta/".to_string(),
            ..ApiSettings::default()
        };
        let client = GeminiHttp::new("key", &settings).unwrap();
        assert_eq!(
            client.endpoint("gemini-2.5-flash", "generateContent"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
