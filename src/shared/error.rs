use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    #[error("I/O Error: {0}")]
    Io(String),

    #[error("Network Error: {0}")]
    Network(String),

    /// Non-success answer from the remote model service
    #[error("API Error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Storage Error: {0}")]
    Storage(String),

    #[error("Validation Error: {0}")]
    Validation(String),

    /// Response could not be decoded into the expected shape
    #[error("Parse Error: {0}")]
    Parse(String),

    #[error("Audio Error: {0}")]
    Audio(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    /// The request was superseded by a newer one
    #[error("Request cancelled")]
    Cancelled,
}

impl AppError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => AppError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => AppError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(format!("JSON error: {}", err))
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(err: base64::DecodeError) -> Self {
        AppError::Parse(format!("Invalid base64 payload: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_cancelled_is_cancellation() {
        assert!(AppError::Cancelled.is_cancelled());
        assert!(!AppError::Network("timeout".into()).is_cancelled());
        assert!(!AppError::Api { status: 500, message: "boom".into() }.is_cancelled());
    }

    #[test]
    fn serializes_tagged_for_the_front_end() {
        let json = serde_json::to_value(AppError::Validation("empty text".into())).unwrap();
        assert_eq!(json["type"], "Validation");
        assert_eq!(json["message"], "empty text");
    }
}
