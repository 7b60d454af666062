use crate::http::HttpOutcome;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Translator rejected the request: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Unexpected translator response: {0}")]
    Parse(String),

    #[error("Nothing to translate")]
    EmptyInput,
}

impl TranslationError {
    pub(crate) fn from_outcome(outcome: HttpOutcome) -> Self {
        match outcome {
            HttpOutcome::FailureResponse { status, body } => TranslationError::Rejected { status, body },
            HttpOutcome::NetworkError { message } => TranslationError::Network(message),
            HttpOutcome::Success { status, .. } => TranslationError::Parse(format!(
                "unexpected success status {} treated as failure",
                status
            )),
        }
    }
}

/// Result of language detection. `language` is `None` when detection failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDetection {
    pub language: Option<String>,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,
}

impl LanguageDetection {
    pub fn none() -> Self {
        Self {
            language: None,
            confidence: 0.0,
        }
    }

    pub fn detected(language: impl Into<String>, confidence: f64) -> Self {
        Self {
            language: Some(language.into()),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetectItem {
    pub language: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranslateItem {
    pub translations: Vec<TranslationText>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranslationText {
    pub text: String,
}
