// src/speech/types.rs
// Speech gateway error definitions

use crate::http::HttpOutcome;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpeechError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Speech service rejected the request: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Unexpected speech response: {0}")]
    Parse(String),

    #[error("No transcript in speech response")]
    MissingTranscript,

    #[error("Audio input is empty")]
    EmptyInput,

    #[error("Synthesized audio is empty")]
    EmptyAudio,
}

impl SpeechError {
    /// Maps a non-success outcome. Success is never an error.
    pub(crate) fn from_outcome(outcome: HttpOutcome) -> Self {
        match outcome {
            HttpOutcome::FailureResponse { status, body } => SpeechError::Rejected { status, body },
            HttpOutcome::NetworkError { message } => SpeechError::Network(message),
            HttpOutcome::Success { status, .. } => {
                SpeechError::Parse(format!("unexpected success status {} treated as failure", status))
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SpeechError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
