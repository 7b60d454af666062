// src/pipeline/types.rs
// Pipeline language selections, results and errors

use crate::languages::{
    self, default_voice_for, is_valid_language_code, is_valid_stt_tag, is_valid_voice_id,
    translation_code_from_tag,
};
use crate::speech::SpeechError;
use crate::translation::TranslationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::stage::PipelineStage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLanguageConfig {
    pub auto_detect: bool,
    /// Recognition tag used for transcription, e.g. "es-ES"
    pub stt_language_tag: String,
    /// Source code used for translation, e.g. "es"
    pub translation_language_code: String,
    pub detected_language: Option<String>,
}

impl SourceLanguageConfig {
    /// Auto-detection starts from the default recognition language.
    pub fn auto_detect() -> Self {
        Self {
            auto_detect: true,
            stt_language_tag: languages::DEFAULT_STT_TAG.to_string(),
            translation_language_code: languages::DEFAULT_TRANSLATION_CODE.to_string(),
            detected_language: None,
        }
    }

    pub fn manual(stt_language_tag: &str) -> Result<Self, LanguageConfigError> {
        let tag = stt_language_tag.trim();
        if !is_valid_stt_tag(tag) {
            return Err(LanguageConfigError::InvalidSttTag(tag.to_string()));
        }

        Ok(Self {
            auto_detect: false,
            stt_language_tag: tag.to_string(),
            translation_language_code: translation_code_from_tag(tag),
            detected_language: None,
        })
    }

    /// Language shown to the user: the detected one when known.
    pub fn effective_language(&self) -> &str {
        self.detected_language
            .as_deref()
            .unwrap_or(&self.stt_language_tag)
    }
}

impl Default for SourceLanguageConfig {
    fn default() -> Self {
        Self::auto_detect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetLanguageConfig {
    language_code: String,
    voice_id: String,
}

impl TargetLanguageConfig {
    pub fn new(language_code: &str, voice_id: &str) -> Result<Self, LanguageConfigError> {
        let code = language_code.trim().to_string();
        let voice = voice_id.trim().to_string();
        if !is_valid_language_code(&code) {
            return Err(LanguageConfigError::InvalidLanguageCode(code));
        }
        if !is_valid_voice_id(&voice) {
            return Err(LanguageConfigError::InvalidVoice(voice));
        }

        Ok(Self {
            language_code: code,
            voice_id: voice,
        })
    }

    pub fn with_default_voice(language_code: &str) -> Result<Self, LanguageConfigError> {
        Self::new(language_code, default_voice_for(language_code))
    }

    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LanguageConfigError {
    #[error("Invalid recognition language tag: {0:?}")]
    InvalidSttTag(String),

    #[error("Invalid language code: {0:?}")]
    InvalidLanguageCode(String),

    #[error("Invalid voice id: {0:?}")]
    InvalidVoice(String),
}

/// A completed run. Only built when every step succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub id: Uuid,
    pub original_text: String,
    pub translated_text: String,
    #[serde(skip)]
    pub synthesized_audio: Vec<u8>,
    pub source: SourceLanguageConfig,
    pub target: TargetLanguageConfig,
    pub timestamp: DateTime<Utc>,
    /// Stages the run went through, from `Idle` to `Completed`
    pub stages: Vec<PipelineStage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStep {
    Transcription,
    Translation,
    Synthesis,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(SpeechError),

    #[error("Translation failed: {0}")]
    TranslationFailed(TranslationError),

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(SpeechError),

    #[error("Pipeline cancelled before {stage:?}")]
    Cancelled { stage: PipelineStage },
}

impl PipelineError {
    /// Step that failed, `None` for cancellation.
    pub fn step(&self) -> Option<PipelineStep> {
        match self {
            PipelineError::TranscriptionFailed(_) => Some(PipelineStep::Transcription),
            PipelineError::TranslationFailed(_) => Some(PipelineStep::Translation),
            PipelineError::SynthesisFailed(_) => Some(PipelineStep::Synthesis),
            PipelineError::Cancelled { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_source_derives_translation_code() {
        let source = SourceLanguageConfig::manual("fr-FR").unwrap();

        assert!(!source.auto_detect);
        assert_eq!(source.translation_language_code, "fr");
        assert_eq!(source.effective_language(), "fr-FR");
    }

    #[test]
    fn test_manual_source_rejects_bad_tag() {
        assert_eq!(
            SourceLanguageConfig::manual("french"),
            Err(LanguageConfigError::InvalidSttTag("french".to_string()))
        );
    }

    #[test]
    fn test_auto_detect_defaults() {
        let source = SourceLanguageConfig::auto_detect();

        assert!(source.auto_detect);
        assert_eq!(source.stt_language_tag, "es-ES");
        assert_eq!(source.translation_language_code, "es");
        assert_eq!(source.detected_language, None);
    }

    #[test]
    fn test_target_with_default_voice() {
        let target = TargetLanguageConfig::with_default_voice("ja").unwrap();

        assert_eq!(target.voice_id(), "ja-JP-NanamiNeural");
        assert!(TargetLanguageConfig::new("en", "Aria").is_err());
    }

    #[test]
    fn test_error_step() {
        let err = PipelineError::TranslationFailed(TranslationError::EmptyInput);
        assert_eq!(err.step(), Some(PipelineStep::Translation));
        assert_eq!(
            PipelineError::Cancelled {
                stage: PipelineStage::Translating
            }
            .step(),
            None
        );
    }
}
