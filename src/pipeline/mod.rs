// src/pipeline/mod.rs
// Transcribe -> (detect -> re-transcribe)? -> translate -> synthesize

pub mod stage;
mod types;

pub use stage::{PipelineStage, StageTracker};
pub use types::{
    LanguageConfigError, PipelineError, PipelineResult, PipelineStep, SourceLanguageConfig,
    TargetLanguageConfig,
};

use crate::history::RunLog;
use crate::speech::SpeechService;
use crate::translation::{refine_language, TranslationService};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Cooperative cancellation checked between pipeline steps.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct PipelineOrchestrator {
    speech: Arc<dyn SpeechService>,
    translator: Arc<dyn TranslationService>,
    run_log: Arc<RunLog>,
}

impl PipelineOrchestrator {
    pub fn new(
        speech: Arc<dyn SpeechService>,
        translator: Arc<dyn TranslationService>,
        run_log: Arc<RunLog>,
    ) -> Self {
        tracing::info!(
            "Pipeline initialized: speech={}, translator={}",
            speech.name(),
            translator.name()
        );

        Self {
            speech,
            translator,
            run_log,
        }
    }

    pub fn run_log(&self) -> &Arc<RunLog> {
        &self.run_log
    }

    pub async fn run_pipeline(
        &self,
        audio: &[u8],
        source: SourceLanguageConfig,
        target: &TargetLanguageConfig,
    ) -> Result<PipelineResult, PipelineError> {
        self.run_pipeline_cancellable(audio, source, target, &CancellationFlag::new())
            .await
    }

    pub async fn run_pipeline_cancellable(
        &self,
        audio: &[u8],
        mut source: SourceLanguageConfig,
        target: &TargetLanguageConfig,
        cancel: &CancellationFlag,
    ) -> Result<PipelineResult, PipelineError> {
        let run_id = Uuid::new_v4();
        let mut tracker = StageTracker::new(run_id.to_string());

        tracing::info!(
            "Run {}: {} bytes, source={}, auto_detect={}, target={}/{}",
            run_id,
            audio.len(),
            source.stt_language_tag,
            source.auto_detect,
            target.language_code(),
            target.voice_id()
        );

        // 1. Transcription
        checkpoint(&mut tracker, cancel, PipelineStage::Transcribing)?;
        let mut original_text = match self.speech.transcribe(audio, &source.stt_language_tag).await {
            Ok(text) => text,
            Err(e) => {
                return Err(fail(
                    &mut tracker,
                    PipelineStep::Transcription,
                    PipelineError::TranscriptionFailed(e),
                ))
            }
        };

        // 2. Language refinement, never fatal
        if source.auto_detect {
            checkpoint(&mut tracker, cancel, PipelineStage::DetectingLanguage)?;
            original_text = refine_language(
                self.translator.as_ref(),
                self.speech.as_ref(),
                audio,
                &original_text,
                &mut source,
            )
            .await;
        }

        // 3. Translation
        checkpoint(&mut tracker, cancel, PipelineStage::Translating)?;
        let translated_text = match self
            .translator
            .translate(
                &original_text,
                &source.translation_language_code,
                target.language_code(),
            )
            .await
        {
            Ok(text) => text,
            Err(e) => {
                return Err(fail(
                    &mut tracker,
                    PipelineStep::Translation,
                    PipelineError::TranslationFailed(e),
                ))
            }
        };

        // 4. Synthesis
        checkpoint(&mut tracker, cancel, PipelineStage::Synthesizing)?;
        let synthesized_audio = match self
            .speech
            .synthesize(&translated_text, target.voice_id())
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                return Err(fail(
                    &mut tracker,
                    PipelineStep::Synthesis,
                    PipelineError::SynthesisFailed(e),
                ))
            }
        };

        tracker.advance(PipelineStage::Completed);

        let result = PipelineResult {
            id: run_id,
            original_text,
            translated_text,
            synthesized_audio,
            source,
            target: target.clone(),
            timestamp: Utc::now(),
            stages: tracker.into_visited(),
        };
        self.run_log.append(Arc::new(result.clone()));

        tracing::info!(
            "Run {} completed: {} -> {}, {} audio bytes",
            run_id,
            result.source.effective_language(),
            result.target.language_code(),
            result.synthesized_audio.len()
        );

        Ok(result)
    }
}

fn checkpoint(
    tracker: &mut StageTracker,
    cancel: &CancellationFlag,
    next: PipelineStage,
) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        tracing::warn!("Pipeline cancelled before {:?}", next);
        return Err(PipelineError::Cancelled { stage: next });
    }
    tracker.advance(next);
    Ok(())
}

fn fail(tracker: &mut StageTracker, step: PipelineStep, error: PipelineError) -> PipelineError {
    tracker.advance(PipelineStage::Failed(step));
    tracing::error!("Pipeline failed at {:?}: {}", step, error);
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::SpeechError;
    use crate::translation::{LanguageDetection, TranslationError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Calls(Mutex<Vec<String>>);

    impl Calls {
        fn push(&self, call: String) {
            self.0.lock().unwrap().push(call);
        }

        fn all(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct FakeSpeech {
        transcript: Result<String, SpeechError>,
        audio: Result<Vec<u8>, SpeechError>,
        calls: Arc<Calls>,
        cancel_on_transcribe: Option<CancellationFlag>,
    }

    #[async_trait]
    impl SpeechService for FakeSpeech {
        async fn transcribe(&self, _audio: &[u8], tag: &str) -> Result<String, SpeechError> {
            self.calls.push(format!("transcribe:{}", tag));
            if let Some(flag) = &self.cancel_on_transcribe {
                flag.cancel();
            }
            self.transcript.clone()
        }

        async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SpeechError> {
            self.calls.push(format!("synthesize:{}:{}", voice, text));
            self.audio.clone()
        }

        fn name(&self) -> &str {
            "fake-speech"
        }
    }

    struct FakeTranslator {
        detection: LanguageDetection,
        translation: Result<String, TranslationError>,
        calls: Arc<Calls>,
    }

    #[async_trait]
    impl TranslationService for FakeTranslator {
        async fn detect_language(&self, _text: &str) -> LanguageDetection {
            self.calls.push("detect".to_string());
            self.detection.clone()
        }

        async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslationError> {
            self.calls.push(format!("translate:{}->{}:{}", from, to, text));
            self.translation.clone()
        }

        fn name(&self) -> &str {
            "fake-translator"
        }
    }

    struct Harness {
        calls: Arc<Calls>,
        orchestrator: PipelineOrchestrator,
    }

    fn harness(
        transcript: Result<String, SpeechError>,
        detection: LanguageDetection,
        translation: Result<String, TranslationError>,
        audio: Result<Vec<u8>, SpeechError>,
        cancel_on_transcribe: Option<CancellationFlag>,
    ) -> Harness {
        let calls = Arc::new(Calls::default());
        let speech = FakeSpeech {
            transcript,
            audio,
            calls: calls.clone(),
            cancel_on_transcribe,
        };
        let translator = FakeTranslator {
            detection,
            translation,
            calls: calls.clone(),
        };
        Harness {
            calls,
            orchestrator: PipelineOrchestrator::new(
                Arc::new(speech),
                Arc::new(translator),
                Arc::new(RunLog::new()),
            ),
        }
    }

    fn english_target() -> TargetLanguageConfig {
        TargetLanguageConfig::new("en", "en-US-AriaNeural").unwrap()
    }

    #[tokio::test]
    async fn test_manual_source_skips_detection() {
        let h = harness(
            Ok("Bonjour".to_string()),
            LanguageDetection::detected("fr", 1.0),
            Ok("Hello".to_string()),
            Ok(vec![9, 9]),
            None,
        );

        let result = h
            .orchestrator
            .run_pipeline(b"wav", SourceLanguageConfig::manual("fr-FR").unwrap(), &english_target())
            .await
            .unwrap();

        assert_eq!(result.original_text, "Bonjour");
        assert_eq!(result.translated_text, "Hello");
        assert_eq!(result.synthesized_audio, vec![9, 9]);
        assert_eq!(result.source.detected_language, None);
        assert_eq!(
            result.stages,
            vec![
                PipelineStage::Idle,
                PipelineStage::Transcribing,
                PipelineStage::Translating,
                PipelineStage::Synthesizing,
                PipelineStage::Completed,
            ]
        );
        assert_eq!(
            h.calls.all(),
            vec![
                "transcribe:fr-FR".to_string(),
                "translate:fr->en:Bonjour".to_string(),
                "synthesize:en-US-AriaNeural:Hello".to_string(),
            ]
        );
        assert_eq!(h.orchestrator.run_log().len(), 1);
    }

    #[tokio::test]
    async fn test_transcription_failure_stops_pipeline() {
        let h = harness(
            Err(SpeechError::Rejected {
                status: 401,
                body: "denied".to_string(),
            }),
            LanguageDetection::none(),
            Ok("unused".to_string()),
            Ok(vec![1]),
            None,
        );

        let err = h
            .orchestrator
            .run_pipeline(b"wav", SourceLanguageConfig::auto_detect(), &english_target())
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(PipelineStep::Transcription));
        assert_eq!(h.calls.all(), vec!["transcribe:es-ES".to_string()]);
        assert!(h.orchestrator.run_log().is_empty());
    }

    #[tokio::test]
    async fn test_translation_failure_stops_before_synthesis() {
        let h = harness(
            Ok("Hola".to_string()),
            LanguageDetection::none(),
            Err(TranslationError::Network("timeout".to_string())),
            Ok(vec![1]),
            None,
        );

        let err = h
            .orchestrator
            .run_pipeline(b"wav", SourceLanguageConfig::auto_detect(), &english_target())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::TranslationFailed(_)));
        assert!(!h.calls.all().iter().any(|c| c.starts_with("synthesize")));
        assert!(h.orchestrator.run_log().is_empty());
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_not_logged() {
        let h = harness(
            Ok("Hola".to_string()),
            LanguageDetection::detected("es", 0.9),
            Ok("Hello".to_string()),
            Err(SpeechError::EmptyAudio),
            None,
        );

        let err = h
            .orchestrator
            .run_pipeline(b"wav", SourceLanguageConfig::auto_detect(), &english_target())
            .await
            .unwrap_err();

        assert_eq!(err, PipelineError::SynthesisFailed(SpeechError::EmptyAudio));
        assert!(h.orchestrator.run_log().is_empty());
    }

    #[tokio::test]
    async fn test_refined_language_drives_translation() {
        let h = harness(
            Ok("good morning".to_string()),
            LanguageDetection::detected("en", 0.99),
            Ok("buenos días".to_string()),
            Ok(vec![7]),
            None,
        );
        let target = TargetLanguageConfig::new("es", "es-ES-ElviraNeural").unwrap();

        let result = h
            .orchestrator
            .run_pipeline(b"wav", SourceLanguageConfig::auto_detect(), &target)
            .await
            .unwrap();

        assert_eq!(result.source.detected_language.as_deref(), Some("en"));
        assert_eq!(
            result.stages,
            vec![
                PipelineStage::Idle,
                PipelineStage::Transcribing,
                PipelineStage::DetectingLanguage,
                PipelineStage::Translating,
                PipelineStage::Synthesizing,
                PipelineStage::Completed,
            ]
        );
        assert_eq!(
            h.calls.all(),
            vec![
                "transcribe:es-ES".to_string(),
                "detect".to_string(),
                "transcribe:en-US".to_string(),
                "translate:en->es:good morning".to_string(),
                "synthesize:es-ES-ElviraNeural:buenos días".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_cancellation_between_steps() {
        let flag = CancellationFlag::new();
        let h = harness(
            Ok("Hola".to_string()),
            LanguageDetection::none(),
            Ok("Hello".to_string()),
            Ok(vec![1]),
            Some(flag.clone()),
        );

        let err = h
            .orchestrator
            .run_pipeline_cancellable(
                b"wav",
                SourceLanguageConfig::manual("es-ES").unwrap(),
                &english_target(),
                &flag,
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PipelineError::Cancelled {
                stage: PipelineStage::Translating
            }
        );
        assert_eq!(h.calls.all(), vec!["transcribe:es-ES".to_string()]);
        assert!(h.orchestrator.run_log().is_empty());
    }
}
