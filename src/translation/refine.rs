use super::TranslationService;
use crate::languages::stt_tag_for;
use crate::pipeline::SourceLanguageConfig;
use crate::speech::SpeechService;

/// Detection must be strictly above this to trigger re-transcription.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Detects the language of `original_text` and, when confident and the
/// recognition tag differs from the one used, re-transcribes `audio`.
///
/// Never fails: every failure path keeps `original_text`. `detected_language`
/// is always overwritten with the detection outcome.
pub async fn refine_language(
    translator: &dyn TranslationService,
    speech: &dyn SpeechService,
    audio: &[u8],
    original_text: &str,
    source: &mut SourceLanguageConfig,
) -> String {
    let detection = translator.detect_language(original_text).await;

    if let Some(language) = detection.language.as_deref() {
        if detection.confidence > CONFIDENCE_THRESHOLD {
            match stt_tag_for(language) {
                Some(tag) if tag != source.stt_language_tag => {
                    tracing::info!(
                        "Detected {} ({:.0}%), re-transcribing with {} instead of {}",
                        language,
                        detection.confidence * 100.0,
                        tag,
                        source.stt_language_tag
                    );
                    match speech.transcribe(audio, tag).await {
                        Ok(improved) => {
                            source.detected_language = Some(language.to_string());
                            source.translation_language_code = language.to_string();
                            return improved;
                        }
                        Err(e) => {
                            tracing::warn!("Re-transcription failed, keeping original text: {}", e);
                        }
                    }
                }
                Some(_) => {
                    tracing::info!("Detected {} matches recognition language, keeping transcript", language);
                }
                None => {
                    tracing::info!("Detected {} has no recognition tag, keeping transcript", language);
                }
            }
        } else {
            tracing::info!(
                "Detected {} with low confidence ({:.2}), keeping transcript",
                language,
                detection.confidence
            );
        }
    }

    source.detected_language = detection.language;
    original_text.to_string()
}
