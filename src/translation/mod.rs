// src/translation/mod.rs
// Translation gateway: language detection and text translation

mod refine;
mod types;

pub use refine::{refine_language, CONFIDENCE_THRESHOLD};
pub use types::{LanguageDetection, TranslationError};

use crate::cache::ResponseCache;
use crate::config::{TranslatorSettings, TRANSLATOR_API_VERSION};
use crate::http::{HttpOutcome, PostRequest, ResilientClient, RetryPolicy};
use crate::pipeline::SourceLanguageConfig;
use crate::speech::SpeechService;
use async_trait::async_trait;
use std::time::Duration;
use types::{DetectItem, TranslateItem};

/// Language detection and translation as seen by the pipeline
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Detect the language of `text`. Never fails: returns
    /// `LanguageDetection::none()` when detection is unavailable.
    async fn detect_language(&self, text: &str) -> LanguageDetection;

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslationError>;

    fn name(&self) -> &str;
}

pub struct TranslationGateway {
    client: ResilientClient,
    policy: RetryPolicy,
    settings: TranslatorSettings,
    detections: ResponseCache<String, LanguageDetection>,
    translations: ResponseCache<(String, String, String), String>,
}

impl TranslationGateway {
    pub fn new(
        client: ResilientClient,
        policy: RetryPolicy,
        settings: TranslatorSettings,
        cache_ttl: Duration,
    ) -> Self {
        tracing::info!(
            "Translation gateway initialized: base={}, region={}",
            settings.base_url,
            settings.region
        );

        Self {
            client,
            policy,
            settings,
            detections: ResponseCache::new(cache_ttl),
            translations: ResponseCache::new(cache_ttl),
        }
    }

    pub fn clear_cache(&self) {
        self.detections.clear();
        self.translations.clear();
    }

    /// Refines `source` using this gateway for detection and `speech` for
    /// re-transcription. See [`refine_language`].
    pub async fn refine_language(
        &self,
        speech: &dyn SpeechService,
        audio: &[u8],
        original_text: &str,
        source: &mut SourceLanguageConfig,
    ) -> String {
        refine_language(self, speech, audio, original_text, source).await
    }

    fn base_request(&self, text: &str) -> PostRequest {
        PostRequest::new()
            .header("Ocp-Apim-Subscription-Key", self.settings.subscription_key.as_str())
            .header("Ocp-Apim-Subscription-Region", self.settings.region.as_str())
            .header("Content-Type", "application/json")
            .query("api-version", TRANSLATOR_API_VERSION)
            .json(serde_json::json!([{ "text": text }]))
    }

    async fn request_detection(&self, text: &str) -> Result<LanguageDetection, TranslationError> {
        let url = format!("{}/detect", self.settings.base_url);
        let request = self.base_request(text);

        match self.client.post_with_retry(&url, &request, &self.policy).await {
            HttpOutcome::Success { body, .. } => {
                let items: Vec<DetectItem> = serde_json::from_slice(&body)
                    .map_err(|e| TranslationError::Parse(e.to_string()))?;
                let first = items
                    .into_iter()
                    .next()
                    .ok_or_else(|| TranslationError::Parse("empty detection result".to_string()))?;
                Ok(LanguageDetection::detected(first.language, first.score))
            }
            other => Err(TranslationError::from_outcome(other)),
        }
    }

    async fn request_translation(&self, text: &str, from: &str, to: &str) -> Result<String, TranslationError> {
        let url = format!("{}/translate", self.settings.base_url);
        let request = self.base_request(text).query("from", from).query("to", to);

        match self.client.post_with_retry(&url, &request, &self.policy).await {
            HttpOutcome::Success { body, .. } => {
                let items: Vec<TranslateItem> = serde_json::from_slice(&body)
                    .map_err(|e| TranslationError::Parse(e.to_string()))?;
                items
                    .into_iter()
                    .next()
                    .and_then(|item| item.translations.into_iter().next())
                    .map(|t| t.text)
                    .ok_or_else(|| TranslationError::Parse("no translation in response".to_string()))
            }
            other => Err(TranslationError::from_outcome(other)),
        }
    }
}

#[async_trait]
impl TranslationService for TranslationGateway {
    async fn detect_language(&self, text: &str) -> LanguageDetection {
        if text.trim().is_empty() {
            return LanguageDetection::none();
        }

        let key = text.to_string();
        if let Some(detection) = self.detections.get(&key) {
            tracing::debug!("Detect cache hit");
            return detection;
        }

        match self.request_detection(text).await {
            Ok(detection) => {
                tracing::info!(
                    "Detected language {:?} (confidence {:.2})",
                    detection.language,
                    detection.confidence
                );
                self.detections.insert(key, detection.clone());
                detection
            }
            Err(e) => {
                tracing::warn!("Language detection failed, continuing without it: {}", e);
                LanguageDetection::none()
            }
        }
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Err(TranslationError::EmptyInput);
        }

        let key = (text.to_string(), from.to_string(), to.to_string());
        if let Some(translated) = self.translations.get(&key) {
            tracing::debug!("Translate cache hit ({} -> {})", from, to);
            return Ok(translated);
        }

        tracing::info!("Translating {} chars {} -> {}...", text.len(), from, to);

        match self.request_translation(text, from, to).await {
            Ok(translated) => {
                tracing::info!("Translation success: {} chars", translated.len());
                self.translations.insert(key, translated.clone());
                Ok(translated)
            }
            Err(e) => {
                tracing::warn!("Translation failed: {}", e);
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        "Azure Translator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{RequestBody, ScriptedReply, ScriptedTransport};
    use serde_json::json;
    use std::sync::Arc;

    const BASE: &str = "https://translator.test";

    fn gateway(transport: Arc<ScriptedTransport>) -> TranslationGateway {
        TranslationGateway::new(
            ResilientClient::new(transport),
            RetryPolicy::new(3, 1.5, 5.0).unwrap(),
            TranslatorSettings {
                subscription_key: "translator-secret".to_string(),
                region: "westeurope".to_string(),
                base_url: BASE.to_string(),
            },
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_detect_parses_first_result() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedReply::json(json!([
            { "language": "fr", "score": 0.93, "isTranslationSupported": true }
        ]))]));
        let translator = gateway(transport.clone());

        let detection = translator.detect_language("Bonjour tout le monde").await;

        assert_eq!(detection, LanguageDetection::detected("fr", 0.93));
        let call = &transport.calls()[0];
        assert_eq!(call.url, "https://translator.test/detect");
        assert_eq!(call.request.query_value("api-version"), Some("3.0"));
        assert_eq!(call.request.header_value("Ocp-Apim-Subscription-Region"), Some("westeurope"));
        assert_eq!(
            call.request.body,
            RequestBody::Json(json!([{ "text": "Bonjour tout le monde" }]))
        );
    }

    #[tokio::test]
    async fn test_detect_failure_degrades_to_none() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedReply::status(403)]));

        let detection = gateway(transport).detect_language("Hallo").await;

        assert_eq!(detection, LanguageDetection::none());
    }

    #[tokio::test]
    async fn test_detect_malformed_body_degrades_to_none() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedReply::json(json!([]))]));

        let detection = gateway(transport).detect_language("Hallo").await;

        assert_eq!(detection.language, None);
        assert_eq!(detection.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_failed_detection_is_retried_on_next_call() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedReply::status(400),
            ScriptedReply::json(json!([{ "language": "de", "score": 1.0 }])),
        ]));
        let translator = gateway(transport.clone());

        assert_eq!(translator.detect_language("Hallo").await.language, None);
        assert_eq!(
            translator.detect_language("Hallo").await.language.as_deref(),
            Some("de")
        );
        translator.detect_language("Hallo").await;

        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_translate_sends_language_pair() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedReply::json(json!([
            { "translations": [ { "text": "Hello, how are you?", "to": "en" } ] }
        ]))]));
        let translator = gateway(transport.clone());

        let text = translator.translate("Hola, ¿cómo estás?", "es", "en").await.unwrap();

        assert_eq!(text, "Hello, how are you?");
        let call = &transport.calls()[0];
        assert_eq!(call.url, "https://translator.test/translate");
        assert_eq!(call.request.query_value("from"), Some("es"));
        assert_eq!(call.request.query_value("to"), Some("en"));
    }

    #[tokio::test]
    async fn test_translate_rejected_carries_status() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedReply::status_with_body(
            400,
            "{\"error\":{\"code\":400036}}",
        )]));

        let result = gateway(transport).translate("Hola", "es", "xx").await;

        assert!(matches!(result, Err(TranslationError::Rejected { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_translate_missing_translations_is_parse_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedReply::json(json!([
            { "translations": [] }
        ]))]));

        let result = gateway(transport).translate("Hola", "es", "en").await;

        assert!(matches!(result, Err(TranslationError::Parse(_))));
    }

    #[tokio::test]
    async fn test_repeated_translation_served_from_cache() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedReply::json(json!([
            { "translations": [ { "text": "Good morning" } ] }
        ]))]));
        let translator = gateway(transport.clone());

        let first = translator.translate("Buenos días", "es", "en").await.unwrap();
        let second = translator.translate("Buenos días", "es", "en").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_locally() {
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let translator = gateway(transport.clone());

        assert_eq!(
            translator.translate("   ", "es", "en").await,
            Err(TranslationError::EmptyInput)
        );
        assert_eq!(translator.detect_language("").await, LanguageDetection::none());
        assert_eq!(transport.call_count(), 0);
    }
}
