// src/speech/mod.rs
// Speech gateway: cloud speech-to-text and text-to-speech

mod ssml;
mod types;

pub use ssml::{build_ssml, escape_xml};
pub use types::SpeechError;

use crate::cache::ResponseCache;
use crate::config::SpeechSettings;
use crate::http::{HttpOutcome, PostRequest, ResilientClient, RetryPolicy};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const STT_CONTENT_TYPE: &str = "audio/wav; codecs=audio/pcm; samplerate=16000";
const TTS_CONTENT_TYPE: &str = "application/ssml+xml";
const TTS_OUTPUT_FORMAT: &str = "audio-16khz-128kbitrate-mono-mp3";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Speech recognition and synthesis as seen by the pipeline
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Transcribe raw audio recorded in `language_tag` (e.g. "es-ES")
    async fn transcribe(&self, audio: &[u8], language_tag: &str) -> Result<String, SpeechError>;

    /// Synthesize `text` with `voice_id`, returning encoded audio
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, SpeechError>;

    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct RecognitionResponse {
    #[serde(rename = "DisplayText", default)]
    display_text: Option<String>,
    #[serde(rename = "Text", default)]
    text: Option<String>,
}

impl RecognitionResponse {
    fn into_transcript(self) -> Option<String> {
        let non_empty = |s: Option<String>| s.filter(|t| !t.trim().is_empty());
        non_empty(self.display_text).or_else(|| non_empty(self.text))
    }
}

pub struct SpeechGateway {
    client: ResilientClient,
    policy: RetryPolicy,
    settings: SpeechSettings,
    transcripts: ResponseCache<(Vec<u8>, String), String>,
    syntheses: ResponseCache<(String, String), Vec<u8>>,
}

impl SpeechGateway {
    pub fn new(
        client: ResilientClient,
        policy: RetryPolicy,
        settings: SpeechSettings,
        cache_ttl: Duration,
    ) -> Self {
        tracing::info!(
            "Speech gateway initialized: stt={}, tts={}, cache_ttl={}s",
            settings.stt_url,
            settings.tts_url,
            cache_ttl.as_secs()
        );

        Self {
            client,
            policy,
            settings,
            transcripts: ResponseCache::new(cache_ttl),
            syntheses: ResponseCache::new(cache_ttl),
        }
    }

    pub fn clear_cache(&self) {
        self.transcripts.clear();
        self.syntheses.clear();
    }

    async fn request_transcript(&self, audio: &[u8], language_tag: &str) -> Result<String, SpeechError> {
        let request = PostRequest::new()
            .header(SUBSCRIPTION_KEY_HEADER, self.settings.subscription_key.as_str())
            .header("Content-Type", STT_CONTENT_TYPE)
            .query("language", language_tag)
            .bytes(audio.to_vec());

        match self
            .client
            .post_with_retry(&self.settings.stt_url, &request, &self.policy)
            .await
        {
            HttpOutcome::Success { body, .. } => {
                let parsed: RecognitionResponse = serde_json::from_slice(&body)
                    .map_err(|e| SpeechError::Parse(e.to_string()))?;
                parsed.into_transcript().ok_or(SpeechError::MissingTranscript)
            }
            other => Err(SpeechError::from_outcome(other)),
        }
    }

    async fn request_synthesis(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, SpeechError> {
        let request = PostRequest::new()
            .header(SUBSCRIPTION_KEY_HEADER, self.settings.subscription_key.as_str())
            .header("Content-Type", TTS_CONTENT_TYPE)
            .header("X-Microsoft-OutputFormat", TTS_OUTPUT_FORMAT)
            .bytes(build_ssml(text, voice_id).into_bytes());

        match self
            .client
            .post_with_retry(&self.settings.tts_url, &request, &self.policy)
            .await
        {
            HttpOutcome::Success { body, .. } if body.is_empty() => Err(SpeechError::EmptyAudio),
            HttpOutcome::Success { body, .. } => Ok(body),
            other => Err(SpeechError::from_outcome(other)),
        }
    }
}

#[async_trait]
impl SpeechService for SpeechGateway {
    async fn transcribe(&self, audio: &[u8], language_tag: &str) -> Result<String, SpeechError> {
        if audio.is_empty() {
            return Err(SpeechError::EmptyInput);
        }

        let key = (audio.to_vec(), language_tag.to_string());
        if let Some(text) = self.transcripts.get(&key) {
            tracing::debug!("STT cache hit ({} bytes, {})", audio.len(), language_tag);
            return Ok(text);
        }

        tracing::info!("STT: transcribing {} bytes as {}...", audio.len(), language_tag);

        match self.request_transcript(audio, language_tag).await {
            Ok(text) => {
                tracing::info!("STT success: {} chars", text.len());
                self.transcripts.insert(key, text.clone());
                Ok(text)
            }
            Err(e) => {
                tracing::warn!("STT failed: {}", e);
                Err(e)
            }
        }
    }

    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, SpeechError> {
        let key = (text.to_string(), voice_id.to_string());
        if let Some(audio) = self.syntheses.get(&key) {
            tracing::debug!("TTS cache hit ({})", voice_id);
            return Ok(audio);
        }

        tracing::info!("TTS: synthesizing {} chars with {}...", text.len(), voice_id);

        match self.request_synthesis(text, voice_id).await {
            Ok(audio) => {
                tracing::info!("TTS success: {} bytes", audio.len());
                self.syntheses.insert(key, audio.clone());
                Ok(audio)
            }
            Err(e) => {
                tracing::warn!("TTS failed: {}", e);
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        "Azure Speech"
    }
}
