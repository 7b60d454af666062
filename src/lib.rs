pub mod cache;
pub mod config;
pub mod history;
pub mod http;
pub mod languages;
pub mod logging;
pub mod pipeline;
pub mod speech;
pub mod translation;

pub use config::{AppConfig, ConfigError};
pub use history::{HistoryItem, RunLog};
pub use http::{HttpOutcome, PostRequest, ResilientClient, RetryPolicy};
pub use pipeline::{
    CancellationFlag, PipelineError, PipelineOrchestrator, PipelineResult, SourceLanguageConfig,
    TargetLanguageConfig,
};
pub use speech::{SpeechError, SpeechGateway, SpeechService};
pub use translation::{LanguageDetection, TranslationError, TranslationGateway, TranslationService};

use std::sync::Arc;

/// Gateways, run log and pipeline wired from one configuration.
pub struct Services {
    pub speech: Arc<SpeechGateway>,
    pub translator: Arc<TranslationGateway>,
    pub run_log: Arc<RunLog>,
    pub pipeline: PipelineOrchestrator,
}

impl Services {
    /// Builds everything over a real reqwest transport.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let client = ResilientClient::with_reqwest()?;
        Self::with_client(config, client)
    }

    /// Builds everything over `client`, sharing it between both gateways.
    pub fn with_client(config: &AppConfig, client: ResilientClient) -> Result<Self, ConfigError> {
        let policy = config.retry_policy()?;
        let ttl = config.cache_ttl();

        let speech = Arc::new(SpeechGateway::new(
            client.clone(),
            policy.clone(),
            config.speech_settings(),
            ttl,
        ));
        let translator = Arc::new(TranslationGateway::new(
            client,
            policy,
            config.translator_settings(),
            ttl,
        ));
        let run_log = Arc::new(RunLog::new());
        let pipeline = PipelineOrchestrator::new(speech.clone(), translator.clone(), run_log.clone());

        Ok(Self {
            speech,
            translator,
            run_log,
            pipeline,
        })
    }
}
