use crate::cache::DEFAULT_CACHE_TTL;
use crate::http::retry::{DEFAULT_BASE_BACKOFF_SECS, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};
use crate::http::{HttpError, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TRANSLATOR_URL: &str = "https://api.cognitive.microsofttranslator.com";
pub const TRANSLATOR_API_VERSION: &str = "3.0";

const ENV_SPEECH_KEY: &str = "AZURE_SPEECH_KEY";
const ENV_TRANSLATOR_KEY: &str = "AZURE_TRANSLATOR_KEY";
const ENV_REGION: &str = "AZURE_REGION";
const ENV_MAX_RETRIES: &str = "TRANSLATOR_MAX_RETRIES";
const ENV_BASE_BACKOFF: &str = "TRANSLATOR_BASE_BACKOFF_SECS";
const ENV_TIMEOUT: &str = "TRANSLATOR_TIMEOUT_SECS";
const ENV_CACHE_TTL: &str = "TRANSLATOR_CACHE_TTL_SECS";
const ENV_LOG_JSON: &str = "TRANSLATOR_LOG_JSON";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error(transparent)]
    Http(#[from] HttpError),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub speech_key: String,
    pub translator_key: String,
    pub region: String,
    pub retry: RetrySettings,
    pub cache_ttl_secs: u64,
    pub endpoints: EndpointOverrides,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            speech_key: String::new(),
            translator_key: String::new(),
            region: String::new(),
            retry: RetrySettings::default(),
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            endpoints: EndpointOverrides::default(),
            log_json: false,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("speech_key", &mask_api_key(&self.speech_key))
            .field("translator_key", &mask_api_key(&self.translator_key))
            .field("region", &self.region)
            .field("retry", &self.retry)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("endpoints", &self.endpoints)
            .field("log_json", &self.log_json)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_backoff_secs: f64,
    pub timeout_secs: f64,
    /// Statuses worth retrying. Omitted means the defaults; an empty list
    /// retries no status at all (network errors are still retried).
    pub retry_on: Vec<u16>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff_secs: DEFAULT_BASE_BACKOFF_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_on: policy.retryable_statuses().iter().copied().collect(),
        }
    }
}

/// Optional endpoint bases; region-derived URLs are used when unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointOverrides {
    pub stt_url: Option<String>,
    pub tts_url: Option<String>,
    pub translator_url: Option<String>,
}

#[derive(Clone)]
pub struct SpeechSettings {
    pub subscription_key: String,
    pub stt_url: String,
    pub tts_url: String,
}

impl fmt::Debug for SpeechSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechSettings")
            .field("subscription_key", &mask_api_key(&self.subscription_key))
            .field("stt_url", &self.stt_url)
            .field("tts_url", &self.tts_url)
            .finish()
    }
}

#[derive(Clone)]
pub struct TranslatorSettings {
    pub subscription_key: String,
    pub region: String,
    pub base_url: String,
}

impl fmt::Debug for TranslatorSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatorSettings")
            .field("subscription_key", &mask_api_key(&self.subscription_key))
            .field("region", &self.region)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AppConfig {
    /// Loads the optional JSON file, then applies `.env` and process
    /// environment overrides, then validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        normalize_config(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut config: AppConfig = serde_json::from_str(&raw)?;
        normalize_config(&mut config);
        Ok(config)
    }

    /// Applies overrides from `lookup` (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_SPEECH_KEY) {
            self.speech_key = key;
        }
        if let Some(key) = lookup(ENV_TRANSLATOR_KEY) {
            self.translator_key = key;
        }
        if let Some(region) = lookup(ENV_REGION) {
            self.region = region;
        }
        if let Some(raw) = lookup(ENV_MAX_RETRIES) {
            self.retry.max_retries = parse_value(ENV_MAX_RETRIES, &raw)?;
        }
        if let Some(raw) = lookup(ENV_BASE_BACKOFF) {
            self.retry.base_backoff_secs = parse_value(ENV_BASE_BACKOFF, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            self.retry.timeout_secs = parse_value(ENV_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CACHE_TTL) {
            self.cache_ttl_secs = parse_value(ENV_CACHE_TTL, &raw)?;
        }
        if let Some(raw) = lookup(ENV_LOG_JSON) {
            self.log_json = matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.speech_key.is_empty() {
            return Err(ConfigError::Missing(ENV_SPEECH_KEY));
        }
        if self.translator_key.is_empty() {
            return Err(ConfigError::Missing(ENV_TRANSLATOR_KEY));
        }
        if self.region.is_empty() {
            return Err(ConfigError::Missing(ENV_REGION));
        }
        self.retry_policy()?;
        Ok(())
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let policy = RetryPolicy::new(
            self.retry.max_retries,
            self.retry.base_backoff_secs,
            self.retry.timeout_secs,
        )?;
        Ok(policy.with_retryable_statuses(self.retry.retry_on.iter().copied()))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn speech_settings(&self) -> SpeechSettings {
        SpeechSettings {
            subscription_key: self.speech_key.clone(),
            stt_url: self.endpoints.stt_url.clone().unwrap_or_else(|| {
                format!(
                    "https://{}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1",
                    self.region
                )
            }),
            tts_url: self.endpoints.tts_url.clone().unwrap_or_else(|| {
                format!("https://{}.tts.speech.microsoft.com/cognitiveservices/v1", self.region)
            }),
        }
    }

    pub fn translator_settings(&self) -> TranslatorSettings {
        TranslatorSettings {
            subscription_key: self.translator_key.clone(),
            region: self.region.clone(),
            base_url: self
                .endpoints
                .translator_url
                .clone()
                .unwrap_or_else(|| DEFAULT_TRANSLATOR_URL.to_string()),
        }
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key,
        message: format!("'{}': {}", raw, e),
    })
}

fn normalize_config(config: &mut AppConfig) {
    config.speech_key = config.speech_key.trim().to_string();
    config.translator_key = config.translator_key.trim().to_string();
    config.region = config.region.trim().to_ascii_lowercase();
    config.endpoints.stt_url = normalize_url(config.endpoints.stt_url.take());
    config.endpoints.tts_url = normalize_url(config.endpoints.tts_url.take());
    config.endpoints.translator_url = normalize_url(config.endpoints.translator_url.take());
}

fn normalize_url(url: Option<String>) -> Option<String> {
    url.and_then(|value| {
        let trimmed = value.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub fn mask_api_key(api_key: &str) -> String {
    if api_key.is_empty() {
        return String::new();
    }
    if api_key.len() <= 10 || !api_key.is_ascii() {
        return "******".to_string();
    }

    let prefix = &api_key[..4];
    let suffix = &api_key[api_key.len().saturating_sub(4)..];
    format!("{}********{}", prefix, suffix)
}
