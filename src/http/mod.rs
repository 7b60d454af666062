// src/http/mod.rs
// Resilient POST client shared by the speech and translator gateways

mod reqwest_transport;
pub mod retry;
mod scripted;

pub use reqwest_transport::ReqwestTransport;
pub use retry::{RetryPolicy, StatusClass};
pub use scripted::{RecordedCall, ScriptedReply, ScriptedTransport};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Invalid retry policy: {0}")]
    InvalidPolicy(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Transport-level failure, before any status code exists.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Request error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Bytes(Vec<u8>),
    Json(Value),
}

/// Headers, query parameters and body of a single POST.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRequest {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl PostRequest {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn bytes(mut self, body: Vec<u8>) -> Self {
        self.body = RequestBody::Bytes(body);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl Default for PostRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// What the transport got back from the server, whatever the status.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Terminal result of `post_with_retry`.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpOutcome {
    Success {
        status: u16,
        body: Vec<u8>,
        headers: HashMap<String, String>,
    },
    FailureResponse {
        status: u16,
        body: String,
    },
    NetworkError {
        message: String,
    },
}

impl HttpOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, HttpOutcome::Success { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            HttpOutcome::Success { status, .. } | HttpOutcome::FailureResponse { status, .. } => {
                Some(*status)
            }
            HttpOutcome::NetworkError { .. } => None,
        }
    }

    fn failure_from(response: RawResponse) -> Self {
        HttpOutcome::FailureResponse {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }
    }
}

/// Sends one POST. Implementations must not retry on their own.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        request: &PostRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;
}

#[derive(Clone)]
pub struct ResilientClient {
    transport: Arc<dyn HttpTransport>,
}

impl ResilientClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    pub fn with_reqwest() -> Result<Self, HttpError> {
        Ok(Self::new(Arc::new(ReqwestTransport::new()?)))
    }

    /// POSTs `request` to `url`, retrying rate-limit, server and network
    /// failures per `policy`. Always yields a terminal outcome.
    pub async fn post_with_retry(
        &self,
        url: &str,
        request: &PostRequest,
        policy: &RetryPolicy,
    ) -> HttpOutcome {
        let max_retries = policy.max_retries();
        let mut last_failure = HttpOutcome::NetworkError {
            message: "no attempt was made (max_retries = 0)".to_string(),
        };

        for attempt in 0..max_retries {
            match self.transport.post(url, request, policy.timeout()).await {
                Ok(response) => match policy.classify(response.status) {
                    StatusClass::Success => {
                        if attempt > 0 {
                            tracing::info!(
                                "POST {} succeeded on attempt {}/{}",
                                url,
                                attempt + 1,
                                max_retries
                            );
                        }
                        return HttpOutcome::Success {
                            status: response.status,
                            body: response.body,
                            headers: response.headers,
                        };
                    }
                    StatusClass::Terminal => {
                        tracing::warn!(
                            "POST {} rejected with status {}, not retrying",
                            url,
                            response.status
                        );
                        return HttpOutcome::failure_from(response);
                    }
                    StatusClass::Retryable => {
                        tracing::warn!(
                            status = response.status,
                            "POST {} attempt {}/{} failed",
                            url,
                            attempt + 1,
                            max_retries
                        );
                        last_failure = HttpOutcome::failure_from(response);
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "POST {} attempt {}/{} failed",
                        url,
                        attempt + 1,
                        max_retries
                    );
                    last_failure = HttpOutcome::NetworkError {
                        message: e.to_string(),
                    };
                }
            }

            if !policy.is_last_attempt(attempt) {
                policy.wait_before_retry(attempt).await;
            }
        }

        tracing::error!("POST {}: all {} attempts failed", url, max_retries);
        last_failure
    }
}
