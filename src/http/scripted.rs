// src/http/scripted.rs
// Scripted transport used as a test double for the gateways and pipeline

use super::{HttpTransport, PostRequest, RawResponse, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Response(RawResponse),
    Network(TransportError),
}

impl ScriptedReply {
    pub fn ok(body: Vec<u8>) -> Self {
        Self::Response(RawResponse {
            status: 200,
            headers: HashMap::new(),
            body,
        })
    }

    pub fn json(value: Value) -> Self {
        Self::ok(value.to_string().into_bytes())
    }

    pub fn status(status: u16) -> Self {
        Self::status_with_body(status, "")
    }

    pub fn status_with_body(status: u16, body: &str) -> Self {
        Self::Response(RawResponse {
            status,
            headers: HashMap::new(),
            body: body.as_bytes().to_vec(),
        })
    }

    pub fn network(error: TransportError) -> Self {
        Self::Network(error)
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub request: PostRequest,
    pub timeout: Duration,
    pub at: Instant,
}

struct Route {
    pattern: String,
    replies: VecDeque<ScriptedReply>,
}

/// Replays canned replies instead of hitting the network.
///
/// Replies are matched by the first route whose pattern occurs in the URL,
/// falling back to the default queue. The last reply of a queue is sticky:
/// it keeps being returned once everything before it has been consumed.
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    fallback: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            fallback: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn routed() -> Self {
        Self::new(Vec::new())
    }

    pub fn on(self, pattern: &str, replies: Vec<ScriptedReply>) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(Route {
                pattern: pattern.to_string(),
                replies: replies.into(),
            });
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn calls_to(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .map(|c| c.iter().filter(|call| call.url.contains(pattern)).count())
            .unwrap_or(0)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls
            .lock()
            .map(|c| c.iter().map(|call| call.at).collect())
            .unwrap_or_default()
    }

    fn next_reply(&self, url: &str) -> Option<ScriptedReply> {
        let mut routes = self.routes.lock().ok()?;
        if let Some(route) = routes.iter_mut().find(|r| url.contains(&r.pattern)) {
            return pop_sticky(&mut route.replies);
        }
        drop(routes);

        let mut fallback = self.fallback.lock().ok()?;
        pop_sticky(&mut fallback)
    }
}

fn pop_sticky(queue: &mut VecDeque<ScriptedReply>) -> Option<ScriptedReply> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post(
        &self,
        url: &str,
        request: &PostRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                url: url.to_string(),
                request: request.clone(),
                timeout,
                at: Instant::now(),
            });
        }

        match self.next_reply(url) {
            Some(ScriptedReply::Response(response)) => Ok(response),
            Some(ScriptedReply::Network(error)) => Err(error),
            None => Err(TransportError::Other(format!("no scripted reply for {}", url))),
        }
    }
}
