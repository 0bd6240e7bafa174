//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::transport::{Method, Transport, TransportError};

/// A request seen by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub method: Method,
    pub body: Option<Value>,
}

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<Result<Value, TransportError>>,
    fallback: Option<Value>,
    requests: Vec<RecordedRequest>,
}

/// Replays queued responses in order, then the fallback (if any).
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = Result<Value, TransportError>>) -> Self {
        let transport = ScriptedTransport::default();
        transport.script.lock().unwrap().responses = responses.into_iter().collect();
        transport
    }

    /// Answer every request with the same body.
    pub fn repeating(body: Value) -> Self {
        Self::new([]).then_repeat(body)
    }

    pub fn then_repeat(self, body: Value) -> Self {
        self.script.lock().unwrap().fallback = Some(body);
        self
    }

    pub fn network_error() -> TransportError {
        TransportError::network("http://bridge.test/", "connection refused")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.lock().unwrap().requests.clone()
    }
}

impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        url: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push(RecordedRequest {
            url: url.to_string(),
            method,
            body: body.cloned(),
        });
        match script.responses.pop_front() {
            Some(response) => response,
            None => script
                .fallback
                .clone()
                .ok_or_else(|| TransportError::network(url, "script exhausted")),
        }
    }
}
