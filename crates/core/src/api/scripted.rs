//! In-memory transport answering from a script, for tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use super::{Method, Transport};
use crate::error::ApiError;

/// A request observed by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

struct Reply {
    result: Result<Value, ApiError>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Replies are queued per `(method, path)` and consumed in order. A
/// request with nothing queued fails with a network error, which is how
/// tests simulate an unreachable server.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn respond(&self, method: Method, path: &str, result: Result<Value, ApiError>) {
        self.push(method, path, Reply { result, gate: None });
    }

    /// Queue a reply that is held back until the returned sender fires.
    pub fn respond_gated(
        &self,
        method: Method,
        path: &str,
        result: Result<Value, ApiError>,
    ) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.push(
            method,
            path,
            Reply {
                result,
                gate: Some(gate),
            },
        );
        release
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        self.replies
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        self.calls.lock().push(RecordedCall {
            method,
            path: path.to_string(),
            body,
        });
        let reply = self
            .replies
            .lock()
            .get_mut(&(method, path.to_string()))
            .and_then(|queue| queue.pop_front());
        let Some(reply) = reply else {
            return Err(ApiError::Network(format!("no scripted reply for {method} {path}")));
        };
        if let Some(gate) = reply.gate {
            let _ = gate.await;
        }
        reply.result
    }
}
