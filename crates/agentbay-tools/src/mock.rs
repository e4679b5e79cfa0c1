//! Recording tool caller for wrapper tests.

use std::{collections::VecDeque, sync::Mutex};

use agentbay_core::{Result, ToolCaller, ToolResponse};
use async_trait::async_trait;
use serde_json::Value;

/// Records every call and answers with queued envelopes.
///
/// When the queue is empty it answers with an empty successful envelope.
#[derive(Default)]
pub struct MockCaller {
    calls: Mutex<Vec<(String, Value)>>,
    replies: Mutex<VecDeque<ToolResponse>>,
}

impl MockCaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn ok(self, data: impl Into<String>) -> Self {
        let n = self.replies.lock().unwrap().len();
        self.replies
            .lock()
            .unwrap()
            .push_back(ToolResponse::ok(data, format!("req-{}", n + 1)));
        self
    }

    /// Queue a failed reply.
    pub fn failed(self, message: impl Into<String>) -> Self {
        let n = self.replies.lock().unwrap().len();
        self.replies
            .lock()
            .unwrap()
            .push_back(ToolResponse::failed(message, format!("req-{}", n + 1)));
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> (String, Value) {
        self.calls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no tool was called")
    }
}

#[async_trait]
impl ToolCaller for MockCaller {
    async fn call_tool(&self, name: &str, args: Value) -> Result<ToolResponse> {
        self.calls.lock().unwrap().push((name.to_string(), args));
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ToolResponse::ok("", "req-default")))
    }
}
