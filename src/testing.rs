//! Test doubles shared by unit tests across the crate

use crate::error::RouterError;
use crate::gemini::{Content, FunctionCall, LanguageModel, ModelReply, ModelRequest, Part};
use crate::models::{ToolInput, ToolOutput};
use crate::tools::{Tool, ToolRegistry};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Language model that replays a fixed script and records every request.
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelReply>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub(crate) fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn text(self, text: &str) -> Self {
        self.push(Ok(text_reply(text)))
    }

    pub(crate) fn call(self, name: &str, args: Value) -> Self {
        self.push(Ok(call_reply(name, args)))
    }

    pub(crate) fn error(self, message: &str) -> Self {
        self.push(Err(RouterError::Llm(message.to_string())))
    }

    fn push(self, reply: Result<ModelReply>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RouterError::Llm("script exhausted".to_string())))
    }
}

pub(crate) fn text_reply(text: &str) -> ModelReply {
    ModelReply {
        text: text.to_string(),
        function_calls: Vec::new(),
        finish_reason: Some("STOP".to_string()),
        content: Content {
            role: "model".to_string(),
            parts: vec![Part::text(text)],
        },
    }
}

pub(crate) fn call_reply(name: &str, args: Value) -> ModelReply {
    let call = FunctionCall {
        name: name.to_string(),
        args,
    };
    ModelReply {
        text: String::new(),
        function_calls: vec![call.clone()],
        finish_reason: Some("STOP".to_string()),
        content: Content {
            role: "model".to_string(),
            parts: vec![Part {
                function_call: Some(call),
                ..Part::default()
            }],
        },
    }
}

/// Tool returning a fixed output, optionally after a delay.
pub(crate) struct StaticTool {
    name: &'static str,
    output: ToolOutput,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticTool {
    pub(crate) fn new(name: &'static str, output: ToolOutput) -> Self {
        Self {
            name,
            output,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn slow(name: &'static str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(name, ToolOutput::ok(Value::Null))
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "static test tool"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _input: &ToolInput) -> ToolOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.output.clone()
    }
}

/// Registry holding a static stand-in for every production tool name.
pub(crate) fn static_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for name in [
        "get_yahoo_finance_data",
        "get_yahoo_finance_data_comparison",
        "get_polygon_news",
        "search_query",
        "get_weather",
    ] {
        registry.register(std::sync::Arc::new(StaticTool::new(
            name,
            ToolOutput::ok(serde_json::json!({ "source": name })),
        )));
    }
    registry
}
