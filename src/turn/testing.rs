//! Mock implementations for testing
//!
//! Scripted collaborators for driving the turn executor without real I/O.

use crate::bridge::{catalog, ToolBridge, ToolOutcome, ToolSpec};
use crate::llm::{
    LlmError, LlmRequest, LlmResponse, LlmService, LlmStream, LlmStreamEvent, Usage,
};
use crate::protocol::{ContentBlock, StreamEvent};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Scripted LLM
// ============================================================================

/// What one call to [`ScriptedLlm::stream`] produces
#[derive(Clone)]
pub enum Script {
    /// Yield these events, then end
    Events(Vec<LlmStreamEvent>),
    /// Yield these events, then never finish
    Stall(Vec<LlmStreamEvent>),
    /// Fail before streaming
    Reject(LlmError),
}

/// LLM that plays back queued scripts and records requests
pub struct ScriptedLlm {
    scripts: Mutex<VecDeque<Script>>,
    repeat: Option<Script>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a round
    pub fn then(self, events: Vec<LlmStreamEvent>) -> Self {
        self.push(Script::Events(events))
    }

    pub fn then_stall(self, events: Vec<LlmStreamEvent>) -> Self {
        self.push(Script::Stall(events))
    }

    pub fn then_reject(self, error: LlmError) -> Self {
        self.push(Script::Reject(error))
    }

    /// Play this round forever once the queue is empty
    pub fn looping(mut self, events: Vec<LlmStreamEvent>) -> Self {
        self.repeat = Some(Script::Events(events));
        self
    }

    fn push(self, script: Script) -> Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for ScriptedLlm {
    async fn stream(&self, request: &LlmRequest) -> Result<LlmStream, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.repeat.clone())
            .ok_or_else(|| LlmError::network("No scripted response queued"))?;

        match script {
            Script::Events(events) => Ok(Box::pin(futures::stream::iter(events))),
            Script::Stall(events) => Ok(Box::pin(
                futures::stream::iter(events).chain(futures::stream::pending()),
            )),
            Script::Reject(error) => Err(error),
        }
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }
}

/// Events for one model round: thinking, text, then the completed response
pub fn round(thinking: &str, text: &str, tool_uses: &[(&str, &str, Value)]) -> Vec<LlmStreamEvent> {
    let mut events = Vec::new();
    let mut content = Vec::new();

    if !thinking.is_empty() {
        events.push(LlmStreamEvent::ThinkingDelta(thinking.to_string()));
        content.push(ContentBlock::Thinking {
            value: thinking.to_string(),
            signature: Some("sig".to_string()),
        });
    }
    if !text.is_empty() {
        events.push(LlmStreamEvent::TextDelta(text.to_string()));
        content.push(ContentBlock::text(text));
    }
    for (id, name, input) in tool_uses {
        content.push(ContentBlock::tool_use(*id, *name, input.clone()));
    }

    events.push(LlmStreamEvent::Completed(LlmResponse {
        content: content.into_iter().map(Into::into).collect(),
        end_turn: tool_uses.is_empty(),
        usage: Usage::default(),
    }));
    events
}

// ============================================================================
// Scripted tool bridge
// ============================================================================

/// Bridge with predefined outcomes per tool name
pub struct ScriptedBridge {
    outcomes: HashMap<String, ToolOutcome>,
    panics: Vec<String>,
    delay: Option<Duration>,
    pub executions: Mutex<Vec<(String, Value)>>,
}

impl ScriptedBridge {
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            panics: Vec::new(),
            delay: None,
            executions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_outcome(mut self, tool: &str, outcome: ToolOutcome) -> Self {
        self.outcomes.insert(tool.to_string(), outcome);
        self
    }

    /// Make this tool panic when executed
    pub fn with_panic(mut self, tool: &str) -> Self {
        self.panics.push(tool.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn recorded_executions(&self) -> Vec<(String, Value)> {
        self.executions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolBridge for ScriptedBridge {
    fn available_tools(&self) -> Vec<ToolSpec> {
        catalog().to_vec()
    }

    async fn execute(&self, tool: &str, input: Value) -> ToolOutcome {
        self.executions
            .lock()
            .unwrap()
            .push((tool.to_string(), input));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        assert!(!self.panics.iter().any(|t| t == tool), "tool {tool} exploded");
        self.outcomes
            .get(tool)
            .cloned()
            .unwrap_or_else(|| ToolOutcome::failure(format!("Unknown tool: {tool}")))
    }
}

/// Drain every event sent before the channel closed
pub async fn drain(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}
